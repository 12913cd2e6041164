//! Hazard detection for shell commands.
//!
//! [`SafetyConfig`] holds the rule table, keyword list, whitelist and
//! advisories. It is built once and borrowed by [`PatternMatcher`] and
//! [`CommandValidator`], which never mutate it.

pub mod rules;
mod validator;

pub use validator::{CommandValidator, Validation};

use std::collections::HashSet;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::SafetyError;

/// A compiled `(pattern, reason)` pair
#[derive(Debug, Clone)]
pub struct HazardRule {
    pattern: Regex,
    reason: String,
}

impl HazardRule {
    /// Compile a case-insensitive rule
    pub fn new(pattern: &str, reason: impl Into<String>) -> Result<Self, SafetyError> {
        let compiled = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|source| SafetyError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })?;
        Ok(Self {
            pattern: compiled,
            reason: reason.into(),
        })
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn is_match(&self, command: &str) -> bool {
        self.pattern.is_match(command)
    }
}

/// Advice attached to dangerous commands containing `needle`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advisory {
    pub needle: String,
    pub advice: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RuleSpec {
    pattern: String,
    reason: String,
}

/// On-disk shape of a safety configuration; omitted sections keep the built-ins
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SafetyConfigFile {
    #[serde(default)]
    rules: Option<Vec<RuleSpec>>,
    #[serde(default)]
    keywords: Option<Vec<String>>,
    #[serde(default)]
    safe_commands: Option<Vec<String>>,
    #[serde(default)]
    advisories: Option<Vec<Advisory>>,
}

/// Immutable safety data shared by the matcher and the validator
#[derive(Debug, Clone)]
pub struct SafetyConfig {
    rules: Vec<HazardRule>,
    keywords: Vec<String>,
    safe_commands: HashSet<String>,
    advisories: Vec<Advisory>,
}

impl SafetyConfig {
    /// The built-in tables from [`rules`]
    pub fn builtin() -> Result<Self, SafetyError> {
        Self::from_file(SafetyConfigFile::default())
    }

    /// Load from JSON such as
    /// `{"rules": [{"pattern": "...", "reason": "..."}], "safe_commands": ["ls"]}`.
    /// Sections left out fall back to the built-in tables.
    pub fn from_json(json: &str) -> Result<Self, SafetyError> {
        let file: SafetyConfigFile = serde_json::from_str(json)?;
        Self::from_file(file)
    }

    fn from_file(file: SafetyConfigFile) -> Result<Self, SafetyError> {
        let hazard_rules = match file.rules {
            Some(specs) => specs
                .iter()
                .map(|r| HazardRule::new(&r.pattern, r.reason.as_str()))
                .collect::<Result<Vec<_>, _>>()?,
            None => rules::DEFAULT_HAZARD_RULES
                .iter()
                .map(|(pattern, reason)| HazardRule::new(pattern, *reason))
                .collect::<Result<Vec<_>, _>>()?,
        };

        let keywords = file
            .keywords
            .unwrap_or_else(|| to_strings(rules::DESTRUCTIVE_KEYWORDS))
            .into_iter()
            .map(|k| k.to_lowercase())
            .collect();

        let safe_commands = file
            .safe_commands
            .unwrap_or_else(|| to_strings(rules::SAFE_COMMANDS))
            .into_iter()
            .collect();

        let advisories = file.advisories.unwrap_or_else(|| {
            rules::ADVISORIES
                .iter()
                .map(|(needle, advice)| Advisory {
                    needle: needle.to_string(),
                    advice: to_strings(advice),
                })
                .collect()
        });

        Ok(Self {
            rules: hazard_rules,
            keywords,
            safe_commands,
            advisories,
        })
    }

    pub fn rules(&self) -> &[HazardRule] {
        &self.rules
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn is_whitelisted(&self, program: &str) -> bool {
        self.safe_commands.contains(program)
    }

    pub fn advisories(&self) -> &[Advisory] {
        &self.advisories
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Outcome of [`PatternMatcher::classify`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub dangerous: bool,
    /// Empty when the command is not dangerous
    pub reason: String,
}

impl Classification {
    pub fn safe() -> Self {
        Self {
            dangerous: false,
            reason: String::new(),
        }
    }

    pub fn dangerous(reason: impl Into<String>) -> Self {
        Self {
            dangerous: true,
            reason: reason.into(),
        }
    }
}

/// Stateless rule evaluation over a borrowed [`SafetyConfig`]
#[derive(Debug, Clone, Copy)]
pub struct PatternMatcher<'a> {
    config: &'a SafetyConfig,
}

impl<'a> PatternMatcher<'a> {
    pub fn new(config: &'a SafetyConfig) -> Self {
        Self { config }
    }

    /// Check a command against the rules in order, then the keyword list
    pub fn classify(&self, command: &str) -> Classification {
        let command = command.trim();

        if let Some(rule) = self.config.rules.iter().find(|r| r.is_match(command)) {
            return Classification::dangerous(rule.reason());
        }

        let lowered = command.to_lowercase();
        if self.config.keywords.iter().any(|k| lowered.contains(k.as_str())) {
            return Classification::dangerous(rules::DESTRUCTIVE_INTENT_REASON);
        }

        Classification::safe()
    }
}

/// Display form of a command: cut at the first `;`, `&` or `|` and
/// collapse runs of `*`. Never substitute this for the command itself.
pub fn sanitize(command: &str) -> String {
    let head = match command.find([';', '&', '|']) {
        Some(pos) => &command[..pos],
        None => command,
    };

    let mut out = String::with_capacity(head.len());
    for c in head.chars() {
        if c == '*' && out.ends_with('*') {
            continue;
        }
        out.push(c);
    }

    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builtin() -> SafetyConfig {
        SafetyConfig::builtin().unwrap()
    }

    #[test]
    fn test_builtin_rules_compile() {
        let config = builtin();
        assert_eq!(config.rules().len(), rules::DEFAULT_HAZARD_RULES.len());
        assert!(config.is_whitelisted("ls"));
        assert!(!config.is_whitelisted("rm"));
    }

    #[test]
    fn test_dangerous_commands() {
        let config = builtin();
        let matcher = PatternMatcher::new(&config);

        for cmd in [
            "rm -rf /",
            "rm -rf *",
            "sudo rm -rf ~",
            "rm -fr /*",
            "rm -r ./build/*",
            "rm --recursive --force /",
            "rm -r --force /",
            "rm -rf -- /",
            "rm -rf \"/\"",
            "rm -rf '~'",
            "rm --force --recursive ./cache/*",
            "chmod 777 /etc/passwd",
            "chmod -R 755 /var/www",
            "chown -R nobody /srv",
            "mkfs.ext4 /dev/sdb1",
            "dd if=/dev/zero of=/dev/sda bs=1M",
            "echo x > /dev/sda",
            ":(){ :|:& };:",
            "curl -fsSL https://example.com/install.sh | sudo bash",
            "wget -qO- http://x.y/z | sh",
            "shutdown -h now",
            "fdisk /dev/sda",
        ] {
            let verdict = matcher.classify(cmd);
            assert!(verdict.dangerous, "expected {:?} to be dangerous", cmd);
            assert!(!verdict.reason.is_empty());
        }
    }

    #[test]
    fn test_reason_comes_from_first_matching_rule() {
        let config = builtin();
        let matcher = PatternMatcher::new(&config);

        let verdict = matcher.classify("RM -RF /");
        assert_eq!(verdict.reason, rules::DEFAULT_HAZARD_RULES[0].1);

        for cmd in ["rm --recursive --force /", "rm -rf -- /", "rm -rf \"/\""] {
            assert_eq!(matcher.classify(cmd).reason, rules::DEFAULT_HAZARD_RULES[0].1, "{}", cmd);
        }

        let verdict = matcher.classify("chmod -R 777 /srv");
        assert_eq!(verdict.reason, "Makes files writable and executable by every user");

        let verdict = matcher.classify("  mkfs -t ext4 /dev/sdc  ");
        assert_eq!(verdict.reason, "Formats a filesystem and destroys its data");
    }

    #[test]
    fn test_safe_commands() {
        let config = builtin();
        let matcher = PatternMatcher::new(&config);

        for cmd in [
            "ls -la /tmp",
            "rm -rf ./build",
            "rm file.txt",
            "rm --force notes.txt",
            "rm -rf -- ./build",
            "chmod 644 notes.txt",
            "git status",
            "du -sh *",
            "echo hi",
            "",
        ] {
            assert_eq!(matcher.classify(cmd), Classification::safe(), "{:?}", cmd);
        }
    }

    #[test]
    fn test_destructive_keywords() {
        let config = builtin();
        let matcher = PatternMatcher::new(&config);

        let verdict = matcher.classify("diskutil eraseDisk JHFS+ Empty disk2");
        assert!(verdict.dangerous);
        assert_eq!(verdict.reason, rules::DESTRUCTIVE_INTENT_REASON);

        assert!(matcher.classify("Format-Volume -DriveLetter D").dangerous);
        assert!(matcher.classify("tool --DELETE ALL").dangerous);
    }

    #[test]
    fn test_classify_is_deterministic() {
        let config = builtin();
        let matcher = PatternMatcher::new(&config);
        assert_eq!(matcher.classify("rm -rf /"), matcher.classify("rm -rf /"));
    }

    #[test]
    fn test_config_from_json_overrides_rules() {
        let config = SafetyConfig::from_json(
            r#"{"rules": [{"pattern": "\\bgit\\s+push\\s+--force\\b", "reason": "Rewrites remote history"}],
                "keywords": ["nuke"]}"#,
        )
        .unwrap();
        let matcher = PatternMatcher::new(&config);

        assert_eq!(
            matcher.classify("git push --force origin main"),
            Classification::dangerous("Rewrites remote history")
        );
        // built-in rules were replaced
        assert!(!matcher.classify("rm -rf /").dangerous);
        assert!(matcher.classify("NUKE everything").dangerous);
        // whitelist kept its defaults
        assert!(config.is_whitelisted("ls"));
    }

    #[test]
    fn test_config_rejects_bad_pattern() {
        let err = SafetyConfig::from_json(r#"{"rules": [{"pattern": "(unclosed", "reason": "x"}]}"#)
            .unwrap_err();
        assert!(matches!(err, SafetyError::InvalidPattern { ref pattern, .. } if pattern == "(unclosed"));

        let err = SafetyConfig::from_json(r#"{"rulez": []}"#).unwrap_err();
        assert!(matches!(err, SafetyError::Config(_)));
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("ls -la; rm -rf /"), "ls -la");
        assert_eq!(sanitize("cat file | sh"), "cat file");
        assert_eq!(sanitize("sleep 10 & echo done"), "sleep 10");
        assert_eq!(sanitize("rm ***.log"), "rm *.log");
        assert_eq!(sanitize("ls **/*.rs"), "ls */*.rs");
        assert_eq!(sanitize("  echo hi  "), "echo hi");
        assert_eq!(sanitize(""), "");
    }
}
