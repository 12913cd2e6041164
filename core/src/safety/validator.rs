//! Whitelist checks and safer-alternative advice.

use serde::Serialize;

use super::{PatternMatcher, SafetyConfig};

/// Result of [`CommandValidator::validate_and_suggest`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Validation {
    /// False when the command matched a hazard rule or keyword
    pub ok: bool,
    /// The matched reason, empty when `ok`
    pub reason: String,
    /// Advisory text, not rewrites. May be empty even when not `ok`.
    pub suggestions: Vec<String>,
}

pub struct CommandValidator<'a> {
    config: &'a SafetyConfig,
    matcher: PatternMatcher<'a>,
}

impl<'a> CommandValidator<'a> {
    pub fn new(config: &'a SafetyConfig) -> Self {
        Self {
            config,
            matcher: PatternMatcher::new(config),
        }
    }

    /// True iff the first word of the command is whitelisted
    pub fn is_safe(&self, command: &str) -> bool {
        command
            .split_whitespace()
            .next()
            .is_some_and(|program| self.config.is_whitelisted(program))
    }

    pub fn validate_and_suggest(&self, command: &str) -> Validation {
        let verdict = self.matcher.classify(command);

        if !verdict.dangerous {
            return Validation {
                ok: true,
                reason: String::new(),
                suggestions: vec![],
            };
        }

        Validation {
            ok: false,
            reason: verdict.reason,
            suggestions: self.safer_alternatives(command),
        }
    }

    fn safer_alternatives(&self, command: &str) -> Vec<String> {
        // "rm  -rf" and "RM -RF" should hit the same advisory
        let normalized = command
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();

        let mut suggestions: Vec<String> = Vec::new();
        for advisory in self.config.advisories() {
            if !normalized.contains(&advisory.needle.to_lowercase()) {
                continue;
            }
            for advice in &advisory.advice {
                if !suggestions.contains(advice) {
                    suggestions.push(advice.clone());
                }
            }
        }
        suggestions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_safe_uses_first_token() {
        let config = SafetyConfig::builtin().unwrap();
        let validator = CommandValidator::new(&config);

        assert!(validator.is_safe("ls -la /tmp"));
        assert!(validator.is_safe("  ps aux"));
        assert!(validator.is_safe("cat /etc/hosts | rm -rf /"));
        assert!(!validator.is_safe("rm -rf /"));
        assert!(!validator.is_safe("lsblk"));
        assert!(!validator.is_safe(""));
    }

    #[test]
    fn test_safe_command_validates_clean() {
        let config = SafetyConfig::builtin().unwrap();
        let validator = CommandValidator::new(&config);

        let result = validator.validate_and_suggest("ls -la");
        assert!(result.ok);
        assert!(result.reason.is_empty());
        assert!(result.suggestions.is_empty());
    }

    #[test]
    fn test_rm_rf_suggestions() {
        let config = SafetyConfig::builtin().unwrap();
        let validator = CommandValidator::new(&config);

        let result = validator.validate_and_suggest("rm  -rf /");
        assert!(!result.ok);
        assert!(!result.reason.is_empty());
        assert_eq!(result.suggestions.len(), 2);
        assert!(result.suggestions[0].contains("rm -i"));
        assert!(result.suggestions[1].contains("trash"));
    }

    #[test]
    fn test_chmod_777_suggestions() {
        let config = SafetyConfig::builtin().unwrap();
        let validator = CommandValidator::new(&config);

        let result = validator.validate_and_suggest("chmod 777 script.sh");
        assert!(!result.ok);
        assert!(result.suggestions.iter().any(|s| s.contains("755 or 644")));
        assert!(result.suggestions.iter().any(|s| s.contains("least privilege")));
    }

    #[test]
    fn test_dangerous_without_advice() {
        let config = SafetyConfig::builtin().unwrap();
        let validator = CommandValidator::new(&config);

        let result = validator.validate_and_suggest("shutdown -h now");
        assert!(!result.ok);
        assert_eq!(result.reason, "Shuts down or restarts the system");
        assert!(result.suggestions.is_empty());
    }

    #[test]
    fn test_duplicate_advice_listed_once() {
        let config = SafetyConfig::from_json(
            r#"{"advisories": [
                {"needle": "rm", "advice": ["Think twice"]},
                {"needle": "-rf", "advice": ["Think twice", "Keep backups"]}
            ]}"#,
        )
        .unwrap();
        let validator = CommandValidator::new(&config);

        let result = validator.validate_and_suggest("rm -rf *");
        assert_eq!(result.suggestions, vec!["Think twice", "Keep backups"]);
    }
}
