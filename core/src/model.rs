//! Data types shared by the catalog store, the populator and the CLI.

use serde::{Deserialize, Serialize};

/// Parameters for [`crate::db::CommandStore::add_command`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewCommand {
    /// The literal shell invocation
    pub command: String,
    /// What the command does
    #[serde(default)]
    pub explanation: String,
    /// Coarse grouping, e.g. "file"
    #[serde(default)]
    pub category: String,
    /// Comma-joined platform tags, e.g. "linux,macos"
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub dangerous: bool,
    /// Ignored unless `dangerous` is set
    #[serde(default)]
    pub danger_reason: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl NewCommand {
    pub fn new(command: impl Into<String>, explanation: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            explanation: explanation.into(),
            ..Self::default()
        }
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    pub fn dangerous(mut self, reason: impl Into<String>) -> Self {
        self.dangerous = true;
        self.danger_reason = reason.into();
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

/// A catalog entry as stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub id: i64,
    pub command: String,
    pub explanation: String,
    pub category: String,
    pub platform: String,
    pub dangerous: bool,
    /// Empty when `dangerous` is false
    pub danger_reason: String,
    pub popularity: i64,
    /// Unix timestamp
    pub created_at: i64,
}

impl Command {
    /// Platform tags split out of the comma-joined column
    pub fn platforms(&self) -> impl Iterator<Item = &str> {
        self.platform
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }
}

/// A search hit: the command, its tags and its relevance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResult {
    #[serde(flatten)]
    pub command: Command,
    pub tags: Vec<String>,
    /// bm25 relevance (lower is better, as SQLite reports it)
    pub rank: f64,
}

/// A row of the usage audit log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: i64,
    /// The natural-language or literal input
    pub query: String,
    /// The invocation that was chosen or run
    pub command: String,
    pub executed: bool,
    pub success: bool,
    pub platform: String,
    /// Unix timestamp
    pub timestamp: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_command_builder() {
        let cmd = NewCommand::new("ls -la", "List files")
            .category("file")
            .platform("linux,macos")
            .tags(["list", "files"]);
        assert_eq!(cmd.command, "ls -la");
        assert_eq!(cmd.category, "file");
        assert_eq!(cmd.tags, vec!["list", "files"]);
        assert!(!cmd.dangerous);
    }

    #[test]
    fn test_new_command_defaults_from_json() {
        let json = r#"{"command": "df -h"}"#;
        let cmd: NewCommand = serde_json::from_str(json).unwrap();
        assert_eq!(cmd.command, "df -h");
        assert!(cmd.explanation.is_empty());
        assert!(cmd.tags.is_empty());
        assert!(!cmd.dangerous);
    }

    #[test]
    fn test_platforms_split() {
        let cmd = Command {
            id: 1,
            command: "ls".into(),
            explanation: String::new(),
            category: String::new(),
            platform: "linux, macos,".into(),
            dangerous: false,
            danger_reason: String::new(),
            popularity: 0,
            created_at: 0,
        };
        assert_eq!(cmd.platforms().collect::<Vec<_>>(), vec!["linux", "macos"]);
    }

    #[test]
    fn test_command_result_serializes_flat() {
        let result = CommandResult {
            command: Command {
                id: 7,
                command: "echo hi".into(),
                explanation: "Say hello".into(),
                category: "basic".into(),
                platform: "linux".into(),
                dangerous: false,
                danger_reason: String::new(),
                popularity: 3,
                created_at: 1700000000,
            },
            tags: vec!["greeting".into()],
            rank: -1.5,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["command"], "echo hi");
        assert_eq!(json["popularity"], 3);
        assert_eq!(json["tags"][0], "greeting");
    }
}
