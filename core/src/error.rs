//! Error types for the catalog store, the populator and the safety rules.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by [`crate::db::CommandStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// The database file could not be created or opened.
    #[error("command store unavailable at {}: {reason} (run `tacz populate --force` to rebuild it)", .path.display())]
    Unavailable { path: PathBuf, reason: String },

    /// An initialized catalog is missing one of its tables.
    #[error("command store schema is missing table `{0}` (run `tacz populate --force` to rebuild it)")]
    SchemaMissing(String),

    /// The store was closed and cannot be used any more.
    #[error("command store is closed")]
    Closed,

    #[error("command text must not be empty")]
    EmptyCommand,

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

impl StoreError {
    /// True for the failures that mean the catalog file itself is unusable.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::SchemaMissing(_))
    }
}

/// Errors raised while seeding the catalog.
#[derive(Debug, Error)]
pub enum PopulateError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to read seed file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The seed data does not have the `category -> task -> platform -> [record]` shape.
    #[error("malformed seed data at {location}: {reason}")]
    MalformedSeed { location: String, reason: String },
}

/// Errors raised while loading a [`crate::safety::SafetyConfig`].
#[derive(Debug, Error)]
pub enum SafetyError {
    #[error("invalid hazard pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid safety configuration: {0}")]
    Config(#[from] serde_json::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_message_suggests_rebuild() {
        let err = StoreError::Unavailable {
            path: PathBuf::from("/nope/commands.db"),
            reason: "permission denied".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/nope/commands.db"));
        assert!(msg.contains("populate --force"));
        assert!(err.is_unavailable());
    }

    #[test]
    fn test_closed_is_not_unavailable() {
        assert!(!StoreError::Closed.is_unavailable());
        assert!(StoreError::SchemaMissing("commands".into()).is_unavailable());
    }
}
