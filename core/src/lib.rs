//! Local shell command catalog with hazard detection.
//!
//! - [`CommandStore`]: SQLite catalog with full-text search, tags and a
//!   usage history log.
//! - [`Populator`]: seeds the catalog from a nested JSON dataset.
//! - [`PatternMatcher`] and [`CommandValidator`]: rule-based danger
//!   classification, whitelist checks and safer-alternative advice.

pub mod db;
pub mod error;
pub mod model;
pub mod populator;
pub mod safety;

pub use db::CommandStore;
pub use error::{PopulateError, SafetyError, StoreError, StoreResult};
pub use model::{Command, CommandResult, HistoryEntry, NewCommand};
pub use populator::{PopulateReport, Populator, SeedSource};
pub use safety::{
    Classification, CommandValidator, PatternMatcher, SafetyConfig, Validation, sanitize,
};
