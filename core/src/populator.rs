//! Bulk loader that seeds the catalog from a structured dataset.
//!
//! The dataset is nested `category -> task -> platform -> [record]`. Each
//! record becomes one catalog row with its category and platform taken from
//! the keys above it; the task key is kept as a tag.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::db::CommandStore;
use crate::error::PopulateError;
use crate::model::NewCommand;

/// A catalog with more rows than this is treated as already seeded
pub const SEED_THRESHOLD: i64 = 50;

/// Dataset shipped with the library
pub const BUNDLED_SEED: &str = include_str!("../data/commands.json");

/// One command in the seed dataset
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SeedRecord {
    pub command: String,
    pub explanation: String,
    #[serde(default)]
    pub dangerous: bool,
    #[serde(default)]
    pub danger_reason: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

type PlatformMap = BTreeMap<String, Vec<SeedRecord>>;
type TaskMap = BTreeMap<String, PlatformMap>;

/// The typed `category -> task -> platform -> [record]` tree
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct SeedCatalog {
    categories: BTreeMap<String, TaskMap>,
}

impl SeedCatalog {
    /// Parse and check the shape of a JSON dataset
    pub fn parse(json: &str) -> Result<Self, PopulateError> {
        serde_json::from_str(json).map_err(|e| PopulateError::MalformedSeed {
            location: format!("line {} column {}", e.line(), e.column()),
            reason: e.to_string(),
        })
    }

    pub fn category_count(&self) -> usize {
        self.categories.len()
    }

    pub fn record_count(&self) -> usize {
        self.categories
            .values()
            .flat_map(|tasks| tasks.values())
            .flat_map(|platforms| platforms.values())
            .map(Vec::len)
            .sum()
    }

    /// Flatten one category into insertable rows, rejecting the whole
    /// category if any record in it is unusable
    fn category_rows(category: &str, tasks: &TaskMap) -> Result<Vec<NewCommand>, PopulateError> {
        if category.trim().is_empty() {
            return Err(malformed(category, None, None, "empty category name"));
        }

        let mut rows = Vec::new();
        for (task, platforms) in tasks {
            for (platform, records) in platforms {
                for (index, record) in records.iter().enumerate() {
                    if record.command.trim().is_empty() {
                        return Err(malformed(
                            category,
                            Some(task.as_str()),
                            Some((platform.as_str(), index)),
                            "empty command",
                        ));
                    }

                    let mut tags = record.tags.clone();
                    if !task.trim().is_empty() && !tags.contains(task) {
                        tags.push(task.clone());
                    }

                    let mut row = NewCommand::new(record.command.as_str(), record.explanation.as_str())
                        .category(category)
                        .platform(platform.as_str())
                        .tags(tags);
                    if record.dangerous {
                        row = row.dangerous(record.danger_reason.as_str());
                    }
                    rows.push(row);
                }
            }
        }
        Ok(rows)
    }
}

fn malformed(
    category: &str,
    task: Option<&str>,
    entry: Option<(&str, usize)>,
    reason: &str,
) -> PopulateError {
    let mut location = format!("category {:?}", category);
    if let Some(task) = task {
        location.push_str(&format!(", task {:?}", task));
    }
    if let Some((platform, index)) = entry {
        location.push_str(&format!(", platform {:?}, entry {}", platform, index));
    }
    PopulateError::MalformedSeed {
        location,
        reason: reason.to_string(),
    }
}

/// Where the dataset comes from
#[derive(Debug, Clone)]
pub enum SeedSource {
    /// A JSON file; a missing file only produces a warning
    File(PathBuf),
    /// [`BUNDLED_SEED`]
    Bundled,
}

/// What a [`Populator::populate`] call did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PopulateReport {
    /// Nothing was loaded (already seeded, or no source file)
    pub skipped: bool,
    /// Rows removed by a forced rebuild
    pub cleared: usize,
    pub inserted: usize,
    /// Records already present for the same platform
    pub duplicates: usize,
}

pub struct Populator<'a> {
    store: &'a CommandStore,
    source: SeedSource,
}

impl<'a> Populator<'a> {
    pub fn new(store: &'a CommandStore, source: SeedSource) -> Self {
        Self { store, source }
    }

    pub fn bundled(store: &'a CommandStore) -> Self {
        Self::new(store, SeedSource::Bundled)
    }

    /// Seed the catalog.
    ///
    /// Without `force_rebuild` this is a no-op once the catalog holds more
    /// than [`SEED_THRESHOLD`] rows. With it, every command (and its tags)
    /// is deleted before reloading; history is left alone.
    pub fn populate(&self, force_rebuild: bool) -> Result<PopulateReport, PopulateError> {
        if !force_rebuild {
            let count = self.store.count_commands()?;
            if count > SEED_THRESHOLD {
                debug!("Catalog already holds {} commands, skipping seed", count);
                return Ok(PopulateReport {
                    skipped: true,
                    ..PopulateReport::default()
                });
            }
        }

        let Some(json) = self.read_source()? else {
            return Ok(PopulateReport {
                skipped: true,
                ..PopulateReport::default()
            });
        };
        let catalog = SeedCatalog::parse(&json)?;

        let mut report = PopulateReport::default();
        if force_rebuild {
            report.cleared = self.store.clear_commands()?;
        }

        for (category, tasks) in &catalog.categories {
            let rows = match SeedCatalog::category_rows(category, tasks) {
                Ok(rows) => rows,
                Err(e) => {
                    if report.inserted > 0 {
                        warn!(
                            "Seed import stopped at category {:?}; {} commands from earlier categories were kept",
                            category, report.inserted
                        );
                    }
                    return Err(e);
                }
            };

            for row in rows {
                if self.store.command_exists(&row.command, &row.platform)? {
                    report.duplicates += 1;
                    continue;
                }
                self.store.add_command(&row)?;
                report.inserted += 1;
            }
        }

        info!(
            "Catalog populated with {} commands from {} categories ({} already present)",
            report.inserted,
            catalog.category_count(),
            report.duplicates
        );
        Ok(report)
    }

    fn read_source(&self) -> Result<Option<String>, PopulateError> {
        match &self.source {
            SeedSource::Bundled => Ok(Some(BUNDLED_SEED.to_string())),
            SeedSource::File(path) => match std::fs::read_to_string(path) {
                Ok(json) => Ok(Some(json)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    warn!("Commands file not found at {}", path.display());
                    Ok(None)
                }
                Err(source) => Err(PopulateError::Io {
                    path: path.clone(),
                    source,
                }),
            },
        }
    }
}
