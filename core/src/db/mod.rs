//! SQLite catalog store for tacz.
//!
//! Holds the command catalog, its tags, the usage history and the FTS5
//! index that search runs against. The index is maintained by triggers
//! (see [`schema`]), so none of the methods here ever write to it.

mod migrations;
mod schema;

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::model::{Command, CommandResult, HistoryEntry, NewCommand};

/// Column list matching [`command_from_row`]
const COMMAND_COLUMNS: &str = "c.id, c.command, c.explanation, c.category, c.platform, \
     c.dangerous, c.danger_reason, c.popularity, c.created_at";

/// Words dropped from free-text queries before they reach FTS
const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "how", "do", "does", "i", "can", "to", "in", "of", "for", "my", "me",
    "what", "is", "are", "on", "with", "and", "or", "please", "want", "would", "like",
];

/// Persistent command catalog.
///
/// One connection per store, opened in [`CommandStore::open`] and released
/// by [`CommandStore::close`]. Calling `close` again is a no-op; any other
/// call after `close` fails with [`StoreError::Closed`].
pub struct CommandStore {
    conn: Mutex<Option<Connection>>,
    path: Option<PathBuf>,
}

impl CommandStore {
    /// Open or create a catalog at the given path
    pub fn open(path: &Path) -> StoreResult<Self> {
        let conn = connect(path)?;
        migrations::run_migrations(&conn).map_err(|e| unavailable(path, e))?;
        info!("Opened command store at {}", path.display());
        Ok(Self::from_connection(conn, Some(path)))
    }

    /// Open a catalog, recreating any missing tables.
    ///
    /// This is the repair path for [`StoreError::SchemaMissing`]; follow it
    /// with a forced populate.
    pub fn open_rebuilding(path: &Path) -> StoreResult<Self> {
        let conn = connect(path)?;
        migrations::rebuild_schema(&conn).map_err(|e| unavailable(path, e))?;
        info!("Rebuilt command store schema at {}", path.display());
        Ok(Self::from_connection(conn, Some(path)))
    }

    /// Open an in-memory catalog (for testing)
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrations::run_migrations(&conn)?;
        Ok(Self::from_connection(conn, None))
    }

    fn from_connection(conn: Connection, path: Option<&Path>) -> Self {
        Self {
            conn: Mutex::new(Some(conn)),
            path: path.map(Path::to_path_buf),
        }
    }

    /// Path of the backing file, `None` for in-memory stores
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_closed(&self) -> bool {
        self.lock().is_none()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Connection>> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_conn<T>(&self, f: impl FnOnce(&mut Connection) -> StoreResult<T>) -> StoreResult<T> {
        let mut guard = self.lock();
        let conn = guard.as_mut().ok_or(StoreError::Closed)?;
        f(conn)
    }

    /// Insert a command and its tags; returns the new id
    pub fn add_command(&self, new: &NewCommand) -> StoreResult<i64> {
        let command = new.command.trim();
        if command.is_empty() {
            return Err(StoreError::EmptyCommand);
        }
        let danger_reason = if new.dangerous {
            new.danger_reason.as_str()
        } else {
            ""
        };

        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO commands (command, explanation, category, platform, dangerous, danger_reason, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    command,
                    new.explanation,
                    new.category,
                    new.platform,
                    new.dangerous,
                    danger_reason,
                    now_timestamp(),
                ],
            )?;
            let id = tx.last_insert_rowid();

            {
                let mut stmt = tx.prepare_cached(
                    "INSERT OR IGNORE INTO command_tags (command_id, tag) VALUES (?1, ?2)",
                )?;
                for tag in new.tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
                    stmt.execute(params![id, tag])?;
                }
            }

            tx.commit()?;
            debug!("Added command {} as id {}", command, id);
            Ok(id)
        })
    }

    /// Look up a single command
    pub fn get_command(&self, id: i64) -> StoreResult<Option<Command>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM commands c WHERE c.id = ?1", COMMAND_COLUMNS);
            let command = conn
                .prepare_cached(&sql)?
                .query_row([id], command_from_row)
                .optional()?;
            Ok(command)
        })
    }

    /// Number of rows in the catalog
    pub fn count_commands(&self) -> StoreResult<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row("SELECT COUNT(*) FROM commands", [], |row| row.get(0))?;
            Ok(count)
        })
    }

    /// Whether this exact invocation is already catalogued for the platform
    pub fn command_exists(&self, command: &str, platform: &str) -> StoreResult<bool> {
        self.with_conn(|conn| {
            let exists = conn
                .prepare_cached(
                    "SELECT COUNT(*) > 0 FROM commands WHERE command = ?1 AND platform = ?2",
                )?
                .query_row(params![command.trim(), platform], |row| row.get(0))?;
            Ok(exists)
        })
    }

    /// Count one more use of a command
    pub fn bump_popularity(&self, id: i64) -> StoreResult<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE commands SET popularity = popularity + 1 WHERE id = ?1",
                [id],
            )?;
            Ok(())
        })
    }

    /// Full-text search over command, explanation, category and tags.
    ///
    /// Ranked by bm25 relevance, then popularity (descending), then id. A query
    /// with no searchable words returns an empty list.
    pub fn search(&self, query: &str, limit: usize) -> StoreResult<Vec<CommandResult>> {
        self.with_conn(|conn| {
            let Some(expr) = fts_query(query) else {
                return Ok(vec![]);
            };
            if limit == 0 {
                return Ok(vec![]);
            }

            let sql = format!(
                "SELECT {}, bm25(command_fts) AS rank
                 FROM command_fts
                 JOIN commands c ON c.id = command_fts.rowid
                 WHERE command_fts MATCH ?1
                 ORDER BY bm25(command_fts), c.popularity DESC, c.id
                 LIMIT ?2",
                COMMAND_COLUMNS
            );
            let mut stmt = conn.prepare_cached(&sql)?;
            let rows = stmt.query_map(params![expr, limit as i64], |row| {
                Ok((command_from_row(row)?, row.get::<_, f64>(9)?))
            })?;

            let mut results = Vec::new();
            for row in rows {
                let (command, rank) = row?;
                let tags = load_tags(conn, command.id)?;
                results.push(CommandResult { command, tags, rank });
            }

            debug!("Search {:?} ({}) returned {} results", query, expr, results.len());
            Ok(results)
        })
    }

    /// Append an entry to the usage log; returns its id
    pub fn record_history(
        &self,
        query: &str,
        command: &str,
        executed: bool,
        success: bool,
        platform: &str,
    ) -> StoreResult<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO command_history (query, command, executed, success, platform, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![query, command, executed, success, platform, now_timestamp()],
            )?;
            let id = conn.last_insert_rowid();
            debug!("Recorded history {} for {:?}", id, command);
            Ok(id)
        })
    }

    /// Most recent history entries first (ordered by id, newest first)
    pub fn get_history(&self, limit: usize) -> StoreResult<Vec<HistoryEntry>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT id, query, command, executed, success, platform, timestamp
                 FROM command_history
                 ORDER BY id DESC
                 LIMIT ?1",
            )?;
            let entries = stmt
                .query_map([limit as i64], history_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(entries)
        })
    }

    /// History entries whose query or command contains `term`, newest first
    pub fn search_history(&self, term: &str, limit: usize) -> StoreResult<Vec<HistoryEntry>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT id, query, command, executed, success, platform, timestamp
                 FROM command_history
                 WHERE query LIKE '%' || ?1 || '%' ESCAPE '\\'
                    OR command LIKE '%' || ?1 || '%' ESCAPE '\\'
                 ORDER BY id DESC
                 LIMIT ?2",
            )?;
            let entries = stmt
                .query_map(params![escape_like(term), limit as i64], history_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(entries)
        })
    }

    /// Delete every command (tags and index rows follow); history is kept
    pub(crate) fn clear_commands(&self) -> StoreResult<usize> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM commands", [])?;
            info!("Cleared {} commands from the catalog", deleted);
            Ok(deleted)
        })
    }

    /// Release the connection. Closing twice is a no-op.
    pub fn close(&self) -> StoreResult<()> {
        let mut guard = self.lock();
        let Some(conn) = guard.take() else {
            return Ok(());
        };

        if let Err((conn, e)) = conn.close() {
            *guard = Some(conn);
            return Err(e.into());
        }

        debug!("Closed command store");
        Ok(())
    }
}

/// Open a file-backed connection, turning any failure into `Unavailable`
fn connect(path: &Path) -> StoreResult<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| StoreError::Unavailable {
            path: path.to_path_buf(),
            reason: format!("cannot create {}: {}", parent.display(), e),
        })?;
    }

    let setup = || -> rusqlite::Result<Connection> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(conn)
    };

    setup().map_err(|e| StoreError::Unavailable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Keep schema errors as they are, report everything else as `Unavailable`
fn unavailable(path: &Path, err: StoreError) -> StoreError {
    match err {
        StoreError::Sqlite(e) => StoreError::Unavailable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        },
        other => other,
    }
}

fn command_from_row(row: &Row) -> rusqlite::Result<Command> {
    Ok(Command {
        id: row.get(0)?,
        command: row.get(1)?,
        explanation: row.get(2)?,
        category: row.get(3)?,
        platform: row.get(4)?,
        dangerous: row.get(5)?,
        danger_reason: row.get(6)?,
        popularity: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn history_from_row(row: &Row) -> rusqlite::Result<HistoryEntry> {
    Ok(HistoryEntry {
        id: row.get(0)?,
        query: row.get(1)?,
        command: row.get(2)?,
        executed: row.get(3)?,
        success: row.get(4)?,
        platform: row.get(5)?,
        timestamp: row.get(6)?,
    })
}

fn load_tags(conn: &Connection, command_id: i64) -> StoreResult<Vec<String>> {
    let mut stmt =
        conn.prepare_cached("SELECT tag FROM command_tags WHERE command_id = ?1 ORDER BY tag")?;
    let tags = stmt
        .query_map([command_id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(tags)
}

/// Turn free text into an FTS5 expression: quoted words joined with OR.
///
/// Returns `None` when the text has no words at all.
fn fts_query(text: &str) -> Option<String> {
    let words: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect();

    let content: Vec<&String> = words
        .iter()
        .filter(|w| !STOP_WORDS.contains(&w.as_str()))
        .collect();
    // A query made only of stop words still searches for them
    let terms = if content.is_empty() {
        words.iter().collect()
    } else {
        content
    };

    if terms.is_empty() {
        return None;
    }

    let mut seen = Vec::new();
    for term in terms {
        if !seen.contains(term) {
            seen.push(term.clone());
        }
    }

    Some(
        seen.iter()
            .map(|t| format!("\"{}\"", t))
            .collect::<Vec<_>>()
            .join(" OR "),
    )
}

/// Escape LIKE wildcards so `term` matches literally
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Current Unix timestamp
pub(crate) fn now_timestamp() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
