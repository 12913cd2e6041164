//! Schema versioning and verification.

use rusqlite::Connection;
use tracing::{info, warn};

use super::schema::{REQUIRED_TABLES, SCHEMA_V1};
use crate::error::{StoreError, StoreResult};

/// Current schema version
const CURRENT_VERSION: i32 = 1;

/// Bring a catalog up to date.
///
/// A fresh file gets the whole schema. An initialized file is only verified:
/// a missing table is reported, not recreated, so a damaged catalog is
/// rebuilt on purpose through [`rebuild_schema`] and a forced populate.
pub fn run_migrations(conn: &Connection) -> StoreResult<()> {
    let current = get_schema_version(conn)?;

    if current == 0 && !has_catalog_tables(conn)? {
        info!("Applying initial schema (version {})", CURRENT_VERSION);
        conn.execute_batch(SCHEMA_V1)?;
        set_schema_version(conn, CURRENT_VERSION)?;
    } else {
        if current > CURRENT_VERSION {
            warn!(
                "Catalog schema version {} is newer than supported version {}",
                current, CURRENT_VERSION
            );
        }
        verify_schema(conn)?;
    }

    Ok(())
}

/// Re-apply the schema on an existing file, recreating whatever is missing
pub fn rebuild_schema(conn: &Connection) -> StoreResult<()> {
    info!("Re-applying schema (version {})", CURRENT_VERSION);
    conn.execute_batch(SCHEMA_V1)?;
    set_schema_version(conn, CURRENT_VERSION)?;
    Ok(())
}

/// Whether any catalog table is already present, versioned or not
fn has_catalog_tables(conn: &Connection) -> StoreResult<bool> {
    let mut stmt =
        conn.prepare_cached("SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name = ?1")?;

    for table in REQUIRED_TABLES.iter().filter(|t| **t != "schema_version") {
        let exists: bool = stmt.query_row([*table], |row| row.get(0))?;
        if exists {
            return Ok(true);
        }
    }

    Ok(false)
}

/// Fail with [`StoreError::SchemaMissing`] naming the first absent table
pub fn verify_schema(conn: &Connection) -> StoreResult<()> {
    let mut stmt =
        conn.prepare_cached("SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name = ?1")?;

    for table in REQUIRED_TABLES {
        let exists: bool = stmt.query_row([*table], |row| row.get(0))?;
        if !exists {
            return Err(StoreError::SchemaMissing(table.to_string()));
        }
    }

    Ok(())
}

/// Get current schema version (0 if not initialized)
fn get_schema_version(conn: &Connection) -> StoreResult<i32> {
    let table_exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='schema_version'",
        [],
        |row| row.get(0),
    )?;

    if !table_exists {
        return Ok(0);
    }

    let version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )?;

    Ok(version)
}

/// Set schema version
fn set_schema_version(conn: &Connection, version: i32) -> StoreResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_version (version, applied_at) VALUES (?1, ?2)",
        [version as i64, super::now_timestamp()],
    )?;

    Ok(())
}
