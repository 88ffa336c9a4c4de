//! Schema migrations for the summary queue database.
//!
//! A `schema_version` table records which migrations have been applied; each
//! runs once and is safe to re-check on every open.

use chrono::Utc;
use rusqlite::{params, Connection};

pub const CURRENT_SCHEMA_VERSION: i32 = 2;

/// Returns the applied schema version (0 for a fresh database).
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )
    .unwrap_or(0)
}

pub fn run_all(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = FULL;
         CREATE TABLE IF NOT EXISTS schema_version (
             version INTEGER PRIMARY KEY,
             applied_at TEXT NOT NULL,
             description TEXT NOT NULL
         );",
    )?;

    let version = get_schema_version(conn);
    if version >= CURRENT_SCHEMA_VERSION {
        return Ok(());
    }
    if version < 1 {
        migration_v1(conn)?;
        record_version(conn, 1, "Webpage queue table")?;
    }
    if version < 2 {
        migration_v2(conn)?;
        record_version(conn, 2, "Delivered marker")?;
    }

    Ok(())
}

fn record_version(conn: &Connection, version: i32, description: &str) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version, applied_at, description) VALUES (?1, ?2, ?3)",
        params![version, Utc::now(), description],
    )?;
    Ok(())
}

/// V1: the webpage queue. AUTOINCREMENT keeps ids from being reused after
/// deletion, so `id` order is insertion order.
fn migration_v1(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS webpages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            url TEXT NOT NULL UNIQUE,
            title TEXT NOT NULL DEFAULT '',
            summary TEXT NOT NULL DEFAULT '',
            state TEXT NOT NULL DEFAULT 'pending',
            created_at TEXT NOT NULL,
            ready_at TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_webpages_state ON webpages(state, id);
        ",
    )
}

/// V2: `delivered_at` marks records read in full whose deletion has not
/// succeeded yet. Such records are never offered for reading again.
fn migration_v2(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch("ALTER TABLE webpages ADD COLUMN delivered_at TEXT;")
}
