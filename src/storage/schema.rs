//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Hubstats database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Repository catalog
CREATE TABLE IF NOT EXISTS repositories (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    slug TEXT NOT NULL UNIQUE,
    source TEXT NOT NULL,
    discovered_at TEXT NOT NULL,
    last_scrapped_at TEXT NOT NULL,
    error_code INTEGER NOT NULL DEFAULT 0,
    error_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_repositories_schedule
    ON repositories(error_code, last_scrapped_at, id);

-- Append-only popularity history
CREATE TABLE IF NOT EXISTS repository_snapshots (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    repository_id INTEGER NOT NULL REFERENCES repositories(id),
    stars INTEGER NOT NULL,
    pulls INTEGER NOT NULL,
    fetched_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_snapshots_repository
    ON repository_snapshots(repository_id, fetched_at);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
