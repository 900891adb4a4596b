//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{
    from_db_timestamp, never, to_db_timestamp, DiscoverySource, RepositoryRecord, SnapshotRecord,
};
use crate::HubError;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(HubError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, HubError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> Result<Self, HubError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn count(&self, sql: &str, params: impl rusqlite::Params) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(sql, params, |row| row.get(0))?;
        Ok(count as u64)
    }
}

/// Reads a persisted timestamp column
fn timestamp_column(row: &Row<'_>, idx: usize, column: &str) -> rusqlite::Result<DateTime<Utc>> {
    let value: String = row.get(idx)?;
    from_db_timestamp(&value).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            Box::new(StorageError::CorruptTimestamp {
                column: column.to_string(),
                value,
            }),
        )
    })
}

impl Storage for SqliteStorage {
    // ===== Counts =====

    fn count_healthy_repositories(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(id) FROM repositories WHERE error_code = 0", [])
    }

    fn count_due_repositories(&self, now: DateTime<Utc>) -> StorageResult<u64> {
        self.count(
            "SELECT COUNT(id) FROM repositories WHERE error_code = 0 AND last_scrapped_at <= ?1",
            params![to_db_timestamp(&now)],
        )
    }

    fn count_total_repositories(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(id) FROM repositories", [])
    }

    fn count_snapshots(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(id) FROM repository_snapshots", [])
    }

    // ===== Catalog =====

    fn list_healthy_slugs(&self) -> StorageResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT slug FROM repositories WHERE error_code = 0 ORDER BY id")?;

        let slugs = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;

        Ok(slugs)
    }

    fn list_due_slugs(&self, now: DateTime<Utc>, limit: u32) -> StorageResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT slug FROM repositories
             WHERE error_code = 0 AND last_scrapped_at <= ?1
             ORDER BY last_scrapped_at ASC, id ASC
             LIMIT ?2",
        )?;

        let slugs = stmt
            .query_map(params![to_db_timestamp(&now), limit], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;

        Ok(slugs)
    }

    fn insert_repositories(
        &mut self,
        source: DiscoverySource,
        slugs: &[String],
        discovered_at: DateTime<Utc>,
    ) -> StorageResult<usize> {
        let discovered_at = to_db_timestamp(&discovered_at);
        let never = to_db_timestamp(&never());

        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO repositories
                 (slug, source, discovered_at, last_scrapped_at, error_code, error_at)
                 VALUES (?1, ?2, ?3, ?4, 0, ?4)
                 ON CONFLICT(slug) DO NOTHING",
            )?;

            for slug in slugs {
                let changed = stmt.execute(params![
                    slug,
                    source.to_db_string(),
                    discovered_at,
                    never
                ])?;
                if changed > 0 {
                    tracing::trace!(slug = %slug, source = source.to_db_string(), "Discovered a new repository");
                }
                inserted += changed;
            }
        }
        tx.commit()?;

        Ok(inserted)
    }

    fn find_repository_id(&self, slug: &str) -> StorageResult<Option<i64>> {
        let id = self
            .conn
            .query_row(
                "SELECT id FROM repositories WHERE slug = ?1",
                params![slug],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    fn get_repository(&self, slug: &str) -> StorageResult<Option<RepositoryRecord>> {
        let repository = self
            .conn
            .query_row(
                "SELECT id, slug, source, discovered_at, last_scrapped_at, error_code, error_at
                 FROM repositories WHERE slug = ?1",
                params![slug],
                |row| {
                    Ok(RepositoryRecord {
                        id: row.get(0)?,
                        slug: row.get(1)?,
                        source: DiscoverySource::from_db_string(&row.get::<_, String>(2)?)
                            .unwrap_or(DiscoverySource::Discovery),
                        discovered_at: timestamp_column(row, 3, "discovered_at")?,
                        last_scrapped_at: timestamp_column(row, 4, "last_scrapped_at")?,
                        error_code: row.get(5)?,
                        error_at: timestamp_column(row, 6, "error_at")?,
                    })
                },
            )
            .optional()?;

        Ok(repository)
    }

    // ===== Snapshots =====

    fn list_snapshots(&self, repository_id: i64) -> StorageResult<Vec<SnapshotRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, repository_id, stars, pulls, fetched_at
             FROM repository_snapshots
             WHERE repository_id = ?1
             ORDER BY fetched_at ASC, id ASC",
        )?;

        let snapshots = stmt
            .query_map(params![repository_id], |row| {
                Ok(SnapshotRecord {
                    id: row.get(0)?,
                    repository_id: row.get(1)?,
                    stars: row.get(2)?,
                    pulls: row.get(3)?,
                    fetched_at: timestamp_column(row, 4, "fetched_at")?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(snapshots)
    }

    fn record_snapshot(
        &mut self,
        slug: &str,
        stars: i64,
        pulls: i64,
        fetched_at: DateTime<Utc>,
        next_anchor: DateTime<Utc>,
    ) -> StorageResult<i64> {
        // Dropping the transaction without commit rolls it back
        let tx = self.conn.transaction()?;

        let repository_id: i64 = tx
            .query_row(
                "SELECT id FROM repositories WHERE slug = ?1",
                params![slug],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| StorageError::RepositoryNotFound(slug.to_string()))?;

        tx.execute(
            "INSERT INTO repository_snapshots (repository_id, stars, pulls, fetched_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![repository_id, stars, pulls, to_db_timestamp(&fetched_at)],
        )?;
        let snapshot_id = tx.last_insert_rowid();

        tx.execute(
            "UPDATE repositories SET last_scrapped_at = ?1 WHERE id = ?2",
            params![to_db_timestamp(&next_anchor), repository_id],
        )?;

        tx.commit()?;
        Ok(snapshot_id)
    }

    // ===== Errors =====

    fn mark_error(&mut self, slug: &str, code: u16, at: DateTime<Utc>) -> StorageResult<()> {
        let changed = self.conn.execute(
            "UPDATE repositories SET error_code = ?1, error_at = ?2 WHERE slug = ?3",
            params![code, to_db_timestamp(&at), slug],
        )?;

        if changed == 0 {
            return Err(StorageError::RepositoryNotFound(slug.to_string()));
        }
        Ok(())
    }

    fn clear_error(&mut self, slug: &str) -> StorageResult<bool> {
        let changed = self.conn.execute(
            "UPDATE repositories SET error_code = 0, error_at = ?1 WHERE slug = ?2",
            params![to_db_timestamp(&never()), slug],
        )?;
        Ok(changed > 0)
    }
}
