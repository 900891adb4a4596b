//! Storage traits and error types
//!
//! This module defines the query contract the crawling engine issues against
//! the catalog and snapshot tables.

use crate::storage::{DiscoverySource, RepositoryRecord, SnapshotRecord};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Repository not found: {0}")]
    RepositoryNotFound(String),

    #[error("Corrupt timestamp in column {column}: {value}")]
    CorruptTimestamp { column: String, value: String },

    #[error("Storage lock poisoned: {0}")]
    LockPoisoned(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// A repository is *due* when its error code is zero and `now` has reached its
/// `last_scrapped_at` anchor.
pub trait Storage {
    // ===== Counts =====

    /// Counts repositories without a sticky error
    fn count_healthy_repositories(&self) -> StorageResult<u64>;

    /// Counts repositories that are due for a snapshot at `now`
    fn count_due_repositories(&self, now: DateTime<Utc>) -> StorageResult<u64>;

    /// Counts all repositories
    fn count_total_repositories(&self) -> StorageResult<u64>;

    /// Counts all snapshots
    fn count_snapshots(&self) -> StorageResult<u64>;

    // ===== Catalog =====

    /// Lists the slugs of all repositories without a sticky error
    fn list_healthy_slugs(&self) -> StorageResult<Vec<String>>;

    /// Lists due slugs, stalest first, ordered by `(last_scrapped_at, id)`
    ///
    /// # Arguments
    ///
    /// * `now` - The reference time for the staleness predicate
    /// * `limit` - Maximum number of slugs returned
    fn list_due_slugs(&self, now: DateTime<Utc>, limit: u32) -> StorageResult<Vec<String>>;

    /// Inserts repositories in one transaction, ignoring slugs that already exist
    ///
    /// # Returns
    ///
    /// The number of rows actually inserted
    fn insert_repositories(
        &mut self,
        source: DiscoverySource,
        slugs: &[String],
        discovered_at: DateTime<Utc>,
    ) -> StorageResult<usize>;

    /// Looks up the internal id of a repository
    fn find_repository_id(&self, slug: &str) -> StorageResult<Option<i64>>;

    /// Loads a full repository row
    fn get_repository(&self, slug: &str) -> StorageResult<Option<RepositoryRecord>>;

    // ===== Snapshots =====

    /// Lists the snapshots of a repository in ascending fetch order
    fn list_snapshots(&self, repository_id: i64) -> StorageResult<Vec<SnapshotRecord>>;

    /// Records a snapshot and moves the schedule anchor in one transaction
    ///
    /// Fails with `RepositoryNotFound` if the slug is unknown; nothing is
    /// written in that case.
    ///
    /// # Returns
    ///
    /// The id of the new snapshot row
    fn record_snapshot(
        &mut self,
        slug: &str,
        stars: i64,
        pulls: i64,
        fetched_at: DateTime<Utc>,
        next_anchor: DateTime<Utc>,
    ) -> StorageResult<i64>;

    // ===== Errors =====

    /// Sets the sticky error fields of a repository
    fn mark_error(&mut self, slug: &str, code: u16, at: DateTime<Utc>) -> StorageResult<()>;

    /// Clears the sticky error fields of a repository
    ///
    /// # Returns
    ///
    /// `true` if a repository with this slug exists
    fn clear_error(&mut self, slug: &str) -> StorageResult<bool>;
}
