//! Storage module for the repository catalog and snapshot history
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Idempotent repository discovery inserts
//! - Staleness-ordered refresh queries
//! - Atomic snapshot recording with schedule-anchor updates
//! - Sticky error marking and reset

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::HubError;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Storage handle shared between the crawling tasks and the read API
pub type SharedStorage = Arc<Mutex<SqliteStorage>>;

/// Persisted timestamp layout; fixed width so text order is chronological
const DB_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// Opens a storage database and wraps it for sharing across tasks
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SharedStorage)` - Successfully initialized storage
/// * `Err(HubError)` - Failed to open or initialize the database
pub fn open_storage(path: &Path) -> Result<SharedStorage, HubError> {
    Ok(Arc::new(Mutex::new(SqliteStorage::new(path)?)))
}

/// Locks the shared storage for one synchronous store call
///
/// The guard must not be held across an `.await`.
pub fn lock_storage(storage: &SharedStorage) -> StorageResult<MutexGuard<'_, SqliteStorage>> {
    storage
        .lock()
        .map_err(|e| StorageError::LockPoisoned(e.to_string()))
}

/// The "never" timestamp: new repositories are immediately due and healthy
/// repositories carry it as their error timestamp
pub fn never() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(1, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Formats a timestamp for persistence
pub fn to_db_timestamp(time: &DateTime<Utc>) -> String {
    time.format(DB_TIMESTAMP_FORMAT).to_string()
}

/// Parses a persisted timestamp
pub fn from_db_timestamp(value: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.fZ")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Provenance of a repository row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscoverySource {
    /// Found by the discovery crawler
    Discovery,
    /// Inserted lazily by a history lookup for an unknown slug
    Search,
}

impl DiscoverySource {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Discovery => "discovery",
            Self::Search => "search",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "discovery" => Some(Self::Discovery),
            "search" => Some(Self::Search),
            _ => None,
        }
    }
}

/// Represents a repository in the catalog
#[derive(Debug, Clone, Serialize)]
pub struct RepositoryRecord {
    #[serde(skip)]
    pub id: i64,
    pub slug: String,
    pub source: DiscoverySource,
    pub discovered_at: DateTime<Utc>,
    /// Next time the repository becomes eligible for a snapshot
    pub last_scrapped_at: DateTime<Utc>,
    #[serde(skip)]
    pub error_code: i64,
    #[serde(skip)]
    pub error_at: DateTime<Utc>,
}

impl RepositoryRecord {
    pub fn is_healthy(&self) -> bool {
        self.error_code == 0
    }
}

/// Represents one point-in-time measurement of a repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotRecord {
    #[serde(skip)]
    pub id: i64,
    #[serde(skip)]
    pub repository_id: i64,
    #[serde(rename = "star_count")]
    pub stars: i64,
    #[serde(rename = "pull_count")]
    pub pulls: i64,
    #[serde(rename = "timestamp")]
    pub fetched_at: DateTime<Utc>,
}
