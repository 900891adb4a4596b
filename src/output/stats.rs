//! Statistics aggregation
//!
//! This module combines store counts and in-process counters into a
//! point-in-time snapshot for observability.

use crate::state::ProcessCounters;
use crate::storage::{Storage, StorageResult};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Point-in-time engine statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    /// Number of repositories in the catalog
    #[serde(rename = "discovered_repositories_total")]
    pub total_repositories: i64,

    /// Repositories without a sticky error
    #[serde(rename = "discovered_repositories_without_errors")]
    pub repositories_without_errors: i64,

    /// Always `total_repositories - repositories_without_errors`
    #[serde(rename = "discovered_repositories_with_errors")]
    pub repositories_with_errors: i64,

    /// Snapshot rows in the store
    #[serde(rename = "snapshots_completed_total")]
    pub total_snapshots: i64,

    /// Repositories currently due for a snapshot
    #[serde(rename = "snapshot_queue")]
    pub due_repositories: i64,

    #[serde(rename = "proc_snapshots_completed")]
    pub snapshots_completed: u64,

    #[serde(rename = "proc_discoveries_completed")]
    pub discoveries_completed: u64,

    /// Slugs waiting in this process's work queue
    #[serde(rename = "proc_snapshot_queue_length")]
    pub queue_length: usize,

    /// Configured refresh interval, e.g. "1 days"
    #[serde(rename = "snapshot_refresh_interval")]
    pub refresh_interval: String,
}

impl Stats {
    /// Stats carrying only the in-process counters
    pub fn from_counters(counters: &ProcessCounters, refresh_interval: &str) -> Self {
        Self {
            snapshots_completed: counters.snapshots_completed(),
            discoveries_completed: counters.discoveries_completed(),
            queue_length: counters.queue_depth(),
            refresh_interval: refresh_interval.to_string(),
            ..Self::default()
        }
    }
}

/// Collects statistics from storage and process counters
///
/// Best-effort: a failing store query is logged and its field stays zero.
///
/// # Arguments
///
/// * `storage` - The storage backend to query
/// * `now` - Reference time for the due-for-refresh count
/// * `counters` - In-process counters
/// * `refresh_interval` - Human readable refresh interval
pub fn collect_stats(
    storage: &dyn Storage,
    now: DateTime<Utc>,
    counters: &ProcessCounters,
    refresh_interval: &str,
) -> Stats {
    let total = count_or_zero("total repositories", storage.count_total_repositories());
    let healthy = count_or_zero("healthy repositories", storage.count_healthy_repositories());
    let snapshots = count_or_zero("snapshots", storage.count_snapshots());
    let due = count_or_zero("due repositories", storage.count_due_repositories(now));

    Stats {
        total_repositories: total,
        repositories_without_errors: healthy,
        repositories_with_errors: total - healthy,
        total_snapshots: snapshots,
        due_repositories: due,
        ..Stats::from_counters(counters, refresh_interval)
    }
}

fn count_or_zero(what: &str, result: StorageResult<u64>) -> i64 {
    match result {
        Ok(count) => i64::try_from(count).unwrap_or(i64::MAX),
        Err(e) => {
            tracing::error!("Unable to count {}: {}", what, e);
            0
        }
    }
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &Stats) {
    println!("=== Hubstats Statistics ===\n");

    println!("Catalog:");
    println!("  Total repositories: {}", stats.total_repositories);
    println!("  Without errors: {}", stats.repositories_without_errors);
    println!("  With errors: {}", stats.repositories_with_errors);
    println!();

    println!("Snapshots:");
    println!("  Total snapshots: {}", stats.total_snapshots);
    println!("  Due for refresh: {}", stats.due_repositories);
    println!("  Refresh interval: {}", stats.refresh_interval);
    println!();

    println!("This process:");
    println!("  Snapshots completed: {}", stats.snapshots_completed);
    println!("  Discovery batches completed: {}", stats.discoveries_completed);
    println!("  Queued: {}", stats.queue_length);
}
