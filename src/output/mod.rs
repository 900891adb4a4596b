//! Output module for engine statistics and read API results
//!
//! This module handles:
//! - Aggregating store counts and process counters into `Stats`
//! - Printing statistics and query results for the command line

pub mod stats;

pub use stats::{collect_stats, print_statistics, Stats};

use crate::storage::SnapshotRecord;
use crate::HubError;

/// Renders a snapshot history as pretty-printed JSON
///
/// # Arguments
///
/// * `snapshots` - Snapshots in ascending fetch order
///
/// # Returns
///
/// * `Ok(String)` - JSON array of `{star_count, pull_count, timestamp}`
/// * `Err(HubError)` - Serialization failed
pub fn history_json(snapshots: &[SnapshotRecord]) -> Result<String, HubError> {
    Ok(serde_json::to_string_pretty(snapshots)?)
}

/// Renders statistics as pretty-printed JSON
pub fn stats_json(stats: &Stats) -> Result<String, HubError> {
    Ok(serde_json::to_string_pretty(stats)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_empty_history_is_empty_array() {
        assert_eq!(history_json(&[]).unwrap(), "[]");
    }

    #[test]
    fn test_history_json() {
        let snapshots = vec![SnapshotRecord {
            id: 1,
            repository_id: 1,
            stars: 2,
            pulls: 40,
            fetched_at: Utc.with_ymd_and_hms(2024, 1, 1, 15, 0, 0).unwrap(),
        }];

        let json: serde_json::Value =
            serde_json::from_str(&history_json(&snapshots).unwrap()).unwrap();
        assert_eq!(json[0]["star_count"], 2);
        assert_eq!(json[0]["pull_count"], 40);
        assert_eq!(json[0]["timestamp"], "2024-01-01T15:00:00Z");
    }
}
