//! Refresh scheduler
//!
//! This module handles:
//! - Computing the next schedule anchor of a repository
//! - Periodically querying the store for repositories due for a snapshot
//! - Feeding due slugs into the deduplicated work queue
//! - Closing the queue when it stops

use crate::config::Config;
use crate::crawler::dedup::SnapshotQueue;
use crate::storage::{lock_storage, SharedStorage, Storage};
use crate::HubError;
use chrono::{DateTime, Duration as ChronoDuration, NaiveTime, TimeZone, Utc};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Computes the next time a repository becomes eligible for a snapshot
///
/// The anchor is the start of the current UTC day plus `days` days, so all
/// repositories fetched on the same day become due together. Returns `None`
/// when the anchor does not fit in a `DateTime<Utc>`.
///
/// # Example
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use hubstats::crawler::schedule_anchor;
///
/// let fetched = Utc.with_ymd_and_hms(2024, 1, 1, 15, 0, 0).unwrap();
/// let anchor = schedule_anchor(fetched, 1);
/// assert_eq!(anchor, Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).single());
/// ```
pub fn schedule_anchor(now: DateTime<Utc>, days: u32) -> Option<DateTime<Utc>> {
    let start_of_day = Utc.from_utc_datetime(&now.date_naive().and_time(NaiveTime::MIN));
    start_of_day.checked_add_signed(ChronoDuration::days(i64::from(days)))
}

/// Feeds due repositories into the snapshot work queue
///
/// The scheduler owns the only write end of the queue; when `run` returns
/// the queue closes and workers drain the remaining items.
pub struct RefreshScheduler {
    storage: SharedStorage,
    queue: SnapshotQueue,
    page_size: u32,
    cycle_delay: Duration,
}

impl RefreshScheduler {
    pub fn new(config: &Config, storage: SharedStorage, queue: SnapshotQueue) -> Self {
        Self {
            storage,
            queue,
            page_size: config.scraper.refresh_page_size,
            cycle_delay: config.scraper.snapshot_delay(),
        }
    }

    /// Runs scheduling cycles until cancelled or until every worker is gone
    pub async fn run(self, cancel: CancellationToken) {
        tracing::info!(
            "Refresh scheduler started (page size {}, cycle delay {}s)",
            self.page_size,
            self.cycle_delay.as_secs()
        );

        loop {
            match self.enqueue_due(Utc::now(), &cancel).await {
                Ok(enqueued) => {
                    tracing::debug!("Enqueued {} repositories for refresh", enqueued);
                }
                Err(HubError::QueueClosed) => {
                    tracing::warn!("Snapshot queue closed, stopping refresh scheduler");
                    break;
                }
                Err(e) => {
                    tracing::error!("Unable to iterate over due repositories: {}", e);
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.cycle_delay) => {}
            }
        }

        tracing::info!("Refresh scheduler stopped, closing snapshot queue");
    }

    /// Runs one scheduling cycle
    ///
    /// Queries up to `page_size` due slugs, stalest first, and enqueues those
    /// not already queued or in flight. Waiting for queue capacity is
    /// interrupted by cancellation.
    ///
    /// # Returns
    ///
    /// * `Ok(enqueued)` - Number of slugs newly enqueued
    /// * `Err(HubError)` - The store query failed or the queue is closed
    pub async fn enqueue_due(
        &self,
        now: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<usize, HubError> {
        let due = lock_storage(&self.storage)?.list_due_slugs(now, self.page_size)?;
        tracing::debug!("Found {} repositories due for refresh", due.len());

        let mut enqueued = 0;
        for slug in &due {
            let accepted = tokio::select! {
                _ = cancel.cancelled() => break,
                accepted = self.queue.try_enqueue(slug) => accepted?,
            };
            if accepted {
                enqueued += 1;
            }
        }

        Ok(enqueued)
    }
}
