//! Snapshot fetch-and-persist
//!
//! One cycle fetches a repository's detail payload and either records a
//! snapshot (moving the schedule anchor forward), marks a sticky error, or
//! leaves the repository untouched on transient failure.

use crate::config::Config;
use crate::crawler::fetcher::{FetchClient, FetchResult};
use crate::crawler::parser::parse_repository_detail;
use crate::crawler::scheduler::schedule_anchor;
use crate::slug::clean_slug;
use crate::state::SnapshotOutcome;
use crate::storage::{lock_storage, SharedStorage, Storage};
use chrono::{DateTime, Utc};

/// Executes one snapshot cycle per slug
#[derive(Clone)]
pub struct SnapshotProcessor {
    client: FetchClient,
    storage: SharedStorage,
    detail_base_url: String,
    interval_days: u32,
}

impl SnapshotProcessor {
    pub fn new(config: &Config, client: FetchClient, storage: SharedStorage) -> Self {
        Self {
            client,
            storage,
            detail_base_url: config.registry.detail_base_url.trim_end_matches('/').to_string(),
            interval_days: config.scraper.snapshot_interval_days,
        }
    }

    /// Detail endpoint of a repository
    pub fn detail_url(&self, slug: &str) -> String {
        format!("{}/repositories/{}/", self.detail_base_url, clean_slug(slug))
    }

    /// Fetches and persists one snapshot at the current time
    pub async fn process(&self, slug: &str) -> SnapshotOutcome {
        self.process_at(slug, Utc::now()).await
    }

    /// Fetches and persists one snapshot, using `now` as the fetch time
    ///
    /// # Flow
    ///
    /// 1. GET `<base>/repositories/<slug>/`
    /// 2. Non-success status → sticky error persisted on the repository
    /// 3. Decode `{star_count, pull_count}`; failure is transient
    /// 4. Insert the snapshot and move `last_scrapped_at` to the next
    ///    anchor in one transaction; failure is transient
    pub async fn process_at(&self, slug: &str, now: DateTime<Utc>) -> SnapshotOutcome {
        let slug = clean_slug(slug);
        let url = self.detail_url(&slug);

        let body = match self.client.get(&url, &[]).await {
            FetchResult::Success { body, .. } => body,
            FetchResult::HttpError { status_code, body } => {
                return self.mark_sticky(&slug, &url, status_code, &body, now);
            }
            FetchResult::NetworkError { error } => {
                tracing::warn!(slug = %slug, url = %url, "Snapshot fetch failed: {}", error);
                return SnapshotOutcome::transient(error);
            }
        };

        let detail = match parse_repository_detail(&url, &body) {
            Ok(detail) => detail,
            Err(e) => {
                tracing::warn!(slug = %slug, "Snapshot decode failed: {}", e);
                return SnapshotOutcome::transient(e.to_string());
            }
        };

        let Some(next_anchor) = schedule_anchor(now, self.interval_days) else {
            tracing::warn!(
                slug = %slug,
                "Refresh interval of {} days overflows the schedule",
                self.interval_days
            );
            return SnapshotOutcome::transient("schedule anchor out of range");
        };
        let recorded = lock_storage(&self.storage).and_then(|mut storage| {
            storage.record_snapshot(
                &slug,
                detail.star_count,
                detail.pull_count,
                now,
                next_anchor,
            )
        });

        match recorded {
            Ok(_) => {
                tracing::debug!(
                    slug = %slug,
                    "Snapshot stored: stars={}, pulls={}",
                    detail.star_count,
                    detail.pull_count
                );
                SnapshotOutcome::Recorded {
                    stars: detail.star_count,
                    pulls: detail.pull_count,
                    next_anchor,
                }
            }
            Err(e) => {
                tracing::warn!(slug = %slug, "Snapshot not stored: {}", e);
                SnapshotOutcome::transient(e.to_string())
            }
        }
    }

    fn mark_sticky(
        &self,
        slug: &str,
        url: &str,
        status_code: u16,
        body: &str,
        now: DateTime<Utc>,
    ) -> SnapshotOutcome {
        tracing::warn!(
            slug = %slug,
            url = %url,
            "Detail endpoint returned HTTP {}: {}",
            status_code,
            body
        );

        let marked = lock_storage(&self.storage)
            .and_then(|mut storage| storage.mark_error(slug, status_code, now));

        match marked {
            Ok(()) => SnapshotOutcome::Sticky { status_code },
            Err(e) => {
                tracing::error!(slug = %slug, "Failed to persist error status: {}", e);
                SnapshotOutcome::transient(e.to_string())
            }
        }
    }
}
