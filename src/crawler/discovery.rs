//! Discovery crawler
//!
//! This module walks the registry search index to populate the catalog:
//! - Building the seed listings ("default order" and "most recently updated")
//! - Following `next` cursors page by page with a fixed delay
//! - Persisting each page as one idempotent insert batch
//! - Sleeping between full sweeps until cancelled

use crate::config::Config;
use crate::crawler::fetcher::{FetchClient, FetchResult};
use crate::crawler::parser::{parse_discovery_page, DiscoveryPage};
use crate::state::ProcessCounters;
use crate::storage::{lock_storage, DiscoverySource, SharedStorage, Storage};
use crate::HubError;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Header selecting the search result format
pub const SEARCH_VERSION_HEADER: &str = "Search-Version";

/// Builds the seed listing URLs from the search endpoint
///
/// # Arguments
///
/// * `search_url` - The registry search endpoint
/// * `page_size` - Number of results requested per page
///
/// # Returns
///
/// The "default order" listing followed by the "most recently updated" listing
pub fn seed_urls(search_url: &str, page_size: u32) -> Result<Vec<String>, url::ParseError> {
    let page_size = page_size.to_string();

    let mut default_order = Url::parse(search_url)?;
    default_order
        .query_pairs_mut()
        .append_pair("q", "")
        .append_pair("type", "image")
        .append_pair("page_size", &page_size);

    let mut recently_updated = Url::parse(search_url)?;
    recently_updated
        .query_pairs_mut()
        .append_pair("sort", "updated_at")
        .append_pair("order", "desc")
        .append_pair("type", "image")
        .append_pair("page_size", &page_size);

    Ok(vec![default_order.into(), recently_updated.into()])
}

/// Paginates the search index and registers newly seen repositories
pub struct DiscoveryCrawler {
    client: FetchClient,
    storage: SharedStorage,
    counters: Arc<ProcessCounters>,
    seeds: Vec<String>,
    search_version: String,
    page_delay: Duration,
    sweep_interval: Duration,
}

impl DiscoveryCrawler {
    /// Creates a crawler over the configured seed listings
    pub fn new(
        config: &Config,
        client: FetchClient,
        storage: SharedStorage,
        counters: Arc<ProcessCounters>,
    ) -> Result<Self, HubError> {
        let seeds = seed_urls(&config.registry.search_url, config.discovery.page_size)?;

        Ok(Self {
            client,
            storage,
            counters,
            seeds,
            search_version: config.registry.search_version.clone(),
            page_delay: config.discovery.delay(),
            sweep_interval: config.discovery.interval(),
        })
    }

    pub fn seeds(&self) -> &[String] {
        &self.seeds
    }

    /// Runs discovery sweeps until cancelled
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!("Discovery crawler started with {} seeds", self.seeds.len());

        loop {
            let pages = self.sweep(&cancel).await;
            if cancel.is_cancelled() {
                break;
            }

            tracing::info!(
                "Discovery sweep finished ({} pages), next sweep in {}s",
                pages,
                self.sweep_interval.as_secs()
            );

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.sweep_interval) => {}
            }
        }

        tracing::info!("Discovery crawler stopped");
    }

    /// Walks every seed once
    ///
    /// A failing seed is logged and does not affect the others.
    ///
    /// # Returns
    ///
    /// The number of pages persisted across all seeds
    pub async fn sweep(&self, cancel: &CancellationToken) -> usize {
        let mut total_pages = 0;

        for seed in &self.seeds {
            if cancel.is_cancelled() {
                break;
            }

            tracing::debug!("Discovering repositories from {}", seed);
            match self.crawl_seed(seed, cancel).await {
                Ok(pages) => {
                    tracing::debug!("Discovery finished for {} ({} pages)", seed, pages);
                    total_pages += pages;
                }
                Err(e) => {
                    tracing::error!("Discovery aborted for {}: {}", seed, e);
                }
            }
        }

        total_pages
    }

    /// Follows one seed's `next` cursors until the listing is exhausted
    ///
    /// A cursor already visited during this walk stops the seed.
    ///
    /// # Returns
    ///
    /// * `Ok(pages)` - Number of pages fetched and persisted
    /// * `Err(HubError)` - A page failed to fetch, decode or persist
    pub async fn crawl_seed(
        &self,
        seed: &str,
        cancel: &CancellationToken,
    ) -> Result<usize, HubError> {
        let mut visited = HashSet::new();
        let mut next = Some(seed.to_string());
        let mut pages = 0;

        while let Some(url) = next.take() {
            if !visited.insert(url.clone()) {
                tracing::warn!("Search cursor loops back to {}, stopping seed", url);
                break;
            }

            let page = tokio::select! {
                _ = cancel.cancelled() => return Ok(pages),
                page = self.fetch_page(&url) => page?,
            };

            let inserted = self.persist_batch(&page.slugs)?;
            pages += 1;
            tracing::debug!(
                "Page {} of {}: {} slugs, {} new",
                pages,
                seed,
                page.slugs.len(),
                inserted
            );

            next = page.next;
            if next.is_some() {
                tokio::select! {
                    _ = cancel.cancelled() => return Ok(pages),
                    _ = tokio::time::sleep(self.page_delay) => {}
                }
            }
        }

        Ok(pages)
    }

    async fn fetch_page(&self, url: &str) -> Result<DiscoveryPage, HubError> {
        let headers = [(SEARCH_VERSION_HEADER, self.search_version.as_str())];

        match self.client.get(url, &headers).await {
            FetchResult::Success { body, .. } => parse_discovery_page(url, &body),
            FetchResult::HttpError { status_code, body } => Err(HubError::UnexpectedStatus {
                url: url.to_string(),
                status_code,
                body,
            }),
            FetchResult::NetworkError { error } => Err(HubError::Network {
                url: url.to_string(),
                error,
            }),
        }
    }

    fn persist_batch(&self, slugs: &[String]) -> Result<usize, HubError> {
        let inserted = lock_storage(&self.storage)?.insert_repositories(
            DiscoverySource::Discovery,
            slugs,
            Utc::now(),
        )?;
        self.counters.record_discovery_completed();
        Ok(inserted)
    }
}
