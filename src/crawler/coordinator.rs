//! Engine coordinator - top-level orchestration and read API
//!
//! This module owns everything the background tasks share, including:
//! - Opening the store and building the HTTP client
//! - Spawning the discovery crawler and the snapshot workers
//! - Running the refresh scheduler until cancellation
//! - Draining the work queue and joining the tasks on shutdown
//! - Serving history, catalog and statistics queries

use crate::config::Config;
use crate::crawler::dedup::{Deduplicator, SnapshotQueue};
use crate::crawler::discovery::DiscoveryCrawler;
use crate::crawler::fetcher::FetchClient;
use crate::crawler::scheduler::RefreshScheduler;
use crate::crawler::snapshot::SnapshotProcessor;
use crate::crawler::worker::spawn_workers;
use crate::output::{collect_stats, Stats};
use crate::slug::normalize_slug;
use crate::state::ProcessCounters;
use crate::storage::{
    lock_storage, open_storage, DiscoverySource, SharedStorage, SnapshotRecord, Storage,
};
use crate::HubError;
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

/// Popularity tracking engine
///
/// Constructed once per process; background tasks receive clones of its
/// shared handles.
pub struct Engine {
    config: Arc<Config>,
    storage: SharedStorage,
    client: FetchClient,
    dedup: Arc<Deduplicator>,
    counters: Arc<ProcessCounters>,
}

impl Engine {
    /// Creates an engine backed by the configured database file
    ///
    /// # Arguments
    ///
    /// * `config` - The validated configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Engine)` - Successfully created engine
    /// * `Err(HubError)` - The store could not be opened or the client built
    pub fn new(config: Config) -> Result<Self, HubError> {
        let storage = open_storage(Path::new(&config.storage.database_path))?;
        Self::with_storage(config, storage)
    }

    /// Creates an engine over an already opened store
    pub fn with_storage(config: Config, storage: SharedStorage) -> Result<Self, HubError> {
        let client = FetchClient::new(&config.registry)?;

        Ok(Self {
            config: Arc::new(config),
            storage,
            client,
            dedup: Arc::new(Deduplicator::new()),
            counters: Arc::new(ProcessCounters::new()),
        })
    }

    /// Runs discovery, refresh scheduling and the worker pool until cancelled
    ///
    /// On cancellation the scheduler returns and closes the work queue;
    /// workers finish the items already queued, then every task is joined.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), HubError> {
        let task_count = self.config.scraper.task_count.max(1);
        tracing::info!("Starting engine with {} snapshot workers", task_count);

        // Stops discovery when the scheduler exits on its own
        let cancel = cancel.child_token();

        let (sender, receiver) = mpsc::channel(task_count);
        let queue = SnapshotQueue::new(sender, self.dedup.clone(), self.counters.clone());

        let processor =
            SnapshotProcessor::new(&self.config, self.client.clone(), self.storage.clone());
        let workers = spawn_workers(
            task_count,
            Arc::new(Mutex::new(receiver)),
            processor,
            self.dedup.clone(),
            self.counters.clone(),
        );

        let discovery = DiscoveryCrawler::new(
            &self.config,
            self.client.clone(),
            self.storage.clone(),
            self.counters.clone(),
        )?;
        let discovery_cancel = cancel.clone();
        let discovery_handle = tokio::spawn(async move {
            discovery.run(discovery_cancel).await;
        });

        RefreshScheduler::new(&self.config, self.storage.clone(), queue)
            .run(cancel.clone())
            .await;
        cancel.cancel();

        let mut first_error = None;
        for handle in workers.into_iter().chain(std::iter::once(discovery_handle)) {
            if let Err(e) = handle.await {
                tracing::error!("Engine task failed: {}", e);
                first_error.get_or_insert(e);
            }
        }

        tracing::info!(
            "Engine stopped after {} snapshots and {} discovery batches",
            self.counters.snapshots_completed(),
            self.counters.discoveries_completed()
        );

        match first_error {
            Some(e) => Err(HubError::Join(e)),
            None => Ok(()),
        }
    }

    /// Returns the snapshot history of a repository, oldest first
    ///
    /// Bare names are looked up under `library/`. An unknown slug is
    /// registered with source "search" so future refresh cycles pick it
    /// up, and an empty history is returned. Repositories in error state
    /// return whatever history they have.
    ///
    /// # Arguments
    ///
    /// * `slug` - Repository slug, with or without namespace
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<SnapshotRecord>)` - Snapshots in ascending fetch order
    /// * `Err(HubError)` - The slug is invalid or the store failed
    pub fn find_snapshots(&self, slug: &str) -> Result<Vec<SnapshotRecord>, HubError> {
        let slug = normalize_slug(slug)?;
        let mut storage = lock_storage(&self.storage)?;

        match storage.find_repository_id(&slug)? {
            Some(repository_id) => Ok(storage.list_snapshots(repository_id)?),
            None => {
                let inserted = storage.insert_repositories(
                    DiscoverySource::Search,
                    std::slice::from_ref(&slug),
                    Utc::now(),
                )?;
                if inserted > 0 {
                    tracing::info!("Registered {} from history lookup", slug);
                }
                Ok(Vec::new())
            }
        }
    }

    /// Lists the slugs of all repositories without a sticky error
    pub fn list_repository_slugs(&self) -> Result<Vec<String>, HubError> {
        Ok(lock_storage(&self.storage)?.list_healthy_slugs()?)
    }

    /// Collects current statistics; never fails
    pub fn stats(&self) -> Stats {
        let interval = self.config.scraper.refresh_interval_description();

        match lock_storage(&self.storage) {
            Ok(storage) => collect_stats(&*storage, Utc::now(), &self.counters, &interval),
            Err(e) => {
                tracing::error!("Unable to collect store statistics: {}", e);
                Stats::from_counters(&self.counters, &interval)
            }
        }
    }

    /// Clears a repository's sticky error so it is scheduled again
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The repository exists and is healthy now
    /// * `Ok(false)` - No repository with this slug
    pub fn reset_error(&self, slug: &str) -> Result<bool, HubError> {
        let slug = normalize_slug(slug)?;
        let cleared = lock_storage(&self.storage)?.clear_error(&slug)?;

        if cleared {
            tracing::info!("Cleared error state of {}", slug);
        } else {
            tracing::warn!("Cannot reset unknown repository {}", slug);
        }
        Ok(cleared)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn storage(&self) -> &SharedStorage {
        &self.storage
    }

    pub fn counters(&self) -> &Arc<ProcessCounters> {
        &self.counters
    }
}
