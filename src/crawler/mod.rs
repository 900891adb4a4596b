//! Crawler module for repository discovery and snapshot refresh
//!
//! This module contains the core engine logic, including:
//! - HTTP fetching with retry logic
//! - Registry payload decoding
//! - Search index pagination and catalog population
//! - Staleness-based refresh scheduling with deduplication
//! - The snapshot worker pool
//! - Overall engine coordination and the read API

mod coordinator;
mod dedup;
mod discovery;
mod fetcher;
mod parser;
mod scheduler;
mod snapshot;
mod worker;

pub use coordinator::Engine;
pub use dedup::{Deduplicator, SnapshotQueue};
pub use discovery::{seed_urls, DiscoveryCrawler, SEARCH_VERSION_HEADER};
pub use fetcher::{build_http_client, FetchClient, FetchResult, RetryConfig};
pub use parser::{parse_discovery_page, parse_repository_detail, DiscoveryPage, RepositoryDetail};
pub use scheduler::{schedule_anchor, RefreshScheduler};
pub use snapshot::SnapshotProcessor;
pub use worker::{spawn_workers, SharedReceiver};
