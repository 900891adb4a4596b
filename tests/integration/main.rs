//! Integration tests for the engine
//!
//! These tests use wiremock to stand in for the registry search and detail
//! endpoints and exercise discovery, snapshot refresh and the read API
//! end-to-end.

mod discovery;
mod engine;
mod snapshot;

use hubstats::config::Config;
use hubstats::storage::{DiscoverySource, SharedStorage, SqliteStorage, Storage};
use std::sync::{Arc, Mutex};

/// Creates a test configuration pointing at the mock registry
pub fn create_test_config(server_uri: &str) -> Config {
    let mut config = Config::default();

    config.scraper.task_count = 2;
    config.scraper.snapshot_delay_secs = 0;
    config.discovery.delay_secs = 0;
    config.discovery.interval_secs = 3600;
    config.discovery.page_size = 2;

    config.registry.search_url = format!("{}/search", server_uri);
    config.registry.detail_base_url = format!("{}/v2", server_uri);
    config.registry.max_retries = 0;
    config.registry.initial_backoff_ms = 1;
    config.registry.max_backoff_ms = 5;
    config.registry.timeout_secs = 5;

    config
}

/// Creates an in-memory store holding the given slugs
pub fn create_test_storage(slugs: &[&str]) -> SharedStorage {
    let mut storage = SqliteStorage::new_in_memory().expect("Failed to open in-memory store");
    let slugs: Vec<String> = slugs.iter().map(|s| s.to_string()).collect();
    storage
        .insert_repositories(DiscoverySource::Discovery, &slugs, chrono::Utc::now())
        .expect("Failed to seed repositories");
    Arc::new(Mutex::new(storage))
}
