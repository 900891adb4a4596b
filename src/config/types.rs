//! Configuration types deserialized from the TOML file
//!
//! Keys are kebab-case; every field has a default, so a partial file is valid.

use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Hubstats
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scraper: ScraperConfig,
    pub discovery: DiscoveryConfig,
    pub registry: RegistryConfig,
    pub storage: StorageConfig,
}

/// Snapshot refresh configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// Number of concurrent snapshot workers
    #[serde(rename = "task-count")]
    pub task_count: usize,

    /// Days between two snapshots of the same repository
    #[serde(rename = "snapshot-interval-days")]
    pub snapshot_interval_days: u32,

    /// Sleep between two refresh scheduling cycles (seconds)
    #[serde(rename = "snapshot-delay-secs")]
    pub snapshot_delay_secs: u64,

    /// Maximum number of due repositories fetched per scheduling cycle
    #[serde(rename = "refresh-page-size")]
    pub refresh_page_size: u32,
}

impl ScraperConfig {
    pub fn snapshot_delay(&self) -> Duration {
        Duration::from_secs(self.snapshot_delay_secs)
    }

    /// Human readable refresh interval, e.g. "1 days"
    pub fn refresh_interval_description(&self) -> String {
        format!("{} days", self.snapshot_interval_days)
    }
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            task_count: 3,
            snapshot_interval_days: 1,
            snapshot_delay_secs: 30,
            refresh_page_size: 500,
        }
    }
}

/// Search index discovery configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Sleep between two full discovery sweeps (seconds)
    #[serde(rename = "interval-secs")]
    pub interval_secs: u64,

    /// Sleep between two consecutive search pages (seconds)
    #[serde(rename = "delay-secs")]
    pub delay_secs: u64,

    /// Number of results requested per search page
    #[serde(rename = "page-size")]
    pub page_size: u32,
}

impl DiscoveryConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            interval_secs: 5 * 24 * 60 * 60,
            delay_secs: 30,
            page_size: 500,
        }
    }
}

/// External registry endpoints and HTTP client behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Search endpoint used to build the discovery seeds
    #[serde(rename = "search-url")]
    pub search_url: String,

    /// Base URL of the repository detail API
    #[serde(rename = "detail-base-url")]
    pub detail_base_url: String,

    /// Value of the `Search-Version` request header
    #[serde(rename = "search-version")]
    pub search_version: String,

    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Total request timeout (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Connection establishment timeout (seconds)
    #[serde(rename = "connect-timeout-secs")]
    pub connect_timeout_secs: u64,

    /// Maximum retries for a transient failure
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Delay before the first retry (milliseconds)
    #[serde(rename = "initial-backoff-ms")]
    pub initial_backoff_ms: u64,

    /// Upper bound for a single retry delay (milliseconds)
    #[serde(rename = "max-backoff-ms")]
    pub max_backoff_ms: u64,

    /// Upper bound for the time spent retrying one request (seconds)
    #[serde(rename = "max-retry-elapsed-secs")]
    pub max_retry_elapsed_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            search_url: "https://hub.docker.com/api/content/v1/products/search".to_string(),
            detail_base_url: "https://hub.docker.com/v2".to_string(),
            search_version: "v3".to_string(),
            user_agent: format!("hubstats/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: 30,
            connect_timeout_secs: 10,
            max_retries: 3,
            initial_backoff_ms: 500,
            max_backoff_ms: 10_000,
            max_retry_elapsed_secs: 30,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: "./hubstats.db".to_string(),
        }
    }
}
