//! Hubstats: a popularity tracker for container-image registries
//!
//! This crate discovers repositories from a registry's public search index and
//! periodically records their star and pull counts as timestamped snapshots.

pub mod config;
pub mod crawler;
pub mod output;
pub mod slug;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Hubstats operations
#[derive(Debug, Error)]
pub enum HubError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Network error for {url}: {error}")]
    Network { url: String, error: String },

    #[error("Unexpected status {status_code} from {url}: {body}")]
    UnexpectedStatus {
        url: String,
        status_code: u16,
        body: String,
    },

    #[error("Failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        source: serde_json::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    StorageError(#[from] storage::StorageError),

    #[error("Slug error: {0}")]
    Slug(#[from] SlugError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Snapshot queue is closed")]
    QueueClosed,

    #[error("Task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Repository slug errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("Slug is empty")]
    Empty,

    #[error("Malformed slug: {0}")]
    Malformed(String),
}

/// Result type alias for Hubstats operations
pub type Result<T> = std::result::Result<T, HubError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for slug operations
pub type SlugResult<T> = std::result::Result<T, SlugError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::Engine;
pub use output::Stats;
pub use slug::{clean_slug, normalize_slug};
pub use state::{ProcessCounters, SnapshotOutcome};
