//! Configuration module for Hubstats
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every section and key is optional; missing values fall back to defaults.
//!
//! # Example
//!
//! ```no_run
//! use hubstats::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("hubstats.toml")).unwrap();
//! println!("Snapshot workers: {}", config.scraper.task_count);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, DiscoveryConfig, RegistryConfig, ScraperConfig, StorageConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
