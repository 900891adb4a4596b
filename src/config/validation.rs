use crate::config::types::{Config, DiscoveryConfig, RegistryConfig, ScraperConfig, StorageConfig};
use crate::ConfigError;
use url::Url;

const MAX_TASK_COUNT: usize = 64;
const MAX_SNAPSHOT_INTERVAL_DAYS: u32 = 3650;
const MAX_PAGE_SIZE: u32 = 10_000;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_scraper_config(&config.scraper)?;
    validate_discovery_config(&config.discovery)?;
    validate_registry_config(&config.registry)?;
    validate_storage_config(&config.storage)?;
    Ok(())
}

fn validate_scraper_config(config: &ScraperConfig) -> Result<(), ConfigError> {
    if config.task_count < 1 || config.task_count > MAX_TASK_COUNT {
        return Err(ConfigError::Validation(format!(
            "task-count must be between 1 and {}, got {}",
            MAX_TASK_COUNT, config.task_count
        )));
    }

    if config.snapshot_interval_days < 1
        || config.snapshot_interval_days > MAX_SNAPSHOT_INTERVAL_DAYS
    {
        return Err(ConfigError::Validation(format!(
            "snapshot-interval-days must be between 1 and {}, got {}",
            MAX_SNAPSHOT_INTERVAL_DAYS, config.snapshot_interval_days
        )));
    }

    validate_page_size("refresh-page-size", config.refresh_page_size)
}

fn validate_discovery_config(config: &DiscoveryConfig) -> Result<(), ConfigError> {
    validate_page_size("page-size", config.page_size)
}

fn validate_registry_config(config: &RegistryConfig) -> Result<(), ConfigError> {
    validate_http_url("search-url", &config.search_url)?;
    validate_http_url("detail-base-url", &config.detail_base_url)?;

    if config.search_version.trim().is_empty() {
        return Err(ConfigError::Validation(
            "search-version cannot be empty".to_string(),
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.initial_backoff_ms > config.max_backoff_ms {
        return Err(ConfigError::Validation(format!(
            "initial-backoff-ms ({}) cannot exceed max-backoff-ms ({})",
            config.initial_backoff_ms, config.max_backoff_ms
        )));
    }

    Ok(())
}

fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_page_size(name: &str, value: u32) -> Result<(), ConfigError> {
    if value < 1 || value > MAX_PAGE_SIZE {
        return Err(ConfigError::Validation(format!(
            "{} must be between 1 and {}, got {}",
            name, MAX_PAGE_SIZE, value
        )));
    }
    Ok(())
}

/// Validates that a URL parses and uses an HTTP(S) scheme
fn validate_http_url(name: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", name, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            name, value
        )));
    }

    Ok(())
}
