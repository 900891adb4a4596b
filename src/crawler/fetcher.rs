//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests against the registry, including:
//! - Building HTTP clients with the configured user agent and timeouts
//! - GET requests with extra per-request headers
//! - Retry with exponential backoff for transient failures
//! - Error classification

use crate::config::RegistryConfig;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, StatusCode};
use std::time::{Duration, Instant};

/// Retry configuration for exponential backoff
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Initial delay in milliseconds before first retry
    pub initial_delay_ms: u64,
    /// Maximum delay in milliseconds between retries
    pub max_delay_ms: u64,
    /// Multiplier for exponential backoff (2.0 doubles the delay each retry)
    pub backoff_multiplier: f64,
    /// Total time budget for retrying one request
    pub max_elapsed: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 500,
            max_delay_ms: 10_000,
            backoff_multiplier: 2.0,
            max_elapsed: Duration::from_secs(30),
        }
    }
}

impl From<&RegistryConfig> for RetryConfig {
    fn from(config: &RegistryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_delay_ms: config.initial_backoff_ms,
            max_delay_ms: config.max_backoff_ms,
            max_elapsed: Duration::from_secs(config.max_retry_elapsed_secs),
            ..Self::default()
        }
    }
}

impl RetryConfig {
    fn next_delay(&self, delay_ms: u64) -> u64 {
        std::cmp::min(
            (delay_ms as f64 * self.backoff_multiplier) as u64,
            self.max_delay_ms,
        )
    }
}

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// 2xx response
    Success {
        /// HTTP status code
        status_code: u16,
        /// Raw response body
        body: Vec<u8>,
    },

    /// Non-success status, after retries for retryable statuses ran out
    HttpError {
        /// The HTTP status code
        status_code: u16,
        /// Response body, for logging
        body: String,
    },

    /// Network error (connection refused, timeout, body read failure)
    NetworkError {
        /// Error description
        error: String,
    },
}

impl FetchResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// HTTP client wrapper shared by the discovery crawler and snapshot workers
#[derive(Debug, Clone)]
pub struct FetchClient {
    client: Client,
    retry: RetryConfig,
}

impl FetchClient {
    /// Builds a fetch client from the registry configuration
    ///
    /// # Arguments
    ///
    /// * `config` - The registry configuration
    ///
    /// # Returns
    ///
    /// * `Ok(FetchClient)` - Successfully built HTTP client
    /// * `Err(reqwest::Error)` - Failed to build client
    pub fn new(config: &RegistryConfig) -> Result<Self, reqwest::Error> {
        let client = build_http_client(config)?;
        Ok(Self {
            client,
            retry: RetryConfig::from(config),
        })
    }

    /// Wraps an existing client
    pub fn with_client(client: Client, retry: RetryConfig) -> Self {
        Self { client, retry }
    }

    /// Fetches a URL with retry logic
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | HTTP 2xx | Success |
    /// | HTTP 429 | Retry, honoring `Retry-After` |
    /// | HTTP 5xx | Retry with backoff |
    /// | Other status | Immediate → HttpError |
    /// | Timeout / connect error | Retry with backoff |
    /// | Other network error | Immediate → NetworkError |
    ///
    /// Retries stop after `max_retries` attempts or once the elapsed budget
    /// is spent; the last failure is returned as-is.
    ///
    /// # Arguments
    ///
    /// * `url` - The URL to fetch
    /// * `headers` - Extra request headers
    pub async fn get(&self, url: &str, headers: &[(&str, &str)]) -> FetchResult {
        let started = Instant::now();
        let mut delay_ms = self.retry.initial_delay_ms;
        let mut attempt = 0;

        loop {
            let mut request = self.client.get(url);
            for (name, value) in headers {
                request = request.header(*name, *value);
            }

            let can_retry =
                attempt < self.retry.max_retries && started.elapsed() < self.retry.max_elapsed;

            match request.send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return match response.bytes().await {
                            Ok(body) => FetchResult::Success {
                                status_code: status.as_u16(),
                                body: body.to_vec(),
                            },
                            Err(e) => FetchResult::NetworkError {
                                error: format!("Failed to read body: {}", e),
                            },
                        };
                    }

                    if is_retryable_status(status) && can_retry {
                        let wait_ms = if status == StatusCode::TOO_MANY_REQUESTS {
                            retry_after_ms(&response)
                                .map(|ms| ms.min(self.retry.max_delay_ms))
                                .unwrap_or(delay_ms)
                        } else {
                            delay_ms
                        };

                        attempt += 1;
                        tracing::warn!(
                            "HTTP {} from {}, retrying in {}ms (attempt {}/{})",
                            status.as_u16(),
                            url,
                            wait_ms,
                            attempt,
                            self.retry.max_retries
                        );
                        tokio::time::sleep(Duration::from_millis(wait_ms)).await;
                        delay_ms = self.retry.next_delay(delay_ms);
                        continue;
                    }

                    let body = response.text().await.unwrap_or_default();
                    return FetchResult::HttpError {
                        status_code: status.as_u16(),
                        body,
                    };
                }
                Err(e) => {
                    if (e.is_connect() || e.is_timeout()) && can_retry {
                        attempt += 1;
                        tracing::warn!(
                            "Network error for {}: {}, retrying in {}ms (attempt {}/{})",
                            url,
                            e,
                            delay_ms,
                            attempt,
                            self.retry.max_retries
                        );
                        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                        delay_ms = self.retry.next_delay(delay_ms);
                        continue;
                    }

                    return FetchResult::NetworkError {
                        error: classify_error(&e),
                    };
                }
            }
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The registry configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &RegistryConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

fn is_retryable_status(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

fn retry_after_ms(response: &reqwest::Response) -> Option<u64> {
    response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(|secs| secs.saturating_mul(1000))
}

fn classify_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "Request timeout".to_string()
    } else if e.is_connect() {
        format!("Connection failed: {}", e)
    } else {
        e.to_string()
    }
}
