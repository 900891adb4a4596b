//! Registry payload parser
//!
//! This module decodes the two JSON payloads the engine consumes:
//! - Search index pages (cursor-paginated slug summaries)
//! - Repository details (star and pull counters)

use crate::slug::normalize_slug;
use crate::HubError;
use serde::Deserialize;

/// Raw search page as returned by the registry
#[derive(Debug, Deserialize)]
struct RawDiscoveryPage {
    #[serde(default)]
    next: Option<String>,
    #[serde(default)]
    previous: Option<String>,
    #[serde(default)]
    count: Option<u64>,
    #[serde(default)]
    summaries: Option<Vec<RawSummary>>,
}

#[derive(Debug, Deserialize)]
struct RawSummary {
    #[serde(default)]
    slug: String,
}

/// One decoded page of search results
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryPage {
    /// Cursor of the following page; `None` once the listing is exhausted
    pub next: Option<String>,

    /// Cursor of the preceding page
    pub previous: Option<String>,

    /// Total result count reported by the registry
    pub count: u64,

    /// Normalized slugs found on this page
    pub slugs: Vec<String>,
}

/// Popularity counters of one repository
///
/// A counter absent from the payload reads as zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RepositoryDetail {
    #[serde(default)]
    pub star_count: i64,
    #[serde(default)]
    pub pull_count: i64,
}

/// Parses a search index page
///
/// Slugs are normalized (bare names land under `library/`); entries that
/// cannot be normalized are dropped. An empty or missing `next` ends the
/// pagination.
///
/// # Arguments
///
/// * `url` - The URL the page was fetched from, for error reporting
/// * `body` - The raw response body
///
/// # Returns
///
/// * `Ok(DiscoveryPage)` - Successfully decoded page
/// * `Err(HubError::Decode)` - The body is not a valid search page
pub fn parse_discovery_page(url: &str, body: &[u8]) -> Result<DiscoveryPage, HubError> {
    let raw: RawDiscoveryPage = serde_json::from_slice(body).map_err(|source| HubError::Decode {
        url: url.to_string(),
        source,
    })?;

    let slugs = raw
        .summaries
        .unwrap_or_default()
        .into_iter()
        .filter_map(|summary| match normalize_slug(&summary.slug) {
            Ok(slug) => Some(slug),
            Err(e) => {
                tracing::debug!("Skipping summary from {}: {}", url, e);
                None
            }
        })
        .collect();

    Ok(DiscoveryPage {
        next: non_empty(raw.next),
        previous: non_empty(raw.previous),
        count: raw.count.unwrap_or(0),
        slugs,
    })
}

/// Parses a repository detail payload
pub fn parse_repository_detail(url: &str, body: &[u8]) -> Result<RepositoryDetail, HubError> {
    serde_json::from_slice(body).map_err(|source| HubError::Decode {
        url: url.to_string(),
        source,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
