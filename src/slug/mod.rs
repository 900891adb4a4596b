//! Repository slug handling
//!
//! A slug identifies a repository as `namespace/name`. Official images are
//! listed by the registry without a namespace and live under `library/`.

use crate::{SlugError, SlugResult};

/// Namespace used for bare repository names
pub const DEFAULT_NAMESPACE: &str = "library";

/// Removes embedded newlines and surrounding whitespace from a slug
///
/// # Examples
///
/// ```
/// use hubstats::slug::clean_slug;
///
/// assert_eq!(clean_slug("  library/redis\n"), "library/redis");
/// ```
pub fn clean_slug(raw: &str) -> String {
    raw.chars()
        .filter(|c| *c != '\n' && *c != '\r')
        .collect::<String>()
        .trim()
        .to_string()
}

/// Normalizes a slug, prefixing the default namespace for bare names
///
/// # Normalization Steps
///
/// 1. Remove newlines and trim whitespace
/// 2. Reject empty input
/// 3. Prefix `library/` when the name has no namespace separator
/// 4. Reject empty namespace or name segments
///
/// # Examples
///
/// ```
/// use hubstats::slug::normalize_slug;
///
/// assert_eq!(normalize_slug("redis").unwrap(), "library/redis");
/// assert_eq!(normalize_slug("bitnami/redis").unwrap(), "bitnami/redis");
/// ```
pub fn normalize_slug(raw: &str) -> SlugResult<String> {
    let cleaned = clean_slug(raw);
    if cleaned.is_empty() {
        return Err(SlugError::Empty);
    }

    let slug = if cleaned.contains('/') {
        cleaned
    } else {
        format!("{}/{}", DEFAULT_NAMESPACE, cleaned)
    };

    if slug.split('/').any(|segment| segment.trim().is_empty()) {
        return Err(SlugError::Malformed(slug));
    }

    Ok(slug)
}
