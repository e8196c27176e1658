//! URL helpers shared by the extractors: resolution, srcset parsing and
//! stable identifier derivation.

use sha2::{Digest, Sha256};
use url::Url;

/// Check whether a string is an absolute http(s) URL.
pub fn is_http_url(s: &str) -> bool {
    Url::parse(s)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
        .unwrap_or(false)
}

/// Resolve an href or src found on a page against the page URL.
///
/// Absolute URLs are returned as-is, root-relative and path-relative
/// references are joined onto the base. Anything that does not end up as
/// an http(s) URL (`javascript:`, `mailto:`, `data:` placeholders) yields
/// `None`.
pub fn resolve_url(base_url: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let resolved = match Url::parse(href) {
        Ok(absolute) => absolute,
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(base_url).ok()?.join(href).ok()?,
        Err(_) => return None,
    };

    if matches!(resolved.scheme(), "http" | "https") && resolved.host_str().is_some() {
        Some(resolved.to_string())
    } else {
        None
    }
}

/// First candidate URL in a `srcset` attribute (`"a.webp 1x, b.webp 2x"` -> `"a.webp"`).
pub fn first_srcset_url(srcset: &str) -> Option<&str> {
    srcset
        .split(',')
        .next()
        .and_then(|candidate| candidate.split_whitespace().next())
        .filter(|s| !s.is_empty())
}

/// Last non-empty path segment of a URL.
pub fn last_path_segment(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed
        .path_segments()?
        .filter(|segment| !segment.is_empty())
        .next_back()
        .map(|segment| {
            urlencoding::decode(segment)
                .map(|decoded| decoded.into_owned())
                .unwrap_or_else(|_| segment.to_string())
        })
}

/// SHA-256 hex digest over the concatenated parts.
pub fn content_hash(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Derive the stable external identifier of a product from its page URL.
///
/// Uses the last path segment consisting only of digits (product pages
/// carry their catalog id there), otherwise a content hash of the URL.
pub fn external_id_from_link(link: &str) -> String {
    Url::parse(link)
        .ok()
        .and_then(|u| {
            u.path_segments().and_then(|segments| {
                segments
                    .filter(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()))
                    .next_back()
                    .map(str::to_string)
            })
        })
        .unwrap_or_else(|| content_hash(&[link]))
}
