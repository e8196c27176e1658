//! Shared utility functions.
//!
//! This module contains reusable utilities used across the codebase:
//! - `html`: text sanitization and HTML escaping for stored free text
//! - `url`: absolute URL construction and identifier derivation

mod html;
mod url;

pub use html::{html_escape, normalize_whitespace, sanitize_text};
pub use url::{
    content_hash, external_id_from_link, first_srcset_url, is_http_url, last_path_segment,
    resolve_url,
};
