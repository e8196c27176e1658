//! Text sanitization for values scraped out of HTML.

use std::sync::LazyLock;

use regex::Regex;

/// Anything shaped like a tag left in extracted text.
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());

/// Escape HTML special characters for safe rendering.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#039;")
}

/// Collapse runs of whitespace (including non-breaking spaces) into single spaces.
pub fn normalize_whitespace(s: &str) -> String {
    s.split(|c: char| c.is_whitespace() || c == '\u{a0}')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Prepare scraped free text for storage.
///
/// Strips anything that still looks like markup, collapses whitespace and
/// escapes the remaining special characters. Returns `None` when nothing
/// is left.
pub fn sanitize_text(s: &str) -> Option<String> {
    let stripped = TAG_RE.replace_all(s, " ");
    let text = normalize_whitespace(&stripped);
    if text.is_empty() {
        None
    } else {
        Some(html_escape(&text))
    }
}
