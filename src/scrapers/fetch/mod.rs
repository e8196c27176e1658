//! Page fetching strategies.
//!
//! A page is fetched with a headless browser when one is available and
//! with a plain HTTP client otherwise. Every URL passes the safety guard
//! before any request goes out.

#[cfg(feature = "browser")]
mod browser;
mod fallback;
mod guard;
mod http;
mod user_agent;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use super::url_guard::{UrlGuard, ValidationError};
use crate::config::FetchSettings;

#[cfg(feature = "browser")]
pub use browser::BrowserFetcher;
pub use fallback::FallbackFetcher;
pub use guard::GuardedFetcher;
pub use http::HttpFetcher;
pub use user_agent::{random_delay, random_user_agent, DESKTOP_USER_AGENT, IMPERSONATE_USER_AGENTS};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status} fetching {url}")]
    Status { status: u16, url: String },

    #[error("request blocked (HTTP 403) fetching {url}")]
    Blocked { url: String },

    #[error("empty response body from {url}")]
    EmptyBody { url: String },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Chrome/Chromium not found; install chromium or set CHROMIUM_PATH")]
    BrowserNotFound,

    #[error("browser fetch of {url} failed: {message}")]
    Browser { url: String, message: String },

    #[error("fetch of {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    #[error(transparent)]
    Unsafe(#[from] ValidationError),
}

impl FetchError {
    /// Whether the failure means no browser can be used at all.
    pub fn is_browser_missing(&self) -> bool {
        matches!(self, Self::BrowserNotFound)
    }
}

/// Something that turns a URL into page HTML.
#[async_trait]
pub trait HtmlFetcher: Send + Sync {
    /// Fetch the HTML of `url`.
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;

    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Release long-lived resources such as a running browser.
    async fn shutdown(&self) {}
}

#[async_trait]
impl<T: HtmlFetcher + ?Sized> HtmlFetcher for Box<T> {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        (**self).fetch(url).await
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }

    async fn shutdown(&self) {
        (**self).shutdown().await
    }
}

/// Build the fetcher stack from settings: URL guard in front, then the
/// browser with HTTP fallback (or HTTP alone when the browser is disabled
/// or not compiled in).
pub fn build_fetcher(settings: &FetchSettings) -> Box<dyn HtmlFetcher> {
    let guard = UrlGuard::new().with_dns_timeout(settings.dns_timeout());
    let http = HttpFetcher::new(settings.http.clone());
    Box::new(GuardedFetcher::new(with_browser(settings, http), guard))
}

#[cfg(feature = "browser")]
fn with_browser(settings: &FetchSettings, http: HttpFetcher) -> Box<dyn HtmlFetcher> {
    if settings.browser.enabled {
        let browser = BrowserFetcher::new(settings.browser.clone());
        Box::new(FallbackFetcher::new(Box::new(browser), Box::new(http)))
    } else {
        Box::new(http)
    }
}

#[cfg(not(feature = "browser"))]
fn with_browser(_settings: &FetchSettings, http: HttpFetcher) -> Box<dyn HtmlFetcher> {
    Box::new(http)
}
