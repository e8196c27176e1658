//! Primary/fallback fetcher selection.

use async_trait::async_trait;
use tracing::{info, warn};

use super::{FetchError, HtmlFetcher};

/// Tries the primary fetcher and falls back to the secondary on failure.
///
/// A missing browser is not retried: it is reported as-is so the caller
/// can tell a broken installation from a flaky page.
pub struct FallbackFetcher {
    primary: Box<dyn HtmlFetcher>,
    fallback: Box<dyn HtmlFetcher>,
}

impl FallbackFetcher {
    pub fn new(primary: Box<dyn HtmlFetcher>, fallback: Box<dyn HtmlFetcher>) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl HtmlFetcher for FallbackFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        match self.primary.fetch(url).await {
            Ok(html) => Ok(html),
            Err(e) if e.is_browser_missing() => Err(e),
            Err(FetchError::Unsafe(e)) => Err(FetchError::Unsafe(e)),
            Err(e) => {
                warn!(
                    "{} fetch of {} failed ({}), falling back to {}",
                    self.primary.name(),
                    url,
                    e,
                    self.fallback.name()
                );
                let html = self.fallback.fetch(url).await?;
                info!("Fetched {} with {}", url, self.fallback.name());
                Ok(html)
            }
        }
    }

    fn name(&self) -> &'static str {
        "fallback"
    }

    async fn shutdown(&self) {
        self.primary.shutdown().await;
        self.fallback.shutdown().await;
    }
}
