//! URL safety check in front of a fetcher.

use async_trait::async_trait;

use super::{FetchError, HtmlFetcher};
use crate::scrapers::url_guard::UrlGuard;

/// Refuses unsafe URLs before the wrapped fetcher performs any I/O.
pub struct GuardedFetcher<F> {
    inner: F,
    guard: UrlGuard,
}

impl<F: HtmlFetcher> GuardedFetcher<F> {
    pub fn new(inner: F, guard: UrlGuard) -> Self {
        Self { inner, guard }
    }

    pub fn inner(&self) -> &F {
        &self.inner
    }
}

#[async_trait]
impl<F: HtmlFetcher> HtmlFetcher for GuardedFetcher<F> {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.guard.validate(url).await?;
        self.inner.fetch(url).await
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn shutdown(&self) {
        self.inner.shutdown().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::url_guard::ValidationError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counting {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl HtmlFetcher for Counting {
        async fn fetch(&self, _url: &str) -> Result<String, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok("<html></html>".to_string())
        }

        fn name(&self) -> &'static str {
            "counting"
        }
    }

    #[tokio::test]
    async fn test_unsafe_url_never_reaches_fetcher() {
        let fetcher = GuardedFetcher::new(Counting::default(), UrlGuard::new());
        for url in [
            "http://127.0.0.1/",
            "http://169.254.169.254/latest/meta-data/",
            "ftp://example.com/",
        ] {
            let err = fetcher.fetch(url).await.unwrap_err();
            assert!(matches!(err, FetchError::Unsafe(_)), "{url}: {err}");
        }
        assert_eq!(fetcher.inner().calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_safe_literal_address_is_fetched() {
        let fetcher = GuardedFetcher::new(Counting::default(), UrlGuard::new());
        fetcher.fetch("http://93.184.215.14/").await.unwrap();
        assert_eq!(fetcher.inner().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_validation_error_is_preserved() {
        let fetcher = GuardedFetcher::new(Counting::default(), UrlGuard::new());
        match fetcher.fetch("gopher://example.com/").await {
            Err(FetchError::Unsafe(ValidationError::DisallowedScheme { scheme, .. })) => {
                assert_eq!(scheme, "gopher")
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
