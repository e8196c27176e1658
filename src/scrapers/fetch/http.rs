//! Plain HTTP fetcher with browser-like request headers.

use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{redirect, Client, StatusCode};
use tracing::{debug, warn};

use super::user_agent::{random_delay, random_user_agent};
use super::{FetchError, HtmlFetcher};
use crate::config::HttpSettings;

const ACCEPT_HTML: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";

/// Fetches pages with a fresh client per request.
///
/// Each request gets its own cookie jar (kept across the redirects of that
/// request only), a user agent drawn from the pool and a short random delay
/// before it is sent.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    settings: HttpSettings,
}

impl HttpFetcher {
    pub fn new(settings: HttpSettings) -> Self {
        Self { settings }
    }

    fn default_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
        headers.insert(header::DNT, HeaderValue::from_static("1"));
        headers.insert(
            header::UPGRADE_INSECURE_REQUESTS,
            HeaderValue::from_static("1"),
        );
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
        headers.insert("sec-fetch-dest", HeaderValue::from_static("document"));
        headers.insert("sec-fetch-mode", HeaderValue::from_static("navigate"));
        headers.insert("sec-fetch-site", HeaderValue::from_static("cross-site"));
        headers.insert("sec-fetch-user", HeaderValue::from_static("?1"));

        match HeaderValue::from_str(&self.settings.accept_language) {
            Ok(value) => {
                headers.insert(header::ACCEPT_LANGUAGE, value);
            }
            Err(_) => warn!(
                "Ignoring invalid Accept-Language setting: {:?}",
                self.settings.accept_language
            ),
        }
        if !self.settings.referer.is_empty() {
            match HeaderValue::from_str(&self.settings.referer) {
                Ok(value) => {
                    headers.insert(header::REFERER, value);
                }
                Err(_) => warn!("Ignoring invalid Referer setting: {:?}", self.settings.referer),
            }
        }
        headers
    }

    fn build_client(&self, url: &str) -> Result<Client, FetchError> {
        Client::builder()
            .user_agent(random_user_agent())
            .default_headers(self.default_headers())
            .cookie_store(true)
            .redirect(redirect::Policy::limited(self.settings.max_redirects))
            .timeout(self.settings.timeout())
            .connect_timeout(self.settings.connect_timeout())
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })
    }

    fn request_error(&self, url: &str, source: reqwest::Error) -> FetchError {
        if source.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
                timeout: self.settings.timeout(),
            }
        } else {
            FetchError::Transport {
                url: url.to_string(),
                source,
            }
        }
    }
}

#[async_trait]
impl HtmlFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let delay = random_delay(self.settings.min_delay_ms, self.settings.max_delay_ms);
        debug!("Waiting {:?} before requesting {}", delay, url);
        tokio::time::sleep(delay).await;

        let client = self.build_client(url)?;
        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| self.request_error(url, e))?;

        let status = response.status();
        if status == StatusCode::FORBIDDEN {
            return Err(FetchError::Blocked {
                url: url.to_string(),
            });
        }
        if status != StatusCode::OK {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| self.request_error(url, e))?;
        if body.trim().is_empty() {
            return Err(FetchError::EmptyBody {
                url: url.to_string(),
            });
        }

        debug!("Fetched {} ({} bytes) over HTTP", url, body.len());
        Ok(body)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
