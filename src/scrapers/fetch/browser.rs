//! Headless Chrome fetcher for pages that need JavaScript.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::user_agent::DESKTOP_USER_AGENT;
use super::{FetchError, HtmlFetcher};
use crate::config::BrowserSettings;

/// Environment variables naming a browser executable, checked in order.
const CHROME_PATH_ENV: &[&str] = &["CHROMIUM_PATH", "PUPPETEER_EXECUTABLE_PATH"];

/// Common Chrome executable paths to check.
const CHROME_PATHS: &[&str] = &[
    "/usr/bin/chromium-browser",
    "/usr/bin/chromium",
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/snap/bin/chromium",
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
];

/// Resolves once the page has gone 500ms without starting a new resource
/// request, or after 10s.
const NETWORK_IDLE_SCRIPT: &str = r#"
    new Promise((resolve) => {
        const settle = () => {
            let last = performance.getEntriesByType('resource').length;
            let quiet = 0;
            const timer = setInterval(() => {
                const now = performance.getEntriesByType('resource').length;
                quiet = now === last ? quiet + 100 : 0;
                last = now;
                if (quiet >= 500) {
                    clearInterval(timer);
                    resolve('idle');
                }
            }, 100);
            setTimeout(() => { clearInterval(timer); resolve('timeout'); }, 10000);
        };
        if (document.readyState === 'complete') {
            settle();
        } else {
            window.addEventListener('load', settle);
        }
    })
"#;

fn browser_error(url: &str, e: impl std::fmt::Display) -> FetchError {
    FetchError::Browser {
        url: url.to_string(),
        message: e.to_string(),
    }
}

/// Locate a Chrome/Chromium executable: explicit setting, environment
/// variables, then well-known install paths.
pub(crate) fn find_chrome(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        if path.exists() {
            return Some(path.to_path_buf());
        }
        warn!("Configured chrome_path {} does not exist", path.display());
    }

    for var in CHROME_PATH_ENV {
        if let Ok(value) = std::env::var(var) {
            let path = PathBuf::from(value.trim());
            if !value.trim().is_empty() && path.exists() {
                debug!("Using browser from {}: {}", var, path.display());
                return Some(path);
            }
        }
    }

    CHROME_PATHS
        .iter()
        .map(Path::new)
        .find(|p| p.exists())
        .map(Path::to_path_buf)
}

/// Fetches rendered page HTML through a lazily launched headless browser.
pub struct BrowserFetcher {
    settings: BrowserSettings,
    browser: Mutex<Option<Browser>>,
}

impl BrowserFetcher {
    pub fn new(settings: BrowserSettings) -> Self {
        Self {
            settings,
            browser: Mutex::new(None),
        }
    }

    async fn launch(&self) -> Result<Browser, FetchError> {
        let mut builder = BrowserConfig::builder();
        match find_chrome(self.settings.chrome_path.as_deref()) {
            Some(path) => {
                info!("Found Chrome at: {}", path.display());
                builder = builder.chrome_executable(path);
            }
            None => debug!("No browser at known paths, using chromiumoxide detection"),
        }

        builder = builder
            .arg("--no-sandbox")
            .arg("--disable-setuid-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--no-first-run")
            .arg("--no-default-browser-check");
        for arg in &self.settings.args {
            builder = builder.arg(arg);
        }

        // Building fails when no executable was given and none can be detected.
        let config = builder.build().map_err(|e| {
            debug!("Browser config failed: {}", e);
            FetchError::BrowserNotFound
        })?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| browser_error("about:blank", e))?;

        tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        Ok(browser)
    }

    async fn render(&self, page: &Page, url: &str) -> Result<String, FetchError> {
        page.execute(SetUserAgentOverrideParams::new(DESKTOP_USER_AGENT.to_string()))
            .await
            .map_err(|e| browser_error(url, e))?;

        info!("Navigating to {}", url);
        let nav_params = NavigateParams::builder()
            .url(url)
            .build()
            .map_err(|e| browser_error(url, e))?;
        page.execute(nav_params)
            .await
            .map_err(|e| browser_error(url, e))?;

        match page.evaluate(NETWORK_IDLE_SCRIPT.to_string()).await {
            Ok(result) => {
                let state: String = result
                    .into_value()
                    .unwrap_or_else(|_| "unknown".to_string());
                debug!("Network state for {}: {}", url, state);
            }
            Err(e) => debug!("Could not wait for network idle on {}: {}", url, e),
        }

        page.content().await.map_err(|e| browser_error(url, e))
    }

}

#[async_trait]
impl HtmlFetcher for BrowserFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let timeout = self.settings.timeout();
        let mut guard = self.browser.lock().await;
        if guard.is_none() {
            *guard = Some(self.launch().await?);
        }
        let Some(browser) = guard.as_ref() else {
            return Err(FetchError::BrowserNotFound);
        };

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| browser_error(url, e))?;

        let result = match tokio::time::timeout(timeout, self.render(&page, url)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout {
                url: url.to_string(),
                timeout,
            }),
        };

        if let Err(e) = page.close().await {
            debug!("Error closing page: {}", e);
        }

        let html = result?;
        if html.trim().is_empty() {
            return Err(FetchError::EmptyBody {
                url: url.to_string(),
            });
        }
        debug!("Fetched {} ({} bytes) with browser", url, html.len());
        Ok(html)
    }

    fn name(&self) -> &'static str {
        "browser"
    }

    async fn shutdown(&self) {
        if let Some(mut browser) = self.browser.lock().await.take() {
            if let Err(e) = browser.close().await {
                debug!("Error closing browser: {}", e);
            }
        }
    }
}
