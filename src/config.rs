//! Configuration management for tvscrape using the prefer crate.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default SQLite database filename.
pub const DEFAULT_DATABASE: &str = "tvscrape.db";

/// Entry page of the flat product listing.
pub const DEFAULT_LISTING_URL: &str = "https://www.shoptok.si/televizorji/cene/206";

/// Entry page for the category listing and the recursive tree crawl.
pub const DEFAULT_CATEGORY_URL: &str = "https://www.shoptok.si/tv-prijamnici/cene/56";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {format} config {path}: {message}")]
    Parse {
        path: PathBuf,
        format: &'static str,
        message: String,
    },
}

/// Headless browser settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    /// Use the browser as the primary fetcher.
    pub enabled: bool,
    /// Navigation timeout in seconds.
    pub timeout_secs: u64,
    /// Explicit Chrome/Chromium executable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chrome_path: Option<PathBuf>,
    /// Additional Chrome arguments.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_secs: 60,
            chrome_path: None,
            args: Vec::new(),
        }
    }
}

impl BrowserSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Plain HTTP fallback settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Lower bound of the random pre-request delay.
    pub min_delay_ms: u64,
    /// Upper bound of the random pre-request delay.
    pub max_delay_ms: u64,
    pub max_redirects: usize,
    pub referer: String,
    pub accept_language: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            connect_timeout_secs: 10,
            min_delay_ms: 1000,
            max_delay_ms: 3000,
            max_redirects: 5,
            referer: "https://www.google.com/".to_string(),
            accept_language: "sl-SI,sl;q=0.9,en-US;q=0.8,en;q=0.7".to_string(),
        }
    }
}

impl HttpSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

fn default_dns_timeout_secs() -> u64 {
    5
}

/// Fetching settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchSettings {
    #[serde(default)]
    pub browser: BrowserSettings,
    #[serde(default)]
    pub http: HttpSettings,
    /// Bound on DNS resolution in the URL safety check.
    #[serde(default = "default_dns_timeout_secs")]
    pub dns_timeout_secs: u64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            browser: BrowserSettings::default(),
            http: HttpSettings::default(),
            dns_timeout_secs: default_dns_timeout_secs(),
        }
    }
}

impl FetchSettings {
    pub fn dns_timeout(&self) -> Duration {
        Duration::from_secs(self.dns_timeout_secs)
    }
}

fn default_max_depth() -> usize {
    8
}

/// Crawl traversal settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlSettings {
    /// Deepest subcategory level followed by the recursive crawl.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
        }
    }
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// SQLite database path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(default)]
    pub fetch: FetchSettings,
    #[serde(default)]
    pub crawl: CrawlSettings,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration using prefer crate for discovery.
    /// Falls back to defaults when no tvscrape config file is found.
    pub async fn load() -> Self {
        let config = match prefer::load("tvscrape").await {
            Ok(pref_config) => match pref_config.source_path() {
                Some(path) => match Self::load_from_path(path).await {
                    Ok(config) => config,
                    Err(e) => {
                        tracing::warn!("Ignoring config file: {}", e);
                        Self::default()
                    }
                },
                None => Self::default(),
            },
            Err(_) => Self::default(),
        };
        config.with_env_overrides()
    }

    /// Load configuration from a specific file path.
    /// Supports JSON, TOML and YAML based on file extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
        let parse_error = |format: &'static str, message: String| ConfigError::Parse {
            path: path.to_path_buf(),
            format,
            message,
        };

        let mut config: Config = match ext {
            "toml" => toml::from_str(&contents).map_err(|e| parse_error("TOML", e.to_string()))?,
            "yaml" | "yml" => {
                serde_yaml::from_str(&contents).map_err(|e| parse_error("YAML", e.to_string()))?
            }
            _ => serde_json::from_str(&contents).map_err(|e| parse_error("JSON", e.to_string()))?,
        };

        config.source_path = Some(path.to_path_buf());
        Ok(config.with_env_overrides())
    }

    /// Apply environment variable overrides.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(database) = std::env::var("TVSCRAPE_DATABASE") {
            if !database.trim().is_empty() {
                self.database = Some(database);
            }
        }
        self
    }

    /// Get the base directory for resolving relative paths.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve a path that may be relative to the config file.
    /// - Absolute paths are returned as-is
    /// - Paths starting with ~ are expanded
    /// - Relative paths are resolved relative to `base_dir`
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Effective database path. A relative configured path is anchored at
    /// the config file's directory; the default lives in the working directory.
    pub fn database_path(&self) -> PathBuf {
        match (&self.database, self.base_dir()) {
            (Some(db), Some(base)) => self.resolve_path(db, &base),
            (Some(db), None) => self.resolve_path(db, Path::new(".")),
            (None, _) => PathBuf::from(DEFAULT_DATABASE),
        }
    }
}
