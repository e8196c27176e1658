//! Scraping pipeline for television catalogs.
//!
//! URLs pass the [`UrlGuard`] before any request, pages come back from an
//! [`HtmlFetcher`], the extractors turn them into records and the
//! [`Crawler`] writes those records to a catalog store.

pub mod crawl;
pub mod extract;
pub mod fetch;
pub mod price;
pub mod url_guard;

pub use crawl::{CrawlError, Crawler, DEFAULT_MAX_DEPTH};
pub use extract::ExtractionError;
pub use fetch::{build_fetcher, FetchError, HtmlFetcher};
pub use price::{is_valid_price, parse_price};
pub use url_guard::{UrlGuard, ValidationError};
