//! Turning listing markup into catalog records.

pub mod category;
pub mod product;
pub mod select;

use rust_decimal::Decimal;
use thiserror::Error;
use url::Url;

pub use category::{category_tiles, discover_subcategories, extract_category, page_category_name};
pub use product::{extract_product, product_nodes};
pub use select::{SelectorChain, Strategy};

/// Failure to extract a single node. The node is skipped, the page is not.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("invalid page URL {url}: {source}")]
    BaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("implausible price {value} for '{name}' (source text '{text}')")]
    ImplausiblePrice {
        name: String,
        value: Decimal,
        text: String,
    },
}

/// Check that the page URL can anchor relative links.
pub(crate) fn parse_base(base_url: &str) -> Result<Url, ExtractionError> {
    Url::parse(base_url).map_err(|source| ExtractionError::BaseUrl {
        url: base_url.to_string(),
        source,
    })
}
