//! Product models.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::utils::content_hash;

/// A product as extracted from one product node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    /// Sanitized display name. Always present.
    pub name: String,
    /// Plausible price at two-decimal precision, `None` when unavailable.
    pub price: Option<Decimal>,
    pub image: Option<String>,
    /// Canonical product page URL.
    pub link: Option<String>,
    /// Sanitized free-text specification summary.
    pub specs: Option<String>,
    /// Identifier derived from the link, if there is a link.
    pub external_id: Option<String>,
}

impl ProductRecord {
    /// The identifier this product is stored under.
    ///
    /// Products without a link are keyed by a hash of name and link so
    /// repeated runs still hit the same row.
    pub fn storage_key(&self) -> String {
        match &self.external_id {
            Some(id) if !id.is_empty() => id.clone(),
            _ => content_hash(&[&self.name, self.link.as_deref().unwrap_or("")]),
        }
    }

    /// Fields written for this product, tagged with its category.
    pub fn into_fields(self, category_id: Option<i64>) -> ProductFields {
        ProductFields {
            name: self.name,
            price: self.price,
            image: self.image,
            link: self.link,
            specs: self.specs,
            category_id,
        }
    }
}

/// Fields written for a product, matched by its external identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFields {
    pub name: String,
    pub price: Option<Decimal>,
    pub image: Option<String>,
    pub link: Option<String>,
    pub specs: Option<String>,
    pub category_id: Option<i64>,
}
