//! Catalog persistence.
//!
//! Categories are matched by their canonical URL, products by their
//! external identifier, so writing the same page twice never duplicates
//! rows. The SQLite store uses Diesel with compile-time query checking;
//! the in-memory store backs dry runs and tests.

pub mod diesel_catalog;
pub mod diesel_models;
pub mod diesel_pool;
pub mod memory;

pub use diesel_catalog::DieselCatalogStore;
pub use diesel_pool::{AsyncSqliteConnection, AsyncSqlitePool};
pub use memory::MemoryStore;

use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use crate::models::{CategoryFields, CategoryHandle, ProductFields};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("failed to open database {url}: {message}")]
    Connection { url: String, message: String },

    #[error("{table}.{column} '{value}' already belongs to another row")]
    Conflict {
        table: &'static str,
        column: &'static str,
        value: String,
    },

    #[error("category {0} does not exist")]
    MissingCategory(i64),

    #[error("price {0} cannot be stored")]
    PriceOutOfRange(Decimal),
}

/// Row counts of a catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CatalogCounts {
    pub categories: u64,
    pub products: u64,
}

/// A stored category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredCategory {
    pub id: i64,
    pub url: String,
    pub name: String,
    pub slug: String,
    pub parent_id: Option<i64>,
    pub image: Option<String>,
}

/// A stored product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredProduct {
    pub id: i64,
    pub external_id: String,
    pub name: String,
    pub price: Option<Decimal>,
    pub image: Option<String>,
    pub link: Option<String>,
    pub specs: Option<String>,
    pub category_id: Option<i64>,
}

/// Where crawled categories and products are written.
///
/// Category upserts leave an existing parent or image untouched when the
/// new fields carry none; product upserts replace every field.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Insert or update the category at `url`.
    async fn upsert_category(
        &self,
        url: &str,
        fields: &CategoryFields,
    ) -> Result<CategoryHandle, StoreError>;

    /// Insert or update the product with `external_id`.
    async fn upsert_product(
        &self,
        external_id: &str,
        fields: &ProductFields,
    ) -> Result<(), StoreError>;

    async fn category_exists(&self, id: i64) -> Result<bool, StoreError>;

    async fn counts(&self) -> Result<CatalogCounts, StoreError>;
}

#[async_trait]
impl<T: CatalogStore + ?Sized> CatalogStore for Box<T> {
    async fn upsert_category(
        &self,
        url: &str,
        fields: &CategoryFields,
    ) -> Result<CategoryHandle, StoreError> {
        (**self).upsert_category(url, fields).await
    }

    async fn upsert_product(
        &self,
        external_id: &str,
        fields: &ProductFields,
    ) -> Result<(), StoreError> {
        (**self).upsert_product(external_id, fields).await
    }

    async fn category_exists(&self, id: i64) -> Result<bool, StoreError> {
        (**self).category_exists(id).await
    }

    async fn counts(&self) -> Result<CatalogCounts, StoreError> {
        (**self).counts().await
    }
}

/// Price as whole cents.
pub fn price_to_cents(price: Decimal) -> Result<i64, StoreError> {
    price
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|cents| cents.round().to_i64())
        .ok_or(StoreError::PriceOutOfRange(price))
}

/// Price from whole cents, at two decimal places.
pub fn price_from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}
