//! In-memory catalog store for dry runs and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{CatalogCounts, CatalogStore, StoreError, StoredCategory, StoredProduct};
use crate::models::{CategoryFields, CategoryHandle, ProductFields};

#[derive(Debug, Default)]
struct Tables {
    categories: Vec<StoredCategory>,
    products: Vec<StoredProduct>,
    category_by_url: HashMap<String, usize>,
    product_by_external_id: HashMap<String, usize>,
}

/// Catalog store kept in process memory, with the same matching and
/// uniqueness rules as the SQLite store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all categories in insertion order.
    pub async fn categories(&self) -> Vec<StoredCategory> {
        self.tables.lock().await.categories.clone()
    }

    /// Snapshot of all products in insertion order.
    pub async fn products(&self) -> Vec<StoredProduct> {
        self.tables.lock().await.products.clone()
    }

    pub async fn category_by_url(&self, url: &str) -> Option<StoredCategory> {
        let tables = self.tables.lock().await;
        tables
            .category_by_url
            .get(url)
            .map(|&idx| tables.categories[idx].clone())
    }

    pub async fn product(&self, external_id: &str) -> Option<StoredProduct> {
        let tables = self.tables.lock().await;
        tables
            .product_by_external_id
            .get(external_id)
            .map(|&idx| tables.products[idx].clone())
    }
}

fn check_category_ref(tables: &Tables, id: Option<i64>) -> Result<(), StoreError> {
    match id {
        Some(id) if !tables.categories.iter().any(|c| c.id == id) => {
            Err(StoreError::MissingCategory(id))
        }
        _ => Ok(()),
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn upsert_category(
        &self,
        url: &str,
        fields: &CategoryFields,
    ) -> Result<CategoryHandle, StoreError> {
        let mut tables = self.tables.lock().await;
        check_category_ref(&tables, fields.parent_id)?;

        let existing = tables.category_by_url.get(url).copied();
        let slug_taken = tables
            .categories
            .iter()
            .enumerate()
            .any(|(idx, c)| c.slug == fields.slug && Some(idx) != existing);
        if slug_taken {
            return Err(StoreError::Conflict {
                table: "categories",
                column: "slug",
                value: fields.slug.clone(),
            });
        }

        match existing {
            Some(idx) => {
                let category = &mut tables.categories[idx];
                category.name = fields.name.clone();
                category.slug = fields.slug.clone();
                if fields.parent_id.is_some() {
                    category.parent_id = fields.parent_id;
                }
                if fields.image.is_some() {
                    category.image = fields.image.clone();
                }
                Ok(CategoryHandle { id: category.id })
            }
            None => {
                let id = tables.categories.len() as i64 + 1;
                tables.categories.push(StoredCategory {
                    id,
                    url: url.to_string(),
                    name: fields.name.clone(),
                    slug: fields.slug.clone(),
                    parent_id: fields.parent_id,
                    image: fields.image.clone(),
                });
                let idx = tables.categories.len() - 1;
                tables.category_by_url.insert(url.to_string(), idx);
                Ok(CategoryHandle { id })
            }
        }
    }

    async fn upsert_product(
        &self,
        external_id: &str,
        fields: &ProductFields,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        check_category_ref(&tables, fields.category_id)?;
        // Same precision as the database column.
        let price = fields
            .price
            .map(super::price_to_cents)
            .transpose()?
            .map(super::price_from_cents);

        match tables.product_by_external_id.get(external_id).copied() {
            Some(idx) => {
                let product = &mut tables.products[idx];
                product.name = fields.name.clone();
                product.price = price;
                product.image = fields.image.clone();
                product.link = fields.link.clone();
                product.specs = fields.specs.clone();
                product.category_id = fields.category_id;
            }
            None => {
                let id = tables.products.len() as i64 + 1;
                tables.products.push(StoredProduct {
                    id,
                    external_id: external_id.to_string(),
                    name: fields.name.clone(),
                    price,
                    image: fields.image.clone(),
                    link: fields.link.clone(),
                    specs: fields.specs.clone(),
                    category_id: fields.category_id,
                });
                let idx = tables.products.len() - 1;
                tables
                    .product_by_external_id
                    .insert(external_id.to_string(), idx);
            }
        }
        Ok(())
    }

    async fn category_exists(&self, id: i64) -> Result<bool, StoreError> {
        Ok(self.tables.lock().await.categories.iter().any(|c| c.id == id))
    }

    async fn counts(&self) -> Result<CatalogCounts, StoreError> {
        let tables = self.tables.lock().await;
        Ok(CatalogCounts {
            categories: tables.categories.len() as u64,
            products: tables.products.len() as u64,
        })
    }
}
