//! Diesel-based catalog store for SQLite.
//!
//! Uses diesel-async's SyncConnectionWrapper to provide an async interface
//! while maintaining Diesel's compile-time query checking.

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::{RunQueryDsl, SimpleAsyncConnection};
use tracing::debug;

use super::diesel_models::{
    CategoryChanges, CategoryRow, NewCategory, NewProduct, ProductChanges, ProductRow,
};
use super::diesel_pool::AsyncSqlitePool;
use super::{
    price_to_cents, CatalogCounts, CatalogStore, StoreError, StoredCategory, StoredProduct,
};
use crate::models::{CategoryFields, CategoryHandle, ProductFields};
use crate::schema::{categories, products};

/// Table definitions created by [`DieselCatalogStore::init_schema`].
pub const SCHEMA_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS categories (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        slug TEXT NOT NULL UNIQUE,
        url TEXT NOT NULL UNIQUE,
        parent_id INTEGER REFERENCES categories(id) ON DELETE SET NULL,
        image TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_categories_parent ON categories(parent_id);

    CREATE TABLE IF NOT EXISTS products (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        external_id TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        price_cents INTEGER,
        image TEXT,
        link TEXT,
        specs TEXT,
        category_id INTEGER REFERENCES categories(id) ON DELETE SET NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_products_category ON products(category_id);
"#;

/// Catalog store backed by a SQLite database.
#[derive(Debug, Clone)]
pub struct DieselCatalogStore {
    pool: AsyncSqlitePool,
}

impl DieselCatalogStore {
    pub fn new(pool: AsyncSqlitePool) -> Self {
        Self { pool }
    }

    /// Create the catalog tables if they don't exist.
    pub async fn init_schema(&self) -> Result<(), StoreError> {
        let mut conn = self.pool.get().await?;
        conn.batch_execute(SCHEMA_SQL).await?;
        debug!("Catalog schema ready in {}", self.pool.database_url());
        Ok(())
    }

    /// Get a category by its canonical URL.
    pub async fn get_category_by_url(&self, url: &str) -> Result<Option<StoredCategory>, StoreError> {
        let mut conn = self.pool.get().await?;

        Ok(categories::table
            .filter(categories::url.eq(url))
            .select(CategoryRow::as_select())
            .first(&mut conn)
            .await
            .optional()?
            .map(StoredCategory::from))
    }

    /// Get a product by its external identifier.
    pub async fn get_product(&self, external_id: &str) -> Result<Option<StoredProduct>, StoreError> {
        let mut conn = self.pool.get().await?;

        Ok(products::table
            .filter(products::external_id.eq(external_id))
            .select(ProductRow::as_select())
            .first(&mut conn)
            .await
            .optional()?
            .map(StoredProduct::from))
    }

    /// All products of a category.
    pub async fn products_in_category(&self, category_id: i64) -> Result<Vec<StoredProduct>, StoreError> {
        let mut conn = self.pool.get().await?;

        Ok(products::table
            .filter(products::category_id.eq(category_id))
            .order(products::id.asc())
            .select(ProductRow::as_select())
            .load(&mut conn)
            .await?
            .into_iter()
            .map(StoredProduct::from)
            .collect())
    }

    /// Direct children of a category.
    pub async fn subcategories(&self, parent_id: i64) -> Result<Vec<StoredCategory>, StoreError> {
        let mut conn = self.pool.get().await?;

        Ok(categories::table
            .filter(categories::parent_id.eq(parent_id))
            .order(categories::id.asc())
            .select(CategoryRow::as_select())
            .load(&mut conn)
            .await?
            .into_iter()
            .map(StoredCategory::from)
            .collect())
    }
}

#[async_trait]
impl CatalogStore for DieselCatalogStore {
    async fn upsert_category(
        &self,
        url: &str,
        fields: &CategoryFields,
    ) -> Result<CategoryHandle, StoreError> {
        let mut conn = self.pool.get().await?;
        let now = Utc::now().to_rfc3339();

        let new = NewCategory {
            name: &fields.name,
            slug: &fields.slug,
            url,
            parent_id: fields.parent_id,
            image: fields.image.as_deref(),
            created_at: &now,
            updated_at: &now,
        };
        let changes = CategoryChanges {
            name: &fields.name,
            slug: &fields.slug,
            parent_id: fields.parent_id,
            image: fields.image.as_deref(),
            updated_at: &now,
        };

        diesel::insert_into(categories::table)
            .values(&new)
            .on_conflict(categories::url)
            .do_update()
            .set(&changes)
            .execute(&mut conn)
            .await?;

        let id: i64 = categories::table
            .filter(categories::url.eq(url))
            .select(categories::id)
            .first(&mut conn)
            .await?;

        Ok(CategoryHandle { id })
    }

    async fn upsert_product(
        &self,
        external_id: &str,
        fields: &ProductFields,
    ) -> Result<(), StoreError> {
        let price_cents = fields.price.map(price_to_cents).transpose()?;
        let mut conn = self.pool.get().await?;
        let now = Utc::now().to_rfc3339();

        let new = NewProduct {
            external_id,
            name: &fields.name,
            price_cents,
            image: fields.image.as_deref(),
            link: fields.link.as_deref(),
            specs: fields.specs.as_deref(),
            category_id: fields.category_id,
            created_at: &now,
            updated_at: &now,
        };
        let changes = ProductChanges {
            name: &fields.name,
            price_cents,
            image: fields.image.as_deref(),
            link: fields.link.as_deref(),
            specs: fields.specs.as_deref(),
            category_id: fields.category_id,
            updated_at: &now,
        };

        diesel::insert_into(products::table)
            .values(&new)
            .on_conflict(products::external_id)
            .do_update()
            .set(&changes)
            .execute(&mut conn)
            .await?;

        Ok(())
    }

    async fn category_exists(&self, id: i64) -> Result<bool, StoreError> {
        let mut conn = self.pool.get().await?;

        use diesel::dsl::count_star;
        let count: i64 = categories::table
            .filter(categories::id.eq(id))
            .select(count_star())
            .first(&mut conn)
            .await?;

        Ok(count > 0)
    }

    async fn counts(&self) -> Result<CatalogCounts, StoreError> {
        let mut conn = self.pool.get().await?;

        use diesel::dsl::count_star;
        let categories: i64 = categories::table
            .select(count_star())
            .first(&mut conn)
            .await?;
        let products: i64 = products::table.select(count_star()).first(&mut conn).await?;

        Ok(CatalogCounts {
            categories: categories as u64,
            products: products as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use tempfile::tempdir;

    async fn setup_test_db() -> (DieselCatalogStore, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let store = DieselCatalogStore::new(AsyncSqlitePool::from_path(&db_path));
        store.init_schema().await.unwrap();
        (store, dir)
    }

    fn product(name: &str, price: Option<&str>, category_id: Option<i64>) -> ProductFields {
        ProductFields {
            name: name.to_string(),
            price: price.map(|p| Decimal::from_str(p).unwrap()),
            image: Some("https://example.com/tv.webp".to_string()),
            link: Some("https://example.com/tv/123".to_string()),
            specs: None,
            category_id,
        }
    }

    #[tokio::test]
    async fn test_init_schema_is_repeatable() {
        let (store, _dir) = setup_test_db().await;
        store.init_schema().await.unwrap();
        assert_eq!(store.counts().await.unwrap(), CatalogCounts::default());
    }

    #[tokio::test]
    async fn test_category_upsert_matches_by_url() {
        let (store, _dir) = setup_test_db().await;
        let url = "https://example.com/televizorji/cene/206";

        let first = store
            .upsert_category(url, &CategoryFields::for_url(url, "TV".to_string(), None))
            .await
            .unwrap();
        let second = store
            .upsert_category(
                url,
                &CategoryFields::for_url(url, "Televizorji".to_string(), None),
            )
            .await
            .unwrap();

        assert_eq!(first, second);
        assert!(store.category_exists(first.id).await.unwrap());
        assert!(!store.category_exists(first.id + 100).await.unwrap());

        let stored = store.get_category_by_url(url).await.unwrap().unwrap();
        assert_eq!(stored.name, "Televizorji");
        assert_eq!(stored.slug, "206");
        assert_eq!(store.counts().await.unwrap().categories, 1);
    }

    #[tokio::test]
    async fn test_category_update_keeps_image_and_parent() {
        let (store, _dir) = setup_test_db().await;
        let root_url = "https://example.com/tv/cene/1";
        let child_url = "https://example.com/oled/cene/2";

        let root = store
            .upsert_category(root_url, &CategoryFields::for_url(root_url, "TV".into(), None))
            .await
            .unwrap();
        store
            .upsert_category(
                child_url,
                &CategoryFields::for_url(child_url, "OLED".into(), Some(root.id))
                    .with_image(Some("https://example.com/oled.png".into())),
            )
            .await
            .unwrap();
        store
            .upsert_category(child_url, &CategoryFields::for_url(child_url, "OLED TV".into(), None))
            .await
            .unwrap();

        let child = store.get_category_by_url(child_url).await.unwrap().unwrap();
        assert_eq!(child.name, "OLED TV");
        assert_eq!(child.parent_id, Some(root.id));
        assert_eq!(child.image.as_deref(), Some("https://example.com/oled.png"));
        assert_eq!(store.subcategories(root.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_slug_conflict_is_an_error() {
        let (store, _dir) = setup_test_db().await;
        store
            .upsert_category(
                "https://example.com/a/tv",
                &CategoryFields::for_url("https://example.com/a/tv", "A".into(), None),
            )
            .await
            .unwrap();
        let result = store
            .upsert_category(
                "https://example.com/b/tv",
                &CategoryFields::for_url("https://example.com/b/tv", "B".into(), None),
            )
            .await;
        assert!(matches!(result, Err(StoreError::Database(_))));
    }

    #[tokio::test]
    async fn test_product_upsert_is_idempotent() {
        let (store, _dir) = setup_test_db().await;
        let url = "https://example.com/tv/cene/1";
        let category = store
            .upsert_category(url, &CategoryFields::for_url(url, "TV".into(), None))
            .await
            .unwrap();

        let fields = product("Samsung QE55", Some("599.99"), Some(category.id));
        store.upsert_product("123", &fields).await.unwrap();
        store.upsert_product("123", &fields).await.unwrap();

        assert_eq!(store.counts().await.unwrap().products, 1);
        let stored = store.get_product("123").await.unwrap().unwrap();
        assert_eq!(stored.price, Some(Decimal::from_str("599.99").unwrap()));
        assert_eq!(stored.category_id, Some(category.id));
        assert_eq!(store.products_in_category(category.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_product_update_replaces_missing_price() {
        let (store, _dir) = setup_test_db().await;
        store
            .upsert_product("42", &product("LG OLED", Some("1299.00"), None))
            .await
            .unwrap();
        store
            .upsert_product("42", &product("LG OLED", None, None))
            .await
            .unwrap();

        let stored = store.get_product("42").await.unwrap().unwrap();
        assert_eq!(stored.price, None);
        assert!(store.get_product("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_product_with_unknown_category_is_rejected() {
        let (store, _dir) = setup_test_db().await;
        let result = store
            .upsert_product("7", &product("Orphan", None, Some(999)))
            .await;
        assert!(matches!(result, Err(StoreError::Database(_))));
    }
}
