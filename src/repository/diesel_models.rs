//! Diesel ORM models for the catalog tables.

use diesel::prelude::*;

use super::{price_from_cents, StoredCategory, StoredProduct};
use crate::schema;

/// Category record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::categories)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CategoryRow {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub url: String,
    pub parent_id: Option<i64>,
    pub image: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<CategoryRow> for StoredCategory {
    fn from(row: CategoryRow) -> Self {
        StoredCategory {
            id: row.id,
            url: row.url,
            name: row.name,
            slug: row.slug,
            parent_id: row.parent_id,
            image: row.image,
        }
    }
}

/// New category for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::categories)]
pub struct NewCategory<'a> {
    pub name: &'a str,
    pub slug: &'a str,
    pub url: &'a str,
    pub parent_id: Option<i64>,
    pub image: Option<&'a str>,
    pub created_at: &'a str,
    pub updated_at: &'a str,
}

/// Category update on conflict. `None` fields keep the stored value.
#[derive(AsChangeset, Debug)]
#[diesel(table_name = schema::categories)]
pub struct CategoryChanges<'a> {
    pub name: &'a str,
    pub slug: &'a str,
    pub parent_id: Option<i64>,
    pub image: Option<&'a str>,
    pub updated_at: &'a str,
}

/// Product record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::products)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ProductRow {
    pub id: i64,
    pub external_id: String,
    pub name: String,
    pub price_cents: Option<i64>,
    pub image: Option<String>,
    pub link: Option<String>,
    pub specs: Option<String>,
    pub category_id: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<ProductRow> for StoredProduct {
    fn from(row: ProductRow) -> Self {
        StoredProduct {
            id: row.id,
            external_id: row.external_id,
            name: row.name,
            price: row.price_cents.map(price_from_cents),
            image: row.image,
            link: row.link,
            specs: row.specs,
            category_id: row.category_id,
        }
    }
}

/// New product for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::products)]
pub struct NewProduct<'a> {
    pub external_id: &'a str,
    pub name: &'a str,
    pub price_cents: Option<i64>,
    pub image: Option<&'a str>,
    pub link: Option<&'a str>,
    pub specs: Option<&'a str>,
    pub category_id: Option<i64>,
    pub created_at: &'a str,
    pub updated_at: &'a str,
}

/// Product update on conflict. Every field is replaced, `None` included.
#[derive(AsChangeset, Debug)]
#[diesel(table_name = schema::products)]
#[diesel(treat_none_as_null = true)]
pub struct ProductChanges<'a> {
    pub name: &'a str,
    pub price_cents: Option<i64>,
    pub image: Option<&'a str>,
    pub link: Option<&'a str>,
    pub specs: Option<&'a str>,
    pub category_id: Option<i64>,
    pub updated_at: &'a str,
}
