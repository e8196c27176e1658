//! Data models for scraped catalog records.

mod category;
mod product;

pub use category::{name_from_url, slug_from_url, CategoryFields, CategoryHandle, CategoryRecord};
pub use product::{ProductFields, ProductRecord};
