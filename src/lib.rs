//! tvscrape - television catalog scraper.
//!
//! Crawls category listings and product pages of a TV web shop and keeps
//! an idempotent local catalog of categories and products.

pub mod cli;
pub mod config;
pub mod models;
pub mod repository;
pub mod schema;
pub mod scrapers;
pub mod utils;
