//! Crawl orchestration: fetch pages, extract records, write them out.
//!
//! Three strategies share one extraction flow:
//! - a single product listing page,
//! - a category listing whose tiles each lead to a product page,
//! - a category tree walked recursively through subcategory links.
//!
//! Only a failure to fetch the starting page or to write to the store ends
//! a crawl early. Any other page or node that fails is logged and skipped.

use std::collections::HashSet;

use futures::future::BoxFuture;
use scraper::Html;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::extract::{
    category_tiles, discover_subcategories, extract_category, extract_product,
    page_category_name, product_nodes, ExtractionError,
};
use super::fetch::{FetchError, HtmlFetcher};
use super::url_guard::ValidationError;
use crate::models::{name_from_url, CategoryFields, CategoryRecord, ProductRecord};
use crate::repository::{CatalogStore, StoreError};

/// Default limit on subcategory nesting followed by the tree crawl.
pub const DEFAULT_MAX_DEPTH: usize = 8;

#[derive(Debug, Error)]
pub enum CrawlError {
    #[error(transparent)]
    Fetch(FetchError),

    #[error("unsafe URL: {0}")]
    Validation(ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<FetchError> for CrawlError {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::Unsafe(v) => CrawlError::Validation(v),
            other => CrawlError::Fetch(other),
        }
    }
}

impl CrawlError {
    /// Page-level failures that a traversal skips over.
    fn is_page_failure(&self) -> bool {
        matches!(self, CrawlError::Fetch(_) | CrawlError::Validation(_))
    }
}

type NodeResult<T> = Result<Option<T>, ExtractionError>;

/// What a category page yields.
struct CategoryPage {
    name: String,
    products: Vec<NodeResult<ProductRecord>>,
    subcategories: Vec<String>,
}

fn parse_products(html: &str, url: &str) -> Vec<NodeResult<ProductRecord>> {
    let document = Html::parse_document(html);
    product_nodes(&document)
        .into_iter()
        .map(|node| extract_product(node, url))
        .collect()
}

fn parse_tiles(html: &str, url: &str) -> Vec<NodeResult<CategoryRecord>> {
    let document = Html::parse_document(html);
    category_tiles(&document)
        .into_iter()
        .map(|tile| extract_category(tile, url))
        .collect()
}

fn parse_category_page(html: &str, url: &str) -> CategoryPage {
    let document = Html::parse_document(html);
    CategoryPage {
        name: page_category_name(&document, url),
        products: product_nodes(&document)
            .into_iter()
            .map(|node| extract_product(node, url))
            .collect(),
        subcategories: discover_subcategories(&document, url),
    }
}

/// Drives fetcher, extractors and store for one crawl invocation.
pub struct Crawler<'a> {
    fetcher: &'a dyn HtmlFetcher,
    store: &'a dyn CatalogStore,
    max_depth: usize,
}

impl<'a> Crawler<'a> {
    pub fn new(fetcher: &'a dyn HtmlFetcher, store: &'a dyn CatalogStore) -> Self {
        Self {
            fetcher,
            store,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Write extracted products under `category_id`, skipping nodes that
    /// failed extraction. Returns the number written.
    async fn save_products(
        &self,
        products: Vec<NodeResult<ProductRecord>>,
        category_id: Option<i64>,
        page_url: &str,
    ) -> Result<usize, StoreError> {
        let mut saved = 0;
        for result in products {
            match result {
                Ok(Some(product)) => {
                    let key = product.storage_key();
                    debug!("Saving product {} ({})", product.name, key);
                    self.store
                        .upsert_product(&key, &product.into_fields(category_id))
                        .await?;
                    saved += 1;
                }
                Ok(None) => debug!("Skipping product node without a name on {}", page_url),
                Err(e) => warn!("Skipping product on {}: {}", page_url, e),
            }
        }
        Ok(saved)
    }

    /// Scrape the products of a single listing page into the category at
    /// that URL.
    pub async fn scrape_listing(&self, url: &str) -> Result<usize, CrawlError> {
        let html = self.fetcher.fetch(url).await?;
        let page = parse_category_page(&html, url);

        let category = self
            .store
            .upsert_category(url, &CategoryFields::for_url(url, page.name, None))
            .await?;
        let saved = self
            .save_products(page.products, Some(category.id), url)
            .await?;

        info!("Saved {} products from {}", saved, url);
        Ok(saved)
    }

    /// Scrape a category listing page: every tile becomes a category, and
    /// each category's own page is fetched for its products.
    pub async fn scrape_categories(&self, url: &str) -> Result<usize, CrawlError> {
        let html = self.fetcher.fetch(url).await?;
        let tiles = parse_tiles(&html, url);
        info!("Found {} category tiles on {}", tiles.len(), url);

        let mut total = 0;
        for tile in tiles {
            let category = match tile {
                Ok(Some(category)) => category,
                Ok(None) => {
                    debug!("Skipping category tile without name or link on {}", url);
                    continue;
                }
                Err(e) => {
                    warn!("Skipping category tile on {}: {}", url, e);
                    continue;
                }
            };

            let fields = CategoryFields::for_url(&category.url, category.name.clone(), None)
                .with_image(category.image.clone());
            let handle = self.store.upsert_category(&category.url, &fields).await?;

            let page_html = match self.fetcher.fetch(&category.url).await {
                Ok(html) => html,
                Err(e) => {
                    warn!("Skipping category {} ({}): {}", category.name, category.url, e);
                    continue;
                }
            };
            let products = parse_products(&page_html, &category.url);
            let saved = self
                .save_products(products, Some(handle.id), &category.url)
                .await?;
            info!("Saved {} products for category {}", saved, category.name);
            total += saved;
        }

        Ok(total)
    }

    /// Scrape a category and, recursively, all of its subcategories.
    ///
    /// With `parent_id`, the seed category is stored as a child of that
    /// existing category.
    pub async fn scrape_tree(
        &self,
        url: &str,
        parent_id: Option<i64>,
    ) -> Result<usize, CrawlError> {
        if let Some(id) = parent_id {
            if !self.store.category_exists(id).await? {
                return Err(StoreError::MissingCategory(id).into());
            }
        }

        let mut visited = HashSet::new();
        let total = self.visit(url.to_string(), parent_id, 0, &mut visited).await?;
        info!(
            "Saved {} products across {} categories under {}",
            total,
            visited.len(),
            url
        );
        Ok(total)
    }

    fn visit<'s>(
        &'s self,
        url: String,
        parent_id: Option<i64>,
        depth: usize,
        visited: &'s mut HashSet<String>,
    ) -> BoxFuture<'s, Result<usize, CrawlError>> {
        Box::pin(async move {
            visited.insert(url.clone());

            let html = self.fetcher.fetch(&url).await?;
            let page = parse_category_page(&html, &url);

            let category = self
                .store
                .upsert_category(&url, &CategoryFields::for_url(&url, page.name, parent_id))
                .await?;
            let mut total = self
                .save_products(page.products, Some(category.id), &url)
                .await?;
            info!("Saved {} products from {} (depth {})", total, url, depth);

            for sub_url in page.subcategories {
                if visited.contains(&sub_url) {
                    debug!("Already visited {}, not following again", sub_url);
                    continue;
                }

                let fields = CategoryFields::for_url(&sub_url, name_from_url(&sub_url), Some(category.id));
                self.store.upsert_category(&sub_url, &fields).await?;

                if depth + 1 > self.max_depth {
                    debug!("Not descending into {}: depth limit {} reached", sub_url, self.max_depth);
                    continue;
                }

                match self
                    .visit(sub_url.clone(), Some(category.id), depth + 1, visited)
                    .await
                {
                    Ok(count) => total += count,
                    Err(e) if e.is_page_failure() => {
                        warn!("Skipping subcategory {}: {}", sub_url, e)
                    }
                    Err(e) => return Err(e),
                }
            }

            Ok(total)
        })
    }
}
