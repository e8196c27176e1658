//! End-to-end crawl scenarios over an in-memory site and catalog.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::str::FromStr;

use tvscrape::models::CategoryFields;
use tvscrape::repository::{CatalogStore, MemoryStore, StoreError};
use tvscrape::scrapers::fetch::GuardedFetcher;
use tvscrape::scrapers::{CrawlError, Crawler, FetchError, HtmlFetcher, UrlGuard};

const TILE_CLASSES: &str = "col-4 col-md-3 col-lg-2 col-xl-1-5 mb-5";
const NAME_CLASSES: &str =
    "text-center line-height-13 mt-3 mb-0 text-16 font-semibold font-poppins";

/// Serves fixed pages and records every URL requested.
#[derive(Default)]
struct Site {
    pages: HashMap<String, String>,
    requests: Mutex<Vec<String>>,
}

impl Site {
    fn page(mut self, url: &str, html: impl Into<String>) -> Self {
        self.pages.insert(url.to_string(), html.into());
        self
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HtmlFetcher for Site {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.requests.lock().unwrap().push(url.to_string());
        self.pages.get(url).cloned().ok_or(FetchError::Status {
            status: 404,
            url: url.to_string(),
        })
    }

    fn name(&self) -> &'static str {
        "site"
    }
}

fn product(name: &str, link: &str, price: &str) -> String {
    format!(
        r#"<div class="b-paging-product">
             <a href="{link}"><img class="lazy" data-src="/img/{name}.webp"></a>
             <h3>{name}</h3>
             <div class="b-paging-product__price">{price}</div>
           </div>"#
    )
}

fn tile(name: &str, href: &str) -> String {
    format!(
        r#"<div class="{TILE_CLASSES}">
             <a href="{href}"><picture><source srcset="/img/{name}.webp 1x"></picture></a>
             <p class="{NAME_CLASSES}">{name}</p>
           </div>"#
    )
}

fn category_page(heading: &str, body: &str, subcategories: &[&str]) -> String {
    let links: String = subcategories
        .iter()
        .map(|href| format!(r#"<li><a href="{href}">sub</a></li>"#))
        .collect();
    format!(r#"<h1>{heading}</h1>{body}<ul class="category-list">{links}</ul>"#)
}

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

const LISTING: &str = "https://shop.test/televizorji/cene/206";

fn listing_site() -> Site {
    Site::default().page(
        LISTING,
        format!(
            "<h1>Televizorji</h1>{}{}",
            product("Samsung QE55", "/televizorji/samsung-qe55/cena/1001", "599,99 €"),
            product("Hisense 4302", "/televizorji/hisense/cena/1002", "model 4302"),
        ),
    )
}

#[tokio::test]
async fn listing_keeps_plausible_products_only() {
    let site = listing_site();
    let store = MemoryStore::new();

    let saved = Crawler::new(&site, &store).scrape_listing(LISTING).await.unwrap();
    assert_eq!(saved, 1);

    let category = store.category_by_url(LISTING).await.unwrap();
    assert_eq!(category.name, "Televizorji");
    assert_eq!(category.slug, "206");

    let stored = store.product("1001").await.unwrap();
    assert_eq!(stored.name, "Samsung QE55");
    assert_eq!(stored.price, Some(dec("599.99")));
    assert_eq!(stored.category_id, Some(category.id));
    assert_eq!(
        stored.link.as_deref(),
        Some("https://shop.test/televizorji/samsung-qe55/cena/1001")
    );
    assert!(stored.image.is_some());
    assert!(store.product("1002").await.is_none());
}

#[tokio::test]
async fn repeated_listing_crawl_is_idempotent() {
    let site = listing_site();
    let store = MemoryStore::new();
    let crawler = Crawler::new(&site, &store);

    crawler.scrape_listing(LISTING).await.unwrap();
    let first_counts = store.counts().await.unwrap();
    let first_products = store.products().await;

    crawler.scrape_listing(LISTING).await.unwrap();
    assert_eq!(store.counts().await.unwrap(), first_counts);
    assert_eq!(store.products().await, first_products);
}

#[tokio::test]
async fn listing_survives_dash_price_notation() {
    let site = Site::default().page(
        LISTING,
        format!(
            "<h1>Televizorji</h1>{}{}",
            product("Samsung QE55", "/televizorji/samsung-qe55/cena/1001", "599,99 €"),
            product("Nosilec", "/televizorji/nosilec/cena/1003", "5,-"),
        ),
    );
    let store = MemoryStore::new();

    let saved = Crawler::new(&site, &store).scrape_listing(LISTING).await.unwrap();
    assert_eq!(saved, 1);
    assert!(store.product("1001").await.is_some());
    assert!(store.product("1003").await.is_none());
}

const CATEGORIES: &str = "https://shop.test/tv-prijamnici/cene/56";

#[tokio::test]
async fn category_tiles_survive_a_failing_tile_page() {
    let site = Site::default()
        .page(
            CATEGORIES,
            format!(
                "{}{}",
                tile("OLED", "/oled/cene/60"),
                tile("QLED", "/qled/cene/61")
            ),
        )
        .page(
            "https://shop.test/oled/cene/60",
            product("LG C3", "/oled/lg-c3/cena/2001", "1.299,00 €"),
        );
    let store = MemoryStore::new();

    let saved = Crawler::new(&site, &store)
        .scrape_categories(CATEGORIES)
        .await
        .unwrap();
    assert_eq!(saved, 1);

    let oled = store.category_by_url("https://shop.test/oled/cene/60").await.unwrap();
    let qled = store.category_by_url("https://shop.test/qled/cene/61").await.unwrap();
    assert_eq!(oled.name, "OLED");
    assert_eq!(qled.name, "QLED");
    assert_eq!(qled.image.as_deref(), Some("https://shop.test/img/QLED.webp"));

    let lg = store.product("2001").await.unwrap();
    assert_eq!(lg.category_id, Some(oled.id));
    assert_eq!(lg.price, Some(dec("1299.00")));
    assert_eq!(store.counts().await.unwrap().products, 1);
}

#[tokio::test]
async fn failing_root_page_fails_the_crawl() {
    let site = Site::default();
    let store = MemoryStore::new();

    let err = Crawler::new(&site, &store)
        .scrape_categories(CATEGORIES)
        .await
        .unwrap_err();
    assert!(matches!(err, CrawlError::Fetch(FetchError::Status { status: 404, .. })));
    assert_eq!(store.counts().await.unwrap().categories, 0);
}

const ROOT: &str = "https://shop.test/tv/cene/1";
const OLED: &str = "https://shop.test/oled/cene/2";
const QLED: &str = "https://shop.test/qled/cene/3";
const OLED_55: &str = "https://shop.test/oled-55/cene/4";

fn tree_site() -> Site {
    Site::default()
        .page(
            ROOT,
            category_page(
                "Televizorji",
                &product("Sony X80", "/tv/sony-x80/cena/3001", "899,00 €"),
                &["/oled/cene/2", "/qled/cene/3"],
            ),
        )
        .page(
            OLED,
            category_page(
                "OLED",
                &product("LG C3", "/oled/lg-c3/cena/3002", "1.299,00 €"),
                // Links back to the root and to a page that is gone.
                &["/tv/cene/1", "/oled-55/cene/4"],
            ),
        )
        .page(
            QLED,
            category_page(
                "QLED",
                &product("Samsung Q60", "/qled/q60/cena/3003", "649,00 €"),
                &[],
            ),
        )
}

#[tokio::test]
async fn tree_crawl_builds_hierarchy() {
    let site = tree_site();
    let store = MemoryStore::new();

    let saved = Crawler::new(&site, &store).scrape_tree(ROOT, None).await.unwrap();
    assert_eq!(saved, 3);

    let root = store.category_by_url(ROOT).await.unwrap();
    let oled = store.category_by_url(OLED).await.unwrap();
    let qled = store.category_by_url(QLED).await.unwrap();
    let oled_55 = store.category_by_url(OLED_55).await.unwrap();

    assert_eq!(root.parent_id, None);
    assert_eq!(oled.parent_id, Some(root.id));
    assert_eq!(oled.name, "OLED");
    assert_eq!(qled.parent_id, Some(root.id));
    assert_eq!(oled_55.parent_id, Some(oled.id));

    assert_eq!(store.product("3001").await.unwrap().category_id, Some(root.id));
    assert_eq!(store.product("3002").await.unwrap().category_id, Some(oled.id));
    assert_eq!(store.product("3003").await.unwrap().category_id, Some(qled.id));
}

#[tokio::test]
async fn tree_crawl_visits_each_page_once() {
    let site = tree_site();
    let store = MemoryStore::new();

    Crawler::new(&site, &store).scrape_tree(ROOT, None).await.unwrap();

    let requests = site.requests();
    assert_eq!(requests, vec![ROOT, OLED, OLED_55, QLED]);
}

#[tokio::test]
async fn tree_crawl_respects_depth_limit() {
    let site = tree_site();
    let store = MemoryStore::new();

    let saved = Crawler::new(&site, &store)
        .with_max_depth(0)
        .scrape_tree(ROOT, None)
        .await
        .unwrap();
    assert_eq!(saved, 1);
    assert_eq!(site.requests(), vec![ROOT]);

    // Subcategories are still recorded under the root.
    let root = store.category_by_url(ROOT).await.unwrap();
    let oled = store.category_by_url(OLED).await.unwrap();
    assert_eq!(oled.parent_id, Some(root.id));
    assert_eq!(oled.name, "2");
}

#[tokio::test]
async fn unsafe_links_are_never_requested() {
    let root = "http://93.184.216.34/tv/cene/1";
    let site = Site::default().page(
        root,
        category_page(
            "Televizorji",
            &product("Sony X80", "/tv/sony-x80/cena/3001", "899,00 €"),
            &["http://10.0.0.5/admin/cene/9"],
        ),
    );
    let fetcher = GuardedFetcher::new(site, UrlGuard::new());
    let store = MemoryStore::new();

    let saved = Crawler::new(&fetcher, &store).scrape_tree(root, None).await.unwrap();
    assert_eq!(saved, 1);
    assert_eq!(fetcher.inner().requests(), vec![root]);
}

#[tokio::test]
async fn unsafe_root_is_a_validation_error() {
    let fetcher = GuardedFetcher::new(Site::default(), UrlGuard::new());
    let store = MemoryStore::new();

    let err = Crawler::new(&fetcher, &store)
        .scrape_listing("http://127.0.0.1/televizorji/cene/206")
        .await
        .unwrap_err();
    assert!(matches!(err, CrawlError::Validation(_)));
    assert!(fetcher.inner().requests().is_empty());
}

#[tokio::test]
async fn repeated_tree_crawl_is_idempotent() {
    let site = tree_site();
    let store = MemoryStore::new();
    let crawler = Crawler::new(&site, &store);

    crawler.scrape_tree(ROOT, None).await.unwrap();
    let first_counts = store.counts().await.unwrap();
    let first_categories = store.categories().await;
    let first_products = store.products().await;

    crawler.scrape_tree(ROOT, None).await.unwrap();
    assert_eq!(store.counts().await.unwrap(), first_counts);
    assert_eq!(store.categories().await, first_categories);
    assert_eq!(store.products().await, first_products);
}

#[tokio::test]
async fn tree_crawl_attaches_to_existing_parent() {
    let site = tree_site();
    let store = MemoryStore::new();
    let electronics_url = "https://shop.test/elektronika/cene/100";
    let electronics = store
        .upsert_category(
            electronics_url,
            &CategoryFields::for_url(electronics_url, "Elektronika".into(), None),
        )
        .await
        .unwrap();

    Crawler::new(&site, &store)
        .scrape_tree(ROOT, Some(electronics.id))
        .await
        .unwrap();

    let root = store.category_by_url(ROOT).await.unwrap();
    let oled = store.category_by_url(OLED).await.unwrap();
    assert_eq!(root.parent_id, Some(electronics.id));
    assert_eq!(oled.parent_id, Some(root.id));
}

#[tokio::test]
async fn tree_crawl_rejects_unknown_parent() {
    let site = tree_site();
    let store = MemoryStore::new();

    let err = Crawler::new(&site, &store)
        .scrape_tree(ROOT, Some(99))
        .await
        .unwrap_err();
    assert!(matches!(err, CrawlError::Store(StoreError::MissingCategory(99))));
    assert!(site.requests().is_empty());
    assert_eq!(store.counts().await.unwrap().categories, 0);
}
