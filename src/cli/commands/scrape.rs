//! Scrape commands: listing, categories and tree.

use console::style;

use crate::config::Config;
use crate::repository::CatalogStore;
use crate::scrapers::{build_fetcher, Crawler, HtmlFetcher};

async fn print_summary(store: &dyn CatalogStore, saved: usize) -> anyhow::Result<()> {
    let counts = store.counts().await?;
    println!(
        "{} Saved {} products ({} categories, {} products in catalog)",
        style("✓").green(),
        saved,
        counts.categories,
        counts.products
    );
    Ok(())
}

/// Scrape a single product listing page.
pub async fn cmd_listing(config: &Config, store: &dyn CatalogStore, url: &str) -> anyhow::Result<()> {
    let fetcher = build_fetcher(&config.fetch);
    println!("{} Scraping listing {}", style("→").cyan(), url);

    let result = Crawler::new(fetcher.as_ref(), store).scrape_listing(url).await;
    fetcher.shutdown().await;
    print_summary(store, result?).await
}

/// Scrape the category tiles of a page and the products behind each tile.
pub async fn cmd_categories(
    config: &Config,
    store: &dyn CatalogStore,
    url: &str,
) -> anyhow::Result<()> {
    let fetcher = build_fetcher(&config.fetch);
    println!("{} Scraping categories from {}", style("→").cyan(), url);

    let result = Crawler::new(fetcher.as_ref(), store)
        .scrape_categories(url)
        .await;
    fetcher.shutdown().await;
    print_summary(store, result?).await
}

/// Scrape a category tree recursively, optionally under an existing category.
pub async fn cmd_tree(
    config: &Config,
    store: &dyn CatalogStore,
    url: &str,
    parent: Option<i64>,
) -> anyhow::Result<()> {
    let fetcher = build_fetcher(&config.fetch);
    println!(
        "{} Scraping category tree {} (max depth {})",
        style("→").cyan(),
        url,
        config.crawl.max_depth
    );

    let result = Crawler::new(fetcher.as_ref(), store)
        .with_max_depth(config.crawl.max_depth)
        .scrape_tree(url, parent)
        .await;
    fetcher.shutdown().await;
    print_summary(store, result?).await
}
