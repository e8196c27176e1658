//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod init;
mod scrape;
mod status;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{Config, DEFAULT_CATEGORY_URL, DEFAULT_LISTING_URL};
use crate::repository::{
    AsyncSqlitePool, CatalogStore, DieselCatalogStore, MemoryStore,
};

#[derive(Parser)]
#[command(name = "tvscrape")]
#[command(about = "Television catalog scraper")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database file (overrides config file)
    #[arg(long, global = true, env = "TVSCRAPE_DATABASE")]
    database: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Fetch with the plain HTTP client only
    #[arg(long, global = true)]
    no_browser: bool,

    /// Keep results in memory instead of writing the database
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database schema
    Init,

    /// Scrape the products of a single listing page
    Listing {
        /// Listing page URL
        #[arg(default_value = DEFAULT_LISTING_URL)]
        url: String,
    },

    /// Scrape every category tile of a category page and its products
    Categories {
        /// Category listing page URL
        #[arg(default_value = DEFAULT_CATEGORY_URL)]
        url: String,
    },

    /// Scrape a category and all of its subcategories recursively
    Tree {
        /// Root category URL
        #[arg(default_value = DEFAULT_CATEGORY_URL)]
        url: String,
        /// Deepest subcategory level to follow (overrides config)
        #[arg(long)]
        max_depth: Option<usize>,
        /// Existing category ID to attach the crawled tree to
        #[arg(long)]
        parent: Option<i64>,
    },

    /// Show catalog row counts
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Open the catalog store selected by the command line.
async fn open_store(config: &Config, dry_run: bool) -> anyhow::Result<Box<dyn CatalogStore>> {
    if dry_run {
        return Ok(Box::new(MemoryStore::new()));
    }
    let store = DieselCatalogStore::new(AsyncSqlitePool::from_path(&config.database_path()));
    store.init_schema().await?;
    Ok(Box::new(store))
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from_path(path).await?,
        None => Config::load().await,
    };
    if let Some(database) = &cli.database {
        config.database = Some(database.display().to_string());
    }
    if cli.no_browser {
        config.fetch.browser.enabled = false;
    }

    match cli.command {
        Commands::Init => init::cmd_init(&config).await,
        Commands::Listing { url } => {
            let store = open_store(&config, cli.dry_run).await?;
            scrape::cmd_listing(&config, store.as_ref(), &url).await
        }
        Commands::Categories { url } => {
            let store = open_store(&config, cli.dry_run).await?;
            scrape::cmd_categories(&config, store.as_ref(), &url).await
        }
        Commands::Tree {
            url,
            max_depth,
            parent,
        } => {
            if let Some(max_depth) = max_depth {
                config.crawl.max_depth = max_depth;
            }
            let store = open_store(&config, cli.dry_run).await?;
            scrape::cmd_tree(&config, store.as_ref(), &url, parent).await
        }
        Commands::Status { json } => status::cmd_status(&config, json).await,
    }
}
