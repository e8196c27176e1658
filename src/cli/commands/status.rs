//! Status command.

use console::style;

use crate::config::Config;
use crate::repository::{AsyncSqlitePool, CatalogStore, DieselCatalogStore};

/// Show how many categories and products the catalog holds.
pub async fn cmd_status(config: &Config, json: bool) -> anyhow::Result<()> {
    let db_path = config.database_path();
    if !db_path.exists() {
        anyhow::bail!(
            "Database {} not found. Run 'tvscrape init' first.",
            db_path.display()
        );
    }

    let store = DieselCatalogStore::new(AsyncSqlitePool::from_path(&db_path));
    let counts = store.counts().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&counts)?);
        return Ok(());
    }

    println!("{}", style("Catalog").bold());
    println!("  {:<12} {}", "Database:", db_path.display());
    println!("  {:<12} {}", "Categories:", counts.categories);
    println!("  {:<12} {}", "Products:", counts.products);
    Ok(())
}
