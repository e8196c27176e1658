//! Initialize command.

use console::style;

use crate::config::Config;
use crate::repository::{AsyncSqlitePool, DieselCatalogStore};

/// Create the database file and its tables.
pub async fn cmd_init(config: &Config) -> anyhow::Result<()> {
    let db_path = config.database_path();
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let store = DieselCatalogStore::new(AsyncSqlitePool::from_path(&db_path));
    store.init_schema().await?;

    println!(
        "{} Initialized catalog database {}",
        style("✓").green(),
        db_path.display()
    );
    Ok(())
}
