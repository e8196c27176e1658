//! SQLite connection factory for diesel-async.
//!
//! SQLite connections are cheap to open, so a connection is established
//! per operation and wrapped in `SyncConnectionWrapper`, which moves the
//! blocking work onto tokio's blocking pool.

use std::path::Path;

use diesel::sqlite::SqliteConnection;
use diesel_async::sync_connection_wrapper::SyncConnectionWrapper;
use diesel_async::{AsyncConnection, SimpleAsyncConnection};

use super::StoreError;

/// Async SQLite connection using SyncConnectionWrapper.
pub type AsyncSqliteConnection = SyncConnectionWrapper<SqliteConnection>;

/// Per-connection settings applied right after connecting.
const CONNECTION_PRAGMAS: &str = "PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;";

#[derive(Debug, Clone)]
pub struct AsyncSqlitePool {
    database_url: String,
}

impl AsyncSqlitePool {
    pub fn new(database_url: &str) -> Self {
        let url = database_url.strip_prefix("sqlite:").unwrap_or(database_url);
        Self {
            database_url: url.to_string(),
        }
    }

    pub fn from_path(db_path: &Path) -> Self {
        Self::new(&db_path.display().to_string())
    }

    /// Open a connection with foreign keys enforced.
    pub async fn get(&self) -> Result<AsyncSqliteConnection, StoreError> {
        let mut conn = AsyncSqliteConnection::establish(&self.database_url)
            .await
            .map_err(|e| StoreError::Connection {
                url: self.database_url.clone(),
                message: e.to_string(),
            })?;
        conn.batch_execute(CONNECTION_PRAGMAS).await?;
        Ok(conn)
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }
}
