//! Database initialization
//!
//! Opens the SQLite store named by the configured connection URL, creating the
//! file and its parent directory on first run.

use crate::config::DatabaseConfig;
use crate::{Error, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// SQLite busy_timeout applied to every pooled connection
const BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Open a connection pool for the configured store
///
/// WAL journaling lets the key-set read and batch writes of concurrent runs
/// interleave; writers still serialize on the database lock.
///
/// Note: in-memory URLs live only as long as the pool keeps a connection open.
pub async fn init_pool(config: &DatabaseConfig) -> Result<SqlitePool> {
    if !config.url.starts_with("sqlite:") {
        return Err(Error::Config(format!(
            "Unsupported database URL (expected sqlite:...): {}",
            crate::config::mask_credentials(&config.url)
        )));
    }

    let options = SqliteConnectOptions::from_str(&config.url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT);

    let filename = options.get_filename().to_path_buf();
    let in_memory = config.url.contains(":memory:") || config.url.contains("mode=memory");
    if !in_memory {
        if let Some(parent) = filename.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await?;

    if in_memory {
        info!("Opened in-memory database");
    } else {
        info!("Opened database: {}", filename.display());
    }

    Ok(pool)
}
