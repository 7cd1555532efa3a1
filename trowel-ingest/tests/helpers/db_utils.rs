//! Database Test Utilities

use anyhow::Result;
use sqlx::SqlitePool;
use tempfile::TempDir;
use trowel_common::config::DatabaseConfig;
use trowel_common::IngestConfig;

/// Create a file-backed test database through the production pool setup
///
/// Returns (TempDir, DatabaseConfig, SqlitePool) - TempDir must be kept alive
/// for the duration of the test
pub async fn create_test_db() -> Result<(TempDir, DatabaseConfig, SqlitePool)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("trowel_test.db");

    let config = DatabaseConfig {
        url: format!("sqlite://{}?mode=rwc", db_path.display()),
        table_name: "IceAssets".to_string(),
        max_connections: 2,
    };
    let pool = trowel_common::db::init_pool(&config).await?;

    Ok((temp_dir, config, pool))
}

/// Configuration pointed at a mock API, with fast retries and small pages
pub fn test_config(base_url: &str, database: DatabaseConfig) -> IngestConfig {
    let mut config = IngestConfig {
        database,
        ..Default::default()
    };
    config.api.base_url = base_url.to_string();
    config.api.page_size = 10;
    config.api.timeout_secs = 5;
    config.api.max_retries = 2;
    config.api.backoff_base_ms = 1;
    config.api.concurrency = 2;
    config.load.batch_size = 7;
    config
}
