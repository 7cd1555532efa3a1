//! End-to-end pipeline tests against a mock history API
//!
//! Each test starts its own axum server and file-backed SQLite database.

mod helpers;

use helpers::{create_test_db, history_items, test_config, MockApi};
use std::collections::HashMap;
use trowel_ingest::services::IceApiClient;
use trowel_ingest::{db, pipeline, RunStatus, SourceCatalog, SourceDescriptor};

fn two_source_catalog() -> SourceCatalog {
    SourceCatalog::new(vec![
        SourceDescriptor::new(14, "USD", "دلار آمریکا", 1),
        SourceDescriptor::new(15, "USD", "دلار آمریکا", 2),
    ])
}

#[tokio::test]
async fn test_full_run_writes_all_records() {
    let mut series = HashMap::new();
    series.insert(14, history_items(21, 580_000));
    series.insert(15, history_items(4, 590_000));
    let api = MockApi::start(series, &[]).await;
    let (_dir, database, pool) = create_test_db().await.unwrap();
    let config = test_config(&api.base_url, database);

    let client = IceApiClient::new(&config.api).unwrap();
    let result = pipeline::run_incremental(&config, &pool, client, &two_source_catalog()).await;

    assert_eq!(result.status, RunStatus::Success);
    assert_eq!(result.records_fetched, 25);
    assert_eq!(result.records_rejected, 0);
    assert_eq!(result.records_written, 25);
    // 25 rows in batches of 7
    assert_eq!(result.batches_committed, 4);
    assert_eq!(db::count_rows(&pool, "IceAssets").await.unwrap(), 25);
}

#[tokio::test]
async fn test_pagination_makes_exactly_three_requests() {
    let mut series = HashMap::new();
    // 2 × page size + 1
    series.insert(14, history_items(21, 580_000));
    let api = MockApi::start(series, &[]).await;
    let (_dir, database, pool) = create_test_db().await.unwrap();
    let config = test_config(&api.base_url, database);
    let catalog = SourceCatalog::new(vec![SourceDescriptor::new(14, "USD", "دلار آمریکا", 1)]);

    let client = IceApiClient::new(&config.api).unwrap();
    let result = pipeline::run_incremental(&config, &pool, client, &catalog).await;

    let requests = api.requests_for(14);
    assert_eq!(requests.len(), 3);
    let offsets: Vec<u64> = requests.iter().map(|r| r.offset).collect();
    assert_eq!(offsets, vec![0, 10, 20]);
    assert!(requests.iter().all(|r| r.limit == 10 && r.lang == "fa" && r.market == 1));

    assert_eq!(result.pages_requested, 3);
    assert_eq!(result.records_fetched, 21);
}

#[tokio::test]
async fn test_second_run_writes_nothing() {
    let mut series = HashMap::new();
    series.insert(14, history_items(12, 580_000));
    series.insert(15, history_items(9, 590_000));
    let api = MockApi::start(series, &[]).await;
    let (_dir, database, pool) = create_test_db().await.unwrap();
    let config = test_config(&api.base_url, database);
    let catalog = two_source_catalog();

    let first = pipeline::run_incremental(
        &config,
        &pool,
        IceApiClient::new(&config.api).unwrap(),
        &catalog,
    )
    .await;
    assert_eq!(first.records_written, 21);

    let second = pipeline::run_incremental(
        &config,
        &pool,
        IceApiClient::new(&config.api).unwrap(),
        &catalog,
    )
    .await;

    assert_eq!(second.status, RunStatus::Success);
    assert_eq!(second.records_written, 0);
    assert_eq!(second.batches_committed, 0);
    assert_eq!(second.records_deduplicated, 21);
    assert_eq!(db::count_rows(&pool, "IceAssets").await.unwrap(), 21);
}

#[tokio::test]
async fn test_failing_source_does_not_abort_run() {
    let mut series = HashMap::new();
    series.insert(14, history_items(5, 580_000));
    let api = MockApi::start(series, &[15]).await;
    let (_dir, database, pool) = create_test_db().await.unwrap();
    let config = test_config(&api.base_url, database);

    let client = IceApiClient::new(&config.api).unwrap();
    let result = pipeline::run_incremental(&config, &pool, client, &two_source_catalog()).await;

    assert_eq!(result.status, RunStatus::Partial);
    assert_eq!(result.status.exit_code(), 2);
    assert_eq!(result.records_written, 5);
    assert_eq!(result.source_failures(), 1);

    let failed = result.sources.iter().find(|s| s.source_id == 15).unwrap();
    let failure = failed.failure.as_ref().unwrap();
    assert_eq!(failure.error_code, "FETCH_ERROR");
    assert_eq!(failure.attempts, 3);
    assert_eq!(failed.retries, 2);
    // max_retries = 2 → three attempts at offset 0
    assert_eq!(api.requests_for(15).len(), 3);
    assert_eq!(result.fetch_retries, 2);
}

#[tokio::test]
async fn test_identical_keys_across_sources_keep_first() {
    let mut series = HashMap::new();
    series.insert(14, history_items(3, 580_000));
    series.insert(16, history_items(3, 999_000));
    let api = MockApi::start(series, &[]).await;
    let (_dir, database, pool) = create_test_db().await.unwrap();
    let config = test_config(&api.base_url, database);
    // Same symbol and market under two ids
    let catalog = SourceCatalog::new(vec![
        SourceDescriptor::new(14, "USD", "دلار آمریکا", 1),
        SourceDescriptor::new(16, "USD", "دلار آمریکا", 1),
    ]);

    let client = IceApiClient::new(&config.api).unwrap();
    let result = pipeline::run_incremental(&config, &pool, client, &catalog).await;

    assert_eq!(result.status, RunStatus::Success);
    assert_eq!(result.candidates, 6);
    assert_eq!(result.duplicates_in_run, 3);
    assert_eq!(result.records_written, 3);

    let prices: Vec<i64> = sqlx::query_scalar("SELECT SellPrice FROM IceAssets ORDER BY Date")
        .fetch_all(&pool)
        .await
        .unwrap();
    assert_eq!(prices, vec![580_000, 580_001, 580_002]);
}

#[tokio::test]
async fn test_stored_rows_are_normalized() {
    let mut series = HashMap::new();
    series.insert(15, history_items(1, 612_300));
    let api = MockApi::start(series, &[]).await;
    let (_dir, database, pool) = create_test_db().await.unwrap();
    let config = test_config(&api.base_url, database);
    let catalog = SourceCatalog::new(vec![SourceDescriptor::new(15, "USD", "دلار آمریکا", 2)]);

    let client = IceApiClient::new(&config.api).unwrap();
    pipeline::run_incremental(&config, &pool, client, &catalog).await;

    let row: (String, String, Option<i64>, Option<i64>, String, String) = sqlx::query_as(
        "SELECT Date, Symbol, SellPrice, BuyPrice, PersianCurrencyType, EnglishCurrencyType FROM IceAssets",
    )
    .fetch_one(&pool)
    .await
    .unwrap();

    assert_eq!(row.0, "1400-01-01");
    assert_eq!(row.1, "USD");
    assert_eq!(row.2, Some(612_300));
    // First generated item carries buy_price "null"
    assert_eq!(row.3, None);
    assert_eq!(row.4, "حواله");
    assert_eq!(row.5, "WireTransfer");
}

#[tokio::test]
async fn test_unreadable_store_fails_run() {
    let mut series = HashMap::new();
    series.insert(14, history_items(2, 580_000));
    let api = MockApi::start(series, &[]).await;
    let (_dir, database, pool) = create_test_db().await.unwrap();
    let config = test_config(&api.base_url, database);
    pool.close().await;

    let client = IceApiClient::new(&config.api).unwrap();
    let result = pipeline::run_incremental(&config, &pool, client, &two_source_catalog()).await;

    assert_eq!(result.status, RunStatus::Failed);
    assert_eq!(result.status.exit_code(), 1);
    let failure = result.load_failure.unwrap();
    assert_eq!(failure.error_code, "STORAGE_ERROR");
    assert_eq!(failure.failed_batch, None);
    assert_eq!(result.records_written, 0);
}

#[tokio::test]
async fn test_conflict_in_second_batch_keeps_first_batch() {
    let mut series = HashMap::new();
    // Three batches of 7
    series.insert(14, history_items(21, 580_000));
    let api = MockApi::start(series, &[]).await;
    let (_dir, database, pool) = create_test_db().await.unwrap();
    let config = test_config(&api.base_url, database);
    let catalog = SourceCatalog::new(vec![SourceDescriptor::new(14, "USD", "دلار آمریکا", 1)]);

    // Another writer lands the row for 1400-01-09 once batch 2 has started,
    // after this run has read the existing keys
    db::ensure_table(&pool, "IceAssets").await.unwrap();
    sqlx::query(
        r#"
        CREATE TRIGGER concurrent_writer AFTER INSERT ON IceAssets
        WHEN NEW.Date = '1400-01-08'
        BEGIN
            INSERT INTO IceAssets VALUES (
                '1400-01-09', NEW.Name, NEW.SellPrice, NEW.BuyPrice, NEW.Symbol,
                NEW.PersianCurrencyType, NEW.EnglishCurrencyType,
                NEW.PersianAssetType, NEW.EnglishAssetType,
                NEW.ScrapeDate, NEW.ScrapeTime, NEW.ScrapeTimestamp
            );
        END
        "#,
    )
    .execute(&pool)
    .await
    .unwrap();

    let client = IceApiClient::new(&config.api).unwrap();
    let result = pipeline::run_incremental(&config, &pool, client, &catalog).await;

    assert_eq!(result.status, RunStatus::Failed);
    assert_eq!(result.status.exit_code(), 1);
    assert_eq!(result.records_written, 7);
    assert_eq!(result.batches_committed, 1);

    let failure = result.load_failure.as_ref().unwrap();
    assert_eq!(failure.error_code, "KEY_CONFLICT");
    assert_eq!(failure.failed_batch, Some(1));
    assert_eq!(failure.rows_committed, 7);

    // Batch 2 rolled back together with the trigger's row; batch 3 never ran
    let stored: Vec<String> = sqlx::query_scalar("SELECT Date FROM IceAssets ORDER BY Date")
        .fetch_all(&pool)
        .await
        .unwrap();
    assert_eq!(stored.len(), 7);
    assert_eq!(stored.last().map(String::as_str), Some("1400-01-07"));
}

#[tokio::test]
async fn test_dash_buy_price_is_stored_as_null() {
    let mut items = history_items(2, 580_000);
    items[1]["buy_price"] = serde_json::json!("-");
    let mut series = HashMap::new();
    series.insert(14, items);
    let api = MockApi::start(series, &[]).await;
    let (_dir, database, pool) = create_test_db().await.unwrap();
    let config = test_config(&api.base_url, database);
    let catalog = SourceCatalog::new(vec![SourceDescriptor::new(14, "USD", "دلار آمریکا", 1)]);

    let client = IceApiClient::new(&config.api).unwrap();
    let result = pipeline::run_incremental(&config, &pool, client, &catalog).await;

    assert_eq!(result.status, RunStatus::Success);
    assert_eq!(result.records_rejected, 0);
    assert_eq!(result.records_written, 2);

    let row: (Option<i64>, Option<i64>) =
        sqlx::query_as("SELECT SellPrice, BuyPrice FROM IceAssets WHERE Date = '1400-01-02'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(row, (Some(580_001), None));
}
