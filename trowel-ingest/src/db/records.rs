//! Currency history table operations

use crate::models::{CanonicalRecord, CompositeKey};
use crate::services::deduplicator::ExistingKeySet;
use sqlx::{Row, SqlitePool};
use trowel_common::config::is_valid_identifier;
use trowel_common::{Error, Result};

fn checked_table(table: &str) -> Result<&str> {
    if is_valid_identifier(table) {
        Ok(table)
    } else {
        Err(Error::InvalidInput(format!("Invalid table name: {}", table)))
    }
}

/// Create the history table if it does not exist
///
/// An existing table is used as is; its columns are never altered.
pub async fn ensure_table(pool: &SqlitePool, table: &str) -> Result<()> {
    let table = checked_table(table)?;
    let sql = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table} (
            Date CHAR(10) NOT NULL,
            Name TEXT NOT NULL,
            SellPrice INTEGER,
            BuyPrice INTEGER,
            Symbol TEXT NOT NULL,
            PersianCurrencyType TEXT NOT NULL,
            EnglishCurrencyType TEXT NOT NULL,
            PersianAssetType TEXT NOT NULL,
            EnglishAssetType TEXT NOT NULL,
            ScrapeDate CHAR(10) NOT NULL,
            ScrapeTime CHAR(8) NOT NULL,
            ScrapeTimestamp TEXT NOT NULL,
            PRIMARY KEY (Date, Symbol, EnglishCurrencyType)
        )
        "#
    );
    sqlx::query(&sql).execute(pool).await?;
    Ok(())
}

/// Read every composite key in the table
///
/// The full result set is materialized before returning.
pub async fn load_existing_keys(pool: &SqlitePool, table: &str) -> Result<ExistingKeySet> {
    let table = checked_table(table)?;
    let sql = format!("SELECT Date, Symbol, EnglishCurrencyType FROM {table}");
    let rows = sqlx::query(&sql).fetch_all(pool).await?;

    let mut keys = std::collections::HashSet::with_capacity(rows.len());
    for row in rows {
        let date: String = row.try_get("Date")?;
        let symbol: String = row.try_get("Symbol")?;
        let category: String = row.try_get("EnglishCurrencyType")?;
        keys.insert(CompositeKey::new(&date, &symbol, &category));
    }

    Ok(ExistingKeySet::new(keys))
}

/// Insert `records` in one transaction
///
/// Plain INSERT: a key that already exists fails the whole batch, and the
/// transaction rolls back when dropped uncommitted.
pub async fn insert_batch(
    pool: &SqlitePool,
    table: &str,
    records: &[CanonicalRecord],
) -> Result<u64> {
    let table = checked_table(table)?;
    let sql = format!(
        r#"
        INSERT INTO {table} (
            Date, Name, SellPrice, BuyPrice, Symbol,
            PersianCurrencyType, EnglishCurrencyType,
            PersianAssetType, EnglishAssetType,
            ScrapeDate, ScrapeTime, ScrapeTimestamp
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#
    );

    let mut tx = pool.begin().await?;
    let mut written = 0u64;

    for record in records {
        let key = record.key();
        let result = sqlx::query(&sql)
            .bind(&key.date)
            .bind(&record.name)
            .bind(record.sell_price)
            .bind(record.buy_price)
            .bind(&key.symbol)
            .bind(record.persian_category())
            .bind(&key.category)
            .bind(crate::models::record::ASSET_TYPE_PERSIAN)
            .bind(crate::models::record::ASSET_TYPE_ENGLISH)
            .bind(record.scrape_date())
            .bind(record.scrape_time())
            .bind(record.scrape_timestamp())
            .execute(&mut *tx)
            .await?;
        written += result.rows_affected();
    }

    tx.commit().await?;
    Ok(written)
}

pub async fn count_rows(pool: &SqlitePool, table: &str) -> Result<i64> {
    let table = checked_table(table)?;
    let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await?;
    Ok(count)
}
