//! Run orchestration
//!
//! One run: aggregate → ensure table → read existing keys → collapse in-run
//! duplicates → delta → load. The pool is owned by the caller; transactions
//! are scoped to single batches inside the loader.

use crate::catalog::SourceCatalog;
use crate::db;
use crate::models::{CanonicalRecord, LoadFailure, RunResult, SourceFailure, SourceReport};
use crate::services::{
    aggregate, collapse_in_run, delta, normalize_snapshot, parse_snapshot, Fetcher,
    HistoryClient, Loader,
};
use chrono::{Local, NaiveDateTime};
use sqlx::SqlitePool;
use tracing::{error, info, warn};
use trowel_common::IngestConfig;

/// Incremental load from the history API
pub async fn run_incremental<C: HistoryClient>(
    config: &IngestConfig,
    pool: &SqlitePool,
    client: C,
    catalog: &SourceCatalog,
) -> RunResult {
    let mut result = RunResult::start();
    let scraped_at = scrape_time();
    info!(run_id = %result.run_id, sources = catalog.len(), "Starting incremental run");

    let fetcher = Fetcher::from_config(client, &config.api);
    let aggregation = aggregate(&fetcher, catalog, scraped_at, config.api.concurrency).await;
    for report in aggregation.reports {
        result.add_source(report);
    }

    persist(config, pool, aggregation.candidates, &mut result).await;
    finish(result)
}

/// Load the price cards of a rendered landing page
pub async fn run_snapshot(
    config: &IngestConfig,
    pool: &SqlitePool,
    html: &str,
    catalog: &SourceCatalog,
) -> RunResult {
    let mut result = RunResult::start();
    let scraped_at = scrape_time();
    info!(run_id = %result.run_id, "Starting snapshot run");

    let mut report = SourceReport {
        symbol: "snapshot".to_string(),
        category: "Unknown".to_string(),
        pages: 1,
        ..Default::default()
    };

    let candidates = match parse_snapshot(html) {
        Ok(rows) => {
            let (records, rejected) = normalize_snapshot(&rows, catalog, scraped_at);
            report.records_fetched = rows.len();
            report.records_rejected = rejected.len();
            report.records_normalized = records.len();
            if !rows.is_empty() && records.is_empty() {
                report.failure = Some(SourceFailure::all_rejected(rejected.len()));
            }
            records
        }
        Err(e) => {
            error!(error = %e, "Snapshot could not be parsed");
            report.failure = Some(SourceFailure {
                error_code: "PARSE_ERROR".to_string(),
                error_message: e.to_string(),
                offset: None,
                attempts: 1,
            });
            Vec::new()
        }
    };
    result.add_source(report);

    persist(config, pool, candidates, &mut result).await;
    finish(result)
}

fn scrape_time() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Deduplicate `candidates` against the store and write the remainder
async fn persist(
    config: &IngestConfig,
    pool: &SqlitePool,
    candidates: Vec<CanonicalRecord>,
    result: &mut RunResult,
) {
    result.candidates = candidates.len();
    if candidates.is_empty() {
        info!("No candidate records; nothing to load");
        return;
    }

    let table = config.database.table_name.as_str();
    let existing = match db::ensure_table(pool, table).await {
        Ok(()) => db::load_existing_keys(pool, table).await,
        Err(e) => Err(e),
    };
    let existing = match existing {
        Ok(keys) => keys,
        Err(e) => {
            error!(error = %e, "Failed to read existing keys");
            result.load_failure = Some(LoadFailure {
                error_code: "STORAGE_ERROR".to_string(),
                error_message: e.to_string(),
                failed_batch: None,
                rows_committed: 0,
            });
            return;
        }
    };
    info!(existing_keys = existing.len(), "Existing keys loaded");

    let collapsed = collapse_in_run(candidates);
    result.duplicates_in_run = collapsed.dropped;
    if collapsed.dropped > 0 {
        warn!(dropped = collapsed.dropped, "Collapsed duplicate keys across sources");
    }

    let unique = collapsed.records.len();
    let fresh = delta(collapsed.records, &existing);
    result.records_deduplicated = unique - fresh.len();
    info!(
        new_records = fresh.len(),
        already_stored = result.records_deduplicated,
        "Computed delta"
    );

    let loader = Loader::from_config(pool.clone(), config);
    match loader.load(&fresh).await {
        Ok(report) => {
            result.records_written = report.rows_written;
            result.batches_committed = report.batches_committed;
            result.load_retries = report.lock_retries;
        }
        Err(e) => {
            result.records_written = e.rows_committed;
            result.batches_committed = e.batches_committed;
            result.load_retries = e.retries;
            result.load_failure = Some(LoadFailure {
                error_code: e.kind.code().to_string(),
                error_message: e.kind.to_string(),
                failed_batch: Some(e.failed_batch),
                rows_committed: e.rows_committed,
            });
        }
    }
}

fn finish(mut result: RunResult) -> RunResult {
    result.finish();
    info!(
        run_id = %result.run_id,
        status = ?result.status,
        fetched = result.records_fetched,
        rejected = result.records_rejected,
        duplicates_in_run = result.duplicates_in_run,
        deduplicated = result.records_deduplicated,
        written = result.records_written,
        failed_sources = result.source_failures(),
        duration_ms = result.duration_ms().unwrap_or_default(),
        "Run finished"
    );
    result
}
