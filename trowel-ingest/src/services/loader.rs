//! Batch loader
//!
//! Writes the delta record set in fixed-size batches, one transaction per
//! batch. The first batch that fails aborts the load; batches committed
//! before it stay committed and are reported.
//!
//! A batch that hits a locked database is retried with a fresh transaction.

use crate::db;
use crate::error::{LoadError, LoadErrorKind};
use crate::models::CanonicalRecord;
use crate::services::retry::RetryPolicy;
use sqlx::SqlitePool;
use std::time::Duration;
use tracing::{debug, error, info};
use trowel_common::IngestConfig;

/// Totals of a completed load
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub rows_written: usize,
    pub batches_committed: usize,
    pub lock_retries: u32,
}

pub struct Loader {
    pool: SqlitePool,
    table: String,
    batch_size: usize,
    retry: RetryPolicy,
}

impl Loader {
    pub fn new(pool: SqlitePool, table: impl Into<String>, batch_size: usize, retry: RetryPolicy) -> Self {
        Self {
            pool,
            table: table.into(),
            batch_size: batch_size.max(1),
            retry,
        }
    }

    pub fn from_config(pool: SqlitePool, config: &IngestConfig) -> Self {
        Self::new(
            pool,
            config.database.table_name.clone(),
            config.load.batch_size,
            RetryPolicy::new(
                config.load.max_lock_retries,
                Duration::from_millis(config.load.lock_backoff_ms),
            ),
        )
    }

    /// Write `records` batch by batch, in order
    pub async fn load(&self, records: &[CanonicalRecord]) -> Result<LoadReport, LoadError> {
        let mut report = LoadReport::default();
        let total_batches = records.len().div_ceil(self.batch_size);

        info!(
            rows = records.len(),
            batches = total_batches,
            batch_size = self.batch_size,
            table = %self.table,
            "Loading records"
        );

        for (index, chunk) in records.chunks(self.batch_size).enumerate() {
            let pool = &self.pool;
            let table = self.table.as_str();
            let operation_name = format!("insert batch {}/{}", index + 1, total_batches);

            let attempt = self
                .retry
                .run(
                    &operation_name,
                    trowel_common::Error::is_lock_contention,
                    move || db::insert_batch(pool, table, chunk),
                )
                .await;
            report.lock_retries += attempt.retries();

            match attempt.result {
                Ok(_) => {
                    report.rows_written += chunk.len();
                    report.batches_committed += 1;
                    debug!(batch = index, rows = chunk.len(), "Batch committed");
                }
                Err(e) => {
                    let kind = LoadErrorKind::from(e);
                    error!(
                        batch = index,
                        rows_committed = report.rows_written,
                        code = kind.code(),
                        error = %kind,
                        "Batch failed, aborting load"
                    );
                    return Err(LoadError {
                        kind,
                        failed_batch: index,
                        rows_committed: report.rows_written,
                        batches_committed: report.batches_committed,
                        retries: report.lock_retries,
                    });
                }
            }
        }

        info!(
            rows_written = report.rows_written,
            batches = report.batches_committed,
            "Load complete"
        );
        Ok(report)
    }
}
