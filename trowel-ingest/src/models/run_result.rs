//! Run outcome reporting
//!
//! One [`RunResult`] is produced per run. It is printed as JSON by the CLI and
//! carries every counter a partially failed run needs to be diagnosed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Overall run outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunStatus {
    /// Every source fetched and every batch committed
    Success,
    /// Loading succeeded but at least one source failed
    Partial,
    /// A batch failed or the store could not be read
    Failed,
}

impl RunStatus {
    /// Process exit code for this status
    pub fn exit_code(&self) -> u8 {
        match self {
            RunStatus::Success => 0,
            RunStatus::Partial => 2,
            RunStatus::Failed => 1,
        }
    }
}

/// Per-source summary
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceReport {
    pub source_id: u32,
    pub symbol: String,
    pub category: String,
    pub pages: u32,
    pub retries: u32,
    /// Raw items received
    pub records_fetched: usize,
    /// Items rejected by parsing or normalization
    pub records_rejected: usize,
    /// Canonical records contributed to the candidate set
    pub records_normalized: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<SourceFailure>,
}

impl SourceReport {
    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }
}

/// Why a source contributed nothing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFailure {
    /// "FETCH_ERROR" or "ALL_REJECTED"
    pub error_code: String,
    pub error_message: String,
    /// Offset of the page that exhausted its retries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    pub attempts: u32,
}

impl SourceFailure {
    pub fn fetch(message: String, offset: u64, attempts: u32) -> Self {
        Self {
            error_code: "FETCH_ERROR".to_string(),
            error_message: message,
            offset: Some(offset),
            attempts,
        }
    }

    pub fn all_rejected(rejected: usize) -> Self {
        Self {
            error_code: "ALL_REJECTED".to_string(),
            error_message: format!("all {} fetched record(s) were rejected", rejected),
            offset: None,
            attempts: 0,
        }
    }
}

/// Run-level load failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadFailure {
    /// "KEY_CONFLICT" or "STORAGE_ERROR"
    pub error_code: String,
    pub error_message: String,
    /// Zero-based batch index; absent when the failure happened before loading
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_batch: Option<usize>,
    pub rows_committed: usize,
}

/// Complete outcome of one ingestion run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub status: RunStatus,

    pub pages_requested: u32,
    pub fetch_retries: u32,
    pub records_fetched: usize,
    pub records_rejected: usize,
    /// Canonical records produced by all sources together
    pub candidates: usize,
    /// Candidates dropped because an earlier source produced the same key
    pub duplicates_in_run: usize,
    /// Candidates dropped because the store already holds the key
    pub records_deduplicated: usize,
    pub records_written: usize,
    pub batches_committed: usize,
    pub load_retries: u32,

    pub sources: Vec<SourceReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_failure: Option<LoadFailure>,
}

impl RunResult {
    /// Start a new run, stamped now
    pub fn start() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            status: RunStatus::Success,
            pages_requested: 0,
            fetch_retries: 0,
            records_fetched: 0,
            records_rejected: 0,
            candidates: 0,
            duplicates_in_run: 0,
            records_deduplicated: 0,
            records_written: 0,
            batches_committed: 0,
            load_retries: 0,
            sources: Vec::new(),
            load_failure: None,
        }
    }

    /// Fold one source report into the run totals
    pub fn add_source(&mut self, report: SourceReport) {
        self.pages_requested += report.pages;
        self.fetch_retries += report.retries;
        self.records_fetched += report.records_fetched;
        self.records_rejected += report.records_rejected;
        self.sources.push(report);
    }

    pub fn source_failures(&self) -> usize {
        self.sources.iter().filter(|s| !s.succeeded()).count()
    }

    /// Stamp the finish time and settle the status
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
        self.status = if self.load_failure.is_some() {
            RunStatus::Failed
        } else if self.source_failures() > 0 {
            RunStatus::Partial
        } else {
            RunStatus::Success
        };
    }

    pub fn duration_ms(&self) -> Option<i64> {
        self.finished_at
            .map(|end| (end - self.started_at).num_milliseconds())
    }
}
