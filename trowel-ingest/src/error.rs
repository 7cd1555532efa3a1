//! Error types for trowel-ingest
//!
//! Errors are scoped to the level they affect:
//! - Record level: [`ParseError`], [`NormalizeError`] (record skipped, counted)
//! - Page level: [`PageError`] (retried when transient)
//! - Source level: [`FetchError`] (source isolated, run continues)
//! - Run level: [`LoadError`] (remaining batches aborted)

use std::time::Duration;
use thiserror::Error;

/// Failure of a single page request
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PageError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response body: {0}")]
    Malformed(String),

    #[error("transport error: {0}")]
    Transport(String),
}

impl PageError {
    /// Transient failures are worth another attempt; everything else fails fast
    pub fn is_transient(&self) -> bool {
        match self {
            PageError::Timeout(_) | PageError::Connect(_) | PageError::Transport(_) => true,
            PageError::Status { status, .. } => *status >= 500 || *status == 429,
            PageError::Malformed(_) => false,
        }
    }
}

/// A source whose page request failed for good
#[derive(Debug, Clone, Error)]
#[error("source {source_id}: page at offset {offset} failed after {attempts} attempt(s): {cause}")]
pub struct FetchError {
    pub source_id: u32,
    /// Offset of the page that could not be fetched
    pub offset: u64,
    /// Attempts made for that page
    pub attempts: u32,
    /// Pages fetched successfully before the failure
    pub pages: u32,
    /// Retries spent across the whole source
    pub retries: u32,
    #[source]
    pub cause: PageError,
}

/// Raw item that does not have the shape of a history record
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("malformed record: {0}")]
pub struct ParseError(pub String);

/// Raw record whose values cannot be normalized
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("missing date")]
    MissingDate,

    #[error("invalid date '{value}': {reason}")]
    InvalidDate { value: String, reason: String },

    #[error("invalid {field} '{value}': {reason}")]
    InvalidPrice {
        field: &'static str,
        value: String,
        reason: String,
    },
}

/// Why a batch could not be written
#[derive(Debug, Error)]
pub enum LoadErrorKind {
    /// A row's composite key already exists: concurrent writer or stale key read
    #[error("key conflict: {0}")]
    KeyConflict(String),

    #[error("storage error: {0}")]
    Storage(trowel_common::Error),
}

impl LoadErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            LoadErrorKind::KeyConflict(_) => "KEY_CONFLICT",
            LoadErrorKind::Storage(_) => "STORAGE_ERROR",
        }
    }
}

impl From<trowel_common::Error> for LoadErrorKind {
    fn from(err: trowel_common::Error) -> Self {
        if let trowel_common::Error::Database(sqlx::Error::Database(db_err)) = &err {
            if db_err.is_unique_violation() || db_err.message().contains("UNIQUE constraint failed") {
                return LoadErrorKind::KeyConflict(db_err.message().to_string());
            }
        }
        LoadErrorKind::Storage(err)
    }
}

/// Batch write failure; everything before `failed_batch` is committed
#[derive(Debug, Error)]
#[error("batch {failed_batch} failed after {rows_committed} row(s) in {batches_committed} batch(es) committed: {kind}")]
pub struct LoadError {
    pub kind: LoadErrorKind,
    /// Zero-based index of the batch that rolled back
    pub failed_batch: usize,
    pub rows_committed: usize,
    pub batches_committed: usize,
    /// Lock-contention retries spent before the failure
    pub retries: u32,
}

impl LoadError {
    pub fn is_key_conflict(&self) -> bool {
        matches!(self.kind, LoadErrorKind::KeyConflict(_))
    }
}
