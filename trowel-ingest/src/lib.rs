//! trowel-ingest: incremental currency-history ingestion
//!
//! Pulls the price history of every catalog source from the ICE history API,
//! normalizes Persian-digit dates and prices, and appends only the
//! observations the store does not hold yet.

pub mod catalog;
pub mod db;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;

pub use catalog::{Category, SourceCatalog, SourceDescriptor};
pub use error::{FetchError, LoadError, LoadErrorKind, NormalizeError, PageError, ParseError};
pub use models::{CanonicalRecord, CompositeKey, RunResult, RunStatus};
pub use pipeline::{run_incremental, run_snapshot};
