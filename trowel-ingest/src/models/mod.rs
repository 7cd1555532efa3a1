//! Data model for the ingestion pipeline

pub mod raw;
pub mod record;
pub mod run_result;

pub use raw::{HistoryPage, RawField, RawRecord};
pub use record::{CanonicalRecord, CompositeKey};
pub use run_result::{LoadFailure, RunResult, RunStatus, SourceFailure, SourceReport};
