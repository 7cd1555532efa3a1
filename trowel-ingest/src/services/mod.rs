//! Pipeline stages

pub mod aggregator;
pub mod deduplicator;
pub mod fetcher;
pub mod ice_client;
pub mod loader;
pub mod normalizer;
pub mod retry;
pub mod snapshot;

pub use aggregator::{aggregate, Aggregation};
pub use deduplicator::{collapse_in_run, delta, Collapsed, ExistingKeySet};
pub use fetcher::{FetchOutcome, Fetcher, HistoryClient};
pub use ice_client::IceApiClient;
pub use loader::{LoadReport, Loader};
pub use retry::{Retried, RetryPolicy};
pub use snapshot::{normalize_snapshot, parse_snapshot, SnapshotRow};
