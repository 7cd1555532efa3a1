//! Paginated history fetcher
//!
//! Retrieves the complete record set of one source. Pages are requested
//! sequentially in offset order; each page request is bounded by a timeout and
//! retried on transient failures. A page that still fails after the retry
//! budget fails the whole source.

use crate::catalog::SourceDescriptor;
use crate::error::{FetchError, PageError, ParseError};
use crate::models::{HistoryPage, RawRecord};
use crate::services::retry::RetryPolicy;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info};
use trowel_common::config::ApiConfig;

/// Transport for one page of a source's history
#[async_trait]
pub trait HistoryClient: Send + Sync {
    async fn fetch_page(
        &self,
        source: &SourceDescriptor,
        offset: u64,
        limit: u64,
    ) -> Result<HistoryPage, PageError>;
}

/// Everything one source produced
#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub records: Vec<RawRecord>,
    /// Items that were not history records; skipped
    pub parse_errors: Vec<ParseError>,
    /// Pages fetched successfully
    pub pages: u32,
    /// Retries spent across all pages
    pub retries: u32,
}

impl FetchOutcome {
    /// Raw items received, parsed or not
    pub fn items_received(&self) -> usize {
        self.records.len() + self.parse_errors.len()
    }
}

pub struct Fetcher<C> {
    client: C,
    page_size: u64,
    request_timeout: Duration,
    retry: RetryPolicy,
}

impl<C: HistoryClient> Fetcher<C> {
    pub fn new(client: C, page_size: u64, request_timeout: Duration, retry: RetryPolicy) -> Self {
        Self {
            client,
            page_size: page_size.max(1),
            request_timeout,
            retry,
        }
    }

    pub fn from_config(client: C, config: &ApiConfig) -> Self {
        Self::new(
            client,
            config.page_size,
            config.timeout(),
            RetryPolicy::new(config.max_retries, config.backoff_base()),
        )
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    /// Fetch every page of `source`
    ///
    /// Stops on an empty page, a short page, or once `offset` reaches the
    /// reported total count.
    pub async fn fetch(&self, source: &SourceDescriptor) -> Result<FetchOutcome, FetchError> {
        let label = source.label();
        let mut outcome = FetchOutcome::default();
        let mut offset = 0u64;

        info!(source_id = source.id, source = %label, "Fetching source history");

        loop {
            let attempt = self.fetch_page_with_retry(source, &label, offset).await;
            outcome.retries += attempt.retries();

            let page = match attempt.result {
                Ok(page) => page,
                Err(cause) => {
                    return Err(FetchError {
                        source_id: source.id,
                        offset,
                        attempts: attempt.attempts,
                        pages: outcome.pages,
                        retries: outcome.retries,
                        cause,
                    });
                }
            };
            outcome.pages += 1;

            let total = page.count;
            let items = page.into_items();
            let received = items.len() as u64;

            for item in items {
                match RawRecord::from_value(item) {
                    Ok(record) => outcome.records.push(record),
                    Err(e) => {
                        debug!(source_id = source.id, offset, error = %e, "Skipping malformed item");
                        outcome.parse_errors.push(e);
                    }
                }
            }

            debug!(source_id = source.id, offset, received, "Page fetched");

            if received == 0 || received < self.page_size {
                break;
            }
            offset += self.page_size;
            if total.is_some_and(|count| offset >= count) {
                break;
            }
        }

        info!(
            source_id = source.id,
            source = %label,
            pages = outcome.pages,
            records = outcome.records.len(),
            malformed = outcome.parse_errors.len(),
            retries = outcome.retries,
            "Source fetch complete"
        );

        Ok(outcome)
    }

    async fn fetch_page_with_retry(
        &self,
        source: &SourceDescriptor,
        label: &str,
        offset: u64,
    ) -> crate::services::retry::Retried<HistoryPage, PageError> {
        let client = &self.client;
        let limit = self.page_size;
        let timeout = self.request_timeout;
        let operation_name = format!("fetch {} offset {}", label, offset);

        self.retry
            .run(&operation_name, PageError::is_transient, move || async move {
                match tokio::time::timeout(timeout, client.fetch_page(source, offset, limit)).await {
                    Ok(result) => result,
                    Err(_) => Err(PageError::Timeout(timeout)),
                }
            })
            .await
    }
}
