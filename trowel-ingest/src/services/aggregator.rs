//! Multi-source aggregation
//!
//! Runs fetch → normalize for every catalog source over a bounded worker pool.
//! A failing source is recorded in its report and contributes nothing; it never
//! stops the other sources.

use crate::catalog::{SourceCatalog, SourceDescriptor};
use crate::models::{CanonicalRecord, SourceFailure, SourceReport};
use crate::services::fetcher::{Fetcher, HistoryClient};
use crate::services::normalizer;
use chrono::NaiveDateTime;
use futures::stream::{self, StreamExt};
use tracing::{debug, error, info, warn};

/// Candidates from every source plus one report per source, in catalog order
#[derive(Debug, Default)]
pub struct Aggregation {
    pub candidates: Vec<CanonicalRecord>,
    pub reports: Vec<SourceReport>,
}

/// Fetch and normalize every source in `catalog`
///
/// Workers finish in any order; output is reassembled in catalog order so the
/// first-seen policy downstream does not depend on scheduling.
pub async fn aggregate<C: HistoryClient>(
    fetcher: &Fetcher<C>,
    catalog: &SourceCatalog,
    scraped_at: NaiveDateTime,
    concurrency: usize,
) -> Aggregation {
    let workers = concurrency.max(1);
    info!(sources = catalog.len(), workers, "Aggregating sources");

    let mut results: Vec<(usize, Vec<CanonicalRecord>, SourceReport)> =
        stream::iter(catalog.sources().iter().enumerate())
            .map(|(index, source)| async move {
                let (records, report) = fetch_and_normalize(fetcher, source, scraped_at).await;
                (index, records, report)
            })
            .buffer_unordered(workers)
            .collect()
            .await;

    results.sort_by_key(|(index, _, _)| *index);

    let mut aggregation = Aggregation::default();
    for (_, records, report) in results {
        aggregation.candidates.extend(records);
        aggregation.reports.push(report);
    }

    let failed = aggregation.reports.iter().filter(|r| !r.succeeded()).count();
    info!(
        candidates = aggregation.candidates.len(),
        failed_sources = failed,
        "Aggregation complete"
    );

    aggregation
}

async fn fetch_and_normalize<C: HistoryClient>(
    fetcher: &Fetcher<C>,
    source: &SourceDescriptor,
    scraped_at: NaiveDateTime,
) -> (Vec<CanonicalRecord>, SourceReport) {
    let mut report = SourceReport {
        source_id: source.id,
        symbol: source.symbol.clone(),
        category: source.category.english().to_string(),
        ..Default::default()
    };

    let outcome = match fetcher.fetch(source).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(
                source_id = source.id,
                source = %source.label(),
                offset = e.offset,
                attempts = e.attempts,
                error = %e.cause,
                "Source failed"
            );
            report.pages = e.pages;
            report.retries = e.retries;
            report.failure = Some(SourceFailure::fetch(e.to_string(), e.offset, e.attempts));
            return (Vec::new(), report);
        }
    };

    report.pages = outcome.pages;
    report.retries = outcome.retries;
    report.records_fetched = outcome.items_received();
    report.records_rejected = outcome.parse_errors.len();

    let mut records = Vec::with_capacity(outcome.records.len());
    for raw in &outcome.records {
        match normalizer::normalize(raw, source, scraped_at) {
            Ok(record) => records.push(record),
            Err(e) => {
                debug!(source_id = source.id, error = %e, "Rejected record");
                report.records_rejected += 1;
            }
        }
    }
    report.records_normalized = records.len();

    if report.records_rejected > 0 {
        warn!(
            source_id = source.id,
            source = %source.label(),
            rejected = report.records_rejected,
            fetched = report.records_fetched,
            "Records rejected during normalization"
        );
    }

    if report.records_fetched > 0 && records.is_empty() {
        error!(
            source_id = source.id,
            source = %source.label(),
            "Every fetched record was rejected"
        );
        report.failure = Some(SourceFailure::all_rejected(report.records_rejected));
    }

    (records, report)
}
