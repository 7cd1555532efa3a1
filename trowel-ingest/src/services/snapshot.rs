//! Landing-page snapshot parsing
//!
//! Alternative input to the history API: already-rendered HTML of the exchange
//! landing page. Each price card under `.pt-4` carries a date, a price and a
//! name. The three lists are zipped positionally; unmatched leftovers are
//! dropped with a warning.

use crate::catalog::{SourceCatalog, SourceDescriptor};
use crate::error::{NormalizeError, ParseError};
use crate::models::{CanonicalRecord, RawField, RawRecord};
use crate::services::normalizer;
use chrono::NaiveDateTime;
use scraper::{Html, Selector};

const DATE_SELECTOR: &str = ".pt-4 .text-light-blue";
const PRICE_SELECTOR: &str = ".pt-4 h2.text-light";
const NAME_SELECTOR: &str = ".pt-4 h4.text-light";

/// One price card as rendered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotRow {
    pub date: String,
    pub name: String,
    pub price: String,
}

fn selector(css: &str) -> Result<Selector, ParseError> {
    Selector::parse(css).map_err(|e| ParseError(format!("selector '{}': {}", css, e)))
}

fn texts(document: &Html, css: &str) -> Result<Vec<String>, ParseError> {
    let sel = selector(css)?;
    Ok(document
        .select(&sel)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .collect())
}

/// Extract the price cards of a rendered landing page
pub fn parse_snapshot(html: &str) -> Result<Vec<SnapshotRow>, ParseError> {
    let document = Html::parse_document(html);

    let dates = texts(&document, DATE_SELECTOR)?;
    let prices = texts(&document, PRICE_SELECTOR)?;
    let names = texts(&document, NAME_SELECTOR)?;

    if dates.len() != prices.len() || dates.len() != names.len() {
        tracing::warn!(
            dates = dates.len(),
            prices = prices.len(),
            names = names.len(),
            "Snapshot card fields do not line up; extra elements ignored"
        );
    }

    Ok(dates
        .into_iter()
        .zip(prices)
        .zip(names)
        .map(|((date, price), name)| SnapshotRow { date, name, price })
        .collect())
}

/// Normalize snapshot rows with the same rules as API records
///
/// The symbol comes from the catalog entry with the same local-language
/// name, falling back to the name itself. Snapshot cards carry no market, so
/// the category is `Unknown`.
pub fn normalize_snapshot(
    rows: &[SnapshotRow],
    catalog: &SourceCatalog,
    scraped_at: NaiveDateTime,
) -> (Vec<CanonicalRecord>, Vec<NormalizeError>) {
    let mut records = Vec::with_capacity(rows.len());
    let mut rejected = Vec::new();

    for row in rows {
        let name = row.name.trim();
        let symbol = catalog.symbol_for_name(name).unwrap_or(name);
        let source = SourceDescriptor::new(0, symbol, name, 0);
        let raw = RawRecord {
            date: Some(RawField::Text(row.date.clone())),
            sell_price: Some(RawField::Text(row.price.clone())),
            ..Default::default()
        };

        match normalizer::normalize(&raw, &source, scraped_at) {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::debug!(card = name, error = %e, "Rejected snapshot row");
                rejected.push(e);
            }
        }
    }

    (records, rejected)
}
