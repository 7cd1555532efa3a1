//! Canonical records and the composite key

use crate::catalog::Category;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const ASSET_TYPE_PERSIAN: &str = "ارز";
pub const ASSET_TYPE_ENGLISH: &str = "Currency";

/// Normalized observation, ready for comparison and storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    /// `YYYY-MM-DD` in the source calendar
    pub date: String,
    /// Local-language display name
    pub name: String,
    pub symbol: String,
    pub sell_price: Option<i64>,
    pub buy_price: Option<i64>,
    pub category: Category,
    /// When the run fetched this record (local time)
    pub scraped_at: NaiveDateTime,
}

impl CanonicalRecord {
    /// Identity of the observation; the only key derivation used anywhere
    pub fn key(&self) -> CompositeKey {
        CompositeKey::new(&self.date, &self.symbol, self.category.english())
    }

    pub fn persian_category(&self) -> &'static str {
        self.category.persian()
    }

    pub fn english_category(&self) -> &'static str {
        self.category.english()
    }

    pub fn scrape_date(&self) -> String {
        self.scraped_at.format("%Y-%m-%d").to_string()
    }

    pub fn scrape_time(&self) -> String {
        self.scraped_at.format("%H:%M:%S").to_string()
    }

    pub fn scrape_timestamp(&self) -> String {
        self.scraped_at.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

/// (Date, Symbol, English category label)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CompositeKey {
    pub date: String,
    pub symbol: String,
    pub category: String,
}

impl CompositeKey {
    /// Build a key from stored or freshly normalized values
    ///
    /// Surrounding whitespace is trimmed so keys read back from fixed-width
    /// columns compare equal to the ones the normalizer produces.
    pub fn new(date: &str, symbol: &str, category: &str) -> Self {
        Self {
            date: date.trim().to_string(),
            symbol: symbol.trim().to_string(),
            category: category.trim().to_string(),
        }
    }
}

impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.date, self.symbol, self.category)
    }
}
