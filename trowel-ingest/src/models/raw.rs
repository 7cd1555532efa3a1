//! Raw history API payloads

use crate::error::ParseError;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// One page of the history endpoint
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct HistoryPage {
    /// Raw items; each one is parsed separately so one bad item cannot sink the page
    #[serde(default)]
    pub results: Option<Vec<serde_json::Value>>,
    /// Total number of records the source holds, when the API reports it
    #[serde(default)]
    pub count: Option<u64>,
}

impl HistoryPage {
    pub fn into_items(self) -> Vec<serde_json::Value> {
        self.results.unwrap_or_default()
    }
}

/// Scalar field that the API sends either as a string or as a number
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RawField {
    Text(String),
    Number(serde_json::Number),
}

impl RawField {
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            RawField::Text(s) => Cow::Borrowed(s.as_str()),
            RawField::Number(n) => Cow::Owned(n.to_string()),
        }
    }
}

impl From<&str> for RawField {
    fn from(s: &str) -> Self {
        RawField::Text(s.to_string())
    }
}

/// One observation as the source sends it
///
/// Dates and prices may use Persian digits and carry separators or the literal
/// `"null"`; nothing is interpreted until normalization.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RawRecord {
    #[serde(default)]
    pub date: Option<RawField>,
    #[serde(default)]
    pub sell_price: Option<RawField>,
    #[serde(default)]
    pub buy_price: Option<RawField>,
    /// Remote record id
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub slug: Option<String>,
}

impl RawRecord {
    /// Parse one item of a page's `results` list
    pub fn from_value(value: serde_json::Value) -> Result<Self, ParseError> {
        if !value.is_object() {
            return Err(ParseError(format!("expected JSON object, found {}", value)));
        }
        serde_json::from_value(value).map_err(|e| ParseError(e.to_string()))
    }
}
