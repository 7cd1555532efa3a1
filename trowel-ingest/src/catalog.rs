//! Source catalog
//!
//! Static description of the logical sources pulled on every run. One source
//! is one currency in one market; the two markets are banknote (cash) and
//! wire-transfer rates, which the history API serves under market codes 1 and 2.

use serde::{Deserialize, Serialize};
use trowel_common::config::SourceEntry;
use trowel_common::IngestConfig;

/// Market code → category with its (Persian, English) labels
const CATEGORY_TABLE: [(u32, Category, &str, &str); 2] = [
    (1, Category::Bill, "اسکناس", "Bill"),
    (2, Category::WireTransfer, "حواله", "WireTransfer"),
];

const UNKNOWN_PERSIAN: &str = "نامشخص";
const UNKNOWN_ENGLISH: &str = "Unknown";

/// Built-in sources: (source id, symbol, Persian name, market code)
const ICE_SOURCES: [(u32, &str, &str, u32); 16] = [
    (14, "USD", "دلار آمریکا", 1),
    (15, "USD", "دلار آمریکا", 2),
    (18, "AED", "درهم امارات", 1),
    (19, "AED", "درهم امارات", 2),
    (26, "JPY", "ین ژاپن", 1),
    (27, "JPY", "ین ژاپن", 2),
    (34, "EUR", "یورو", 1),
    (35, "EUR", "یورو", 2),
    (38, "RUB", "روبل روسیه", 1),
    (39, "RUB", "روبل روسیه", 2),
    (42, "CNY", "یوان چین", 1),
    (43, "CNY", "یوان چین", 2),
    (50, "IQD", "دینار عراق", 1),
    (51, "IQD", "دینار عراق", 2),
    (71, "INR", "روپیه هند", 1),
    (72, "INR", "روپیه هند", 2),
];

/// Transaction category of a price series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Physical banknotes
    Bill,
    /// Electronic transfer
    WireTransfer,
    /// Code absent from the category table
    Unknown(u32),
}

impl Category {
    /// Look up a market code in the category table
    pub fn from_market(code: u32) -> Self {
        CATEGORY_TABLE
            .iter()
            .find(|(c, _, _, _)| *c == code)
            .map(|(_, category, _, _)| *category)
            .unwrap_or(Category::Unknown(code))
    }

    pub fn market_code(&self) -> u32 {
        match self {
            Category::Unknown(code) => *code,
            known => CATEGORY_TABLE
                .iter()
                .find(|(_, category, _, _)| category == known)
                .map(|(c, _, _, _)| *c)
                .unwrap_or_default(),
        }
    }

    /// Canonical label; this is the category component of the composite key
    pub fn english(&self) -> &'static str {
        self.labels().map(|(_, en)| en).unwrap_or(UNKNOWN_ENGLISH)
    }

    pub fn persian(&self) -> &'static str {
        self.labels().map(|(fa, _)| fa).unwrap_or(UNKNOWN_PERSIAN)
    }

    fn labels(&self) -> Option<(&'static str, &'static str)> {
        CATEGORY_TABLE
            .iter()
            .find(|(_, category, _, _)| category == self)
            .map(|(_, _, fa, en)| (*fa, *en))
    }
}

/// One independently paginated source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    /// Remote source id (history URL path segment)
    pub id: u32,
    /// ISO currency symbol
    pub symbol: String,
    /// Persian display name
    pub name: String,
    /// Also selects the API market the source lives under
    pub category: Category,
}

impl SourceDescriptor {
    pub fn new(id: u32, symbol: impl Into<String>, name: impl Into<String>, market: u32) -> Self {
        Self {
            id,
            symbol: symbol.into(),
            name: name.into(),
            category: Category::from_market(market),
        }
    }

    /// Short label for logs, e.g. `USD/Bill#14`
    pub fn label(&self) -> String {
        format!("{}/{}#{}", self.symbol, self.category.english(), self.id)
    }
}

impl From<&SourceEntry> for SourceDescriptor {
    fn from(entry: &SourceEntry) -> Self {
        SourceDescriptor::new(entry.id, entry.symbol.clone(), entry.name.clone(), entry.market)
    }
}

/// Ordered set of sources for one run
///
/// Catalog order is significant: when two sources produce the same
/// observation, the one listed first wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceCatalog {
    sources: Vec<SourceDescriptor>,
}

impl SourceCatalog {
    pub fn new(sources: Vec<SourceDescriptor>) -> Self {
        Self { sources }
    }

    /// The 16 ICE currency sources
    pub fn builtin() -> Self {
        Self::new(
            ICE_SOURCES
                .iter()
                .map(|(id, symbol, name, market)| SourceDescriptor::new(*id, *symbol, *name, *market))
                .collect(),
        )
    }

    /// Configured sources, or the built-in catalog when none are configured
    pub fn from_config(config: &IngestConfig) -> Self {
        if config.sources.is_empty() {
            Self::builtin()
        } else {
            Self::new(config.sources.iter().map(SourceDescriptor::from).collect())
        }
    }

    pub fn sources(&self) -> &[SourceDescriptor] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Symbol of the first source whose Persian name matches `name`
    pub fn symbol_for_name(&self, name: &str) -> Option<&str> {
        let wanted = name.trim();
        self.sources
            .iter()
            .find(|s| s.name == wanted)
            .map(|s| s.symbol.as_str())
    }
}
