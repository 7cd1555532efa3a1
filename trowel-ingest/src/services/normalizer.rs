//! Raw record normalization
//!
//! Pure conversion of one [`RawRecord`] into a [`CanonicalRecord`]:
//! - Persian (U+06F0..U+06F9) and Arabic-Indic (U+0660..U+0669) digits → ASCII
//! - Compact `YYYYMMDD` dates → `YYYY-MM-DD` (positional, no calendar math)
//! - Prices → non-negative integers; empty, missing or `"null"` → absent
//! - Market code → category labels via the catalog table

use crate::catalog::SourceDescriptor;
use crate::error::NormalizeError;
use crate::models::{CanonicalRecord, RawField, RawRecord};
use chrono::NaiveDateTime;

/// Arabic decimal separator
const ARABIC_DECIMAL: char = '\u{066B}';

/// Map native digits to ASCII; every other character is kept as is
pub fn to_ascii_digits(input: &str) -> String {
    input.chars().map(ascii_digit_or_self).collect()
}

fn ascii_digit_or_self(c: char) -> char {
    let offset = match c {
        '\u{06F0}'..='\u{06F9}' => c as u32 - 0x06F0,
        '\u{0660}'..='\u{0669}' => c as u32 - 0x0660,
        _ => return c,
    };
    char::from_digit(offset, 10).unwrap_or(c)
}

/// ASCII digits of `input` after digit conversion; separators and text dropped
pub fn clean_number(input: &str) -> String {
    input
        .chars()
        .map(ascii_digit_or_self)
        .filter(char::is_ascii_digit)
        .collect()
}

fn is_null_text(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null")
}

/// Parse one price field
///
/// The fractional part is dropped. A field with no digits at all is absent,
/// not zero.
pub fn parse_price(
    field: Option<&RawField>,
    name: &'static str,
) -> Result<Option<i64>, NormalizeError> {
    let invalid = |value: String, reason: &str| NormalizeError::InvalidPrice {
        field: name,
        value,
        reason: reason.to_string(),
    };

    match field {
        None => Ok(None),
        Some(RawField::Number(n)) => {
            if let Some(v) = n.as_i64() {
                if v < 0 {
                    return Err(invalid(n.to_string(), "negative price"));
                }
                return Ok(Some(v));
            }
            if n.as_u64().is_some() {
                return Err(invalid(n.to_string(), "out of range"));
            }
            match n.as_f64() {
                Some(f) if f < 0.0 => Err(invalid(n.to_string(), "negative price")),
                Some(f) if f.is_finite() && f < i64::MAX as f64 => Ok(Some(f.trunc() as i64)),
                _ => Err(invalid(n.to_string(), "out of range")),
            }
        }
        Some(RawField::Text(text)) => {
            if is_null_text(text) {
                return Ok(None);
            }
            let converted = to_ascii_digits(text.trim());
            let integer_part = converted
                .split(['.', ARABIC_DECIMAL])
                .next()
                .unwrap_or_default();
            let digits = clean_number(integer_part);
            // A bare "-" is the exchange's placeholder for a missing price
            if digits.is_empty() {
                return Ok(None);
            }
            if converted.starts_with('-') {
                return Err(invalid(text.clone(), "negative price"));
            }
            digits
                .parse::<i64>()
                .map(Some)
                .map_err(|_| invalid(text.clone(), "out of range"))
        }
    }
}

/// Canonical `YYYY-MM-DD` date from a compact native-digit date
pub fn canonical_date(field: Option<&RawField>) -> Result<String, NormalizeError> {
    let raw = match field {
        None => return Err(NormalizeError::MissingDate),
        Some(f) => f.as_text(),
    };
    if is_null_text(&raw) {
        return Err(NormalizeError::MissingDate);
    }

    let invalid = |reason: String| NormalizeError::InvalidDate {
        value: raw.to_string(),
        reason,
    };

    let digits = clean_number(&raw);
    if digits.len() != 8 {
        return Err(invalid(format!("expected 8 digits, found {}", digits.len())));
    }

    let (year, rest) = digits.split_at(4);
    let (month, day) = rest.split_at(2);
    let month_num: u32 = month.parse().map_err(|_| invalid("bad month".to_string()))?;
    let day_num: u32 = day.parse().map_err(|_| invalid("bad day".to_string()))?;

    if !(1..=12).contains(&month_num) {
        return Err(invalid(format!("month {} out of range", month_num)));
    }
    // Solar Hijri: first six months have 31 days, the rest at most 30
    let max_day = if month_num <= 6 { 31 } else { 30 };
    if !(1..=max_day).contains(&day_num) {
        return Err(invalid(format!("day {} out of range for month {}", day_num, month_num)));
    }

    Ok(format!("{}-{}-{}", year, month, day))
}

/// Normalize one raw record of `source`
pub fn normalize(
    raw: &RawRecord,
    source: &SourceDescriptor,
    scraped_at: NaiveDateTime,
) -> Result<CanonicalRecord, NormalizeError> {
    let date = canonical_date(raw.date.as_ref())?;
    let sell_price = parse_price(raw.sell_price.as_ref(), "sell_price")?;
    let buy_price = parse_price(raw.buy_price.as_ref(), "buy_price")?;

    Ok(CanonicalRecord {
        date,
        name: source.name.clone(),
        symbol: source.symbol.clone(),
        sell_price,
        buy_price,
        category: source.category,
        scraped_at,
    })
}
