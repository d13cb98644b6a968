//! Row normalizer — raw tabular records to canonical [`Row`]s.
//!
//! Column headers are trimmed and title-cased before lookup, so `" close"`,
//! `"CLOSE"` and `"Close"` all resolve to the same column. A table missing any
//! required column is rejected wholesale. Individual rows whose date or OHLC
//! prices fail to parse are dropped.

use crate::domain::Row;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::StringRecord;
use thiserror::Error;

/// Canonical column names, in on-disk order.
pub const CANONICAL_COLUMNS: [&str; 7] =
    ["Date", "Open", "High", "Low", "Close", "Volume", "Symbol"];

#[derive(Debug, Error, PartialEq)]
pub enum NormalizeError {
    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<&'static str>),
}

/// Output of a successful normalization.
#[derive(Debug, Clone, Default)]
pub struct Normalized {
    pub rows: Vec<Row>,
    /// Records read from the table, accepted or not.
    pub read: usize,
    /// Records dropped for a null date, price or symbol.
    pub dropped: usize,
}

/// Positions of the canonical columns within a header record.
#[derive(Debug, Clone, Copy)]
struct ColumnMap {
    date: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: usize,
    symbol: usize,
}

impl ColumnMap {
    fn resolve(headers: &StringRecord) -> Result<Self, NormalizeError> {
        let names: Vec<String> = headers.iter().map(title_case).collect();
        let find = |name: &str| names.iter().position(|n| n == name);

        let missing: Vec<&'static str> = CANONICAL_COLUMNS
            .iter()
            .copied()
            .filter(|c| find(c).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(NormalizeError::MissingColumns(missing));
        }

        // Every lookup succeeded above.
        let idx = |name: &str| find(name).unwrap_or_default();
        Ok(Self {
            date: idx("Date"),
            open: idx("Open"),
            high: idx("High"),
            low: idx("Low"),
            close: idx("Close"),
            volume: idx("Volume"),
            symbol: idx("Symbol"),
        })
    }
}

/// Normalize one source's records against its header row.
pub fn normalize(
    headers: &StringRecord,
    records: &[StringRecord],
) -> Result<Normalized, NormalizeError> {
    let cols = ColumnMap::resolve(headers)?;
    let mut out = Normalized {
        rows: Vec::with_capacity(records.len()),
        read: records.len(),
        dropped: 0,
    };

    for record in records {
        match normalize_record(record, &cols) {
            Some(row) => out.rows.push(row),
            None => out.dropped += 1,
        }
    }

    Ok(out)
}

fn normalize_record(record: &StringRecord, cols: &ColumnMap) -> Option<Row> {
    let field = |i: usize| record.get(i).unwrap_or("");

    let symbol = field(cols.symbol).trim().to_uppercase();
    if symbol.is_empty() {
        return None;
    }

    Some(Row {
        symbol,
        date: parse_date(field(cols.date))?,
        open: parse_number(field(cols.open))?,
        high: parse_number(field(cols.high))?,
        low: parse_number(field(cols.low))?,
        close: parse_number(field(cols.close))?,
        volume: parse_number(field(cols.volume)).unwrap_or(0.0),
    })
}

/// Title case: first letter of every alphabetic run upper,
/// the rest lower.
pub fn title_case(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut at_word_start = true;
    for ch in raw.trim().chars() {
        if ch.is_alphabetic() {
            if at_word_start {
                out.extend(ch.to_uppercase());
            } else {
                out.extend(ch.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(ch);
            at_word_start = true;
        }
    }
    out
}

/// Parse a calendar date out of a date or timestamp string.
///
/// Timestamps carrying a UTC offset keep their local calendar date, which is
/// the exchange's trading day.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%:z", "%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%z"] {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.date_naive());
        }
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    NaiveDate::parse_from_str(s, "%m/%d/%Y").ok()
}

/// Parse a price or volume, tolerating thousands separators.
///
/// Non-finite and negative values are treated as unparseable.
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
}
