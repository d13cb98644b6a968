//! One trading day for one symbol.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Canonical daily OHLCV record.
///
/// Rows only exist after normalization, so `date` and the OHLC prices are
/// always present. A missing volume is stored as `0.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Row {
    /// Intraday return: `(close - open) / open`.
    ///
    /// Non-finite when `open` is zero.
    pub fn daily_return(&self) -> f64 {
        (self.close - self.open) / self.open
    }
}

/// A row plus the derived per-row metrics held by a [`Dataset`].
///
/// [`Dataset`]: crate::dataset::Dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRow {
    #[serde(flatten)]
    pub row: Row,
    pub daily_return: f64,
    /// Trailing 7-row mean of close; `None` for a symbol's first six rows.
    pub ma_7: Option<f64>,
}
