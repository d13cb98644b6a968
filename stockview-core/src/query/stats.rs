//! Summary statistics.
//!
//! Two summaries exist side by side: [`summary`] covers a symbol's whole
//! history using closes only, [`summary_52w`] covers the trailing 252 rows
//! using highs and lows and adds annualized volatility.

use super::{finite, rows_for, QueryError};
use crate::dataset::Dataset;
use crate::domain::canonical_symbol;
use crate::metrics::{self, TRADING_DAYS_PER_YEAR};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub symbol: String,
    #[serde(rename = "52w_high")]
    pub high_52w: f64,
    #[serde(rename = "52w_low")]
    pub low_52w: f64,
    pub avg_close: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary52w {
    pub symbol: String,
    /// Rows in the window (at most 252).
    pub rows: usize,
    #[serde(rename = "52w_high")]
    pub high_52w: f64,
    #[serde(rename = "52w_low")]
    pub low_52w: f64,
    pub avg_close: f64,
    pub volatility: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentPerformance {
    pub symbol: String,
    pub period_days: usize,
    pub return_pct: Option<f64>,
    pub avg_volume: f64,
}

/// Highest close, lowest close and mean close over all of a symbol's rows.
pub fn summary(ds: &Dataset, symbol: &str) -> Result<Summary, QueryError> {
    let rows = rows_for(ds, symbol)?;
    let closes: Vec<f64> = rows.iter().map(|r| r.row.close).collect();

    Ok(Summary {
        symbol: canonical_symbol(symbol),
        high_52w: closes.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        low_52w: closes.iter().copied().fold(f64::INFINITY, f64::min),
        avg_close: metrics::mean(&closes).unwrap_or(f64::NAN),
    })
}

/// 52-week levels over the trailing 252 rows.
pub fn summary_52w(ds: &Dataset, symbol: &str) -> Result<Summary52w, QueryError> {
    let rows = rows_for(ds, symbol)?;
    let window = &rows[rows.len().saturating_sub(TRADING_DAYS_PER_YEAR)..];
    let closes: Vec<f64> = window.iter().map(|r| r.row.close).collect();

    Ok(Summary52w {
        symbol: canonical_symbol(symbol),
        rows: window.len(),
        high_52w: window.iter().map(|r| r.row.high).fold(f64::NEG_INFINITY, f64::max),
        low_52w: window.iter().map(|r| r.row.low).fold(f64::INFINITY, f64::min),
        avg_close: metrics::mean(&closes).unwrap_or(f64::NAN),
        volatility: metrics::annualized_volatility(&closes),
    })
}

/// Return and average volume over the last `days` rows.
pub fn recent_performance(
    ds: &Dataset,
    symbol: &str,
    days: usize,
) -> Result<RecentPerformance, QueryError> {
    let rows = rows_for(ds, symbol)?;
    let window = &rows[rows.len().saturating_sub(days.max(1))..];
    let volumes: Vec<f64> = window.iter().map(|r| r.row.volume).collect();

    // window is never empty: rows_for rejects empty symbols and days >= 1
    let first = window[0].row.close;
    let last = window[window.len() - 1].row.close;

    Ok(RecentPerformance {
        symbol: canonical_symbol(symbol),
        period_days: days,
        return_pct: finite(metrics::pct_change(first, last)),
        avg_volume: metrics::mean(&volumes).unwrap_or(0.0),
    })
}
