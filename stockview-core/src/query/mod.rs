//! Query engine: read-only projections over a [`Dataset`].
//!
//! Every operation takes the dataset by reference and never mutates it.
//! Symbols are matched case-insensitively; an unknown symbol is
//! [`QueryError::SymbolNotFound`]. Results are serde-serializable, with NaN
//! and infinities surfaced as `null`.

pub mod movers;
pub mod predict;
pub mod series;
pub mod stats;

use crate::dataset::Dataset;
use crate::domain::{canonical_symbol, EnrichedRow};
use thiserror::Error;

pub use movers::{compare, top_movers, Mover, Movers};
pub use predict::{predict_next, Prediction};
pub use series::{symbol_series, SeriesPoint};
pub use stats::{recent_performance, summary, summary_52w, RecentPerformance, Summary, Summary52w};

/// Default number of most recent rows returned by [`symbol_series`].
pub const DEFAULT_LOOKBACK: usize = 365;

/// Default number of gainers and losers returned by [`top_movers`].
pub const DEFAULT_MOVERS: usize = 3;

/// Default number of closes fed to the forecaster.
pub const DEFAULT_PREDICT_WINDOW: usize = 30;

/// Default period of [`recent_performance`].
pub const DEFAULT_PERFORMANCE_DAYS: usize = 30;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },
}

/// Symbols present in the dataset, ascending.
pub fn list_symbols(ds: &Dataset) -> Vec<String> {
    ds.symbols().map(str::to_string).collect()
}

/// A symbol's rows in date order, or `SymbolNotFound`.
pub(crate) fn rows_for<'a>(ds: &'a Dataset, symbol: &str) -> Result<&'a [EnrichedRow], QueryError> {
    ds.symbol_rows(symbol)
        .filter(|rows| !rows.is_empty())
        .ok_or_else(|| QueryError::SymbolNotFound {
            symbol: canonical_symbol(symbol),
        })
}

/// `Some(v)` for finite `v`, `None` for NaN and infinities.
pub fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::dataset::Dataset;
    use crate::domain::Row;
    use crate::metrics::enrich;
    use chrono::{Duration, NaiveDate};

    /// Rows for `symbol` on consecutive days from 2024-01-01, one per close.
    pub fn rows(symbol: &str, closes: &[f64]) -> Vec<Row> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Row {
                symbol: symbol.into(),
                date: start + Duration::days(i as i64),
                open: close,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1000.0 * (i + 1) as f64,
            })
            .collect()
    }

    pub fn dataset(series: &[(&str, &[f64])]) -> Dataset {
        enrich(series.iter().flat_map(|(s, c)| rows(s, c)).collect())
    }
}
