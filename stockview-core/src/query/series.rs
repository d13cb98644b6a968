//! Per-symbol time series.

use super::{finite, rows_for, QueryError};
use crate::dataset::Dataset;
use crate::domain::EnrichedRow;
use chrono::NaiveDate;
use serde::Serialize;

/// One row of a symbol's series, ready for JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
    pub daily_return: Option<f64>,
    pub ma_7: Option<f64>,
}

impl From<&EnrichedRow> for SeriesPoint {
    fn from(r: &EnrichedRow) -> Self {
        Self {
            symbol: r.row.symbol.clone(),
            date: r.row.date,
            open: finite(r.row.open),
            high: finite(r.row.high),
            low: finite(r.row.low),
            close: finite(r.row.close),
            volume: finite(r.row.volume),
            daily_return: finite(r.daily_return),
            ma_7: r.ma_7.and_then(finite),
        }
    }
}

/// The most recent `lookback` rows of a symbol, oldest first.
pub fn symbol_series(
    ds: &Dataset,
    symbol: &str,
    lookback: usize,
) -> Result<Vec<SeriesPoint>, QueryError> {
    let rows = rows_for(ds, symbol)?;
    let skip = rows.len().saturating_sub(lookback);
    Ok(rows[skip..].iter().map(SeriesPoint::from).collect())
}
