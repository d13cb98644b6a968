//! Next-close forecast.

use super::{finite, rows_for, QueryError};
use crate::dataset::Dataset;
use crate::domain::canonical_symbol;
use crate::forecast::Forecaster;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub symbol: String,
    pub predicted_close: Option<f64>,
    /// Closes the forecast was fitted on.
    pub observations: usize,
    pub method: String,
}

/// Forecast the close after the last `window` observed closes.
pub fn predict_next(
    ds: &Dataset,
    symbol: &str,
    forecaster: &dyn Forecaster,
    window: usize,
) -> Result<Prediction, QueryError> {
    let rows = rows_for(ds, symbol)?;
    let tail = &rows[rows.len().saturating_sub(window.max(1))..];
    let closes: Vec<f64> = tail.iter().map(|r| r.row.close).collect();

    Ok(Prediction {
        symbol: canonical_symbol(symbol),
        predicted_close: finite(forecaster.predict_next(&closes)),
        observations: closes.len(),
        method: forecaster.name().to_string(),
    })
}
