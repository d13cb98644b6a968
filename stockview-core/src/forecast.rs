//! Next-value forecasting.
//!
//! The query layer only depends on the [`Forecaster`] trait so the method can
//! be swapped. [`LinearTrend`] fits ordinary least squares over
//! `(index, value)` and extrapolates one step.

/// Forecast the value following an observed sequence.
pub trait Forecaster: Send + Sync {
    /// Human-readable name of this method.
    fn name(&self) -> &str;

    /// Predict the value at index `values.len()`.
    ///
    /// Callers never pass an empty slice.
    fn predict_next(&self, values: &[f64]) -> f64;
}

/// Least-squares straight line through `(i, values[i])`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearTrend;

impl Forecaster for LinearTrend {
    fn name(&self) -> &str {
        "linear_trend"
    }

    fn predict_next(&self, values: &[f64]) -> f64 {
        let n = values.len() as f64;
        if values.is_empty() {
            return f64::NAN;
        }

        let x_mean = (n - 1.0) / 2.0;
        let y_mean = values.iter().sum::<f64>() / n;

        let (mut sxy, mut sxx) = (0.0, 0.0);
        for (i, y) in values.iter().enumerate() {
            let dx = i as f64 - x_mean;
            sxy += dx * (y - y_mean);
            sxx += dx * dx;
        }

        // A single point has no slope; the fit is the flat line through it.
        let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };
        let intercept = y_mean - slope * x_mean;
        intercept + slope * n
    }
}
