//! Metrics enricher and the rolling/statistical helpers the queries share.

use crate::dataset::Dataset;
use crate::domain::{EnrichedRow, Row};

/// Window of the `ma_7` moving average.
pub const MA_WINDOW: usize = 7;

/// Trading days in a year, used to annualize volatility and size the
/// trailing 52-week window.
pub const TRADING_DAYS_PER_YEAR: usize = 252;

/// Sort, deduplicate and annotate rows into a new [`Dataset`].
///
/// Rows are ordered by `(symbol, date)`. When a symbol has several rows for
/// one date, the last one in input order wins: input order is file order
/// then row order, so that is the most recently written version.
pub fn enrich(mut rows: Vec<Row>) -> Dataset {
    // Stable sort: duplicates keep their relative input order.
    rows.sort_by(|a, b| a.symbol.cmp(&b.symbol).then(a.date.cmp(&b.date)));
    let rows = dedup_keep_last(rows);

    let mut enriched = Vec::with_capacity(rows.len());
    let mut start = 0;
    while start < rows.len() {
        let end = rows[start..]
            .iter()
            .position(|r| r.symbol != rows[start].symbol)
            .map_or(rows.len(), |offset| start + offset);

        let closes: Vec<f64> = rows[start..end].iter().map(|r| r.close).collect();
        let ma = trailing_mean(&closes, MA_WINDOW);
        for (row, ma_7) in rows[start..end].iter().zip(ma) {
            enriched.push(EnrichedRow {
                daily_return: row.daily_return(),
                ma_7,
                row: row.clone(),
            });
        }
        start = end;
    }

    Dataset::from_sorted(enriched)
}

/// Collapse runs of equal `(symbol, date)` in sorted rows, keeping the last.
fn dedup_keep_last(rows: Vec<Row>) -> Vec<Row> {
    let mut out: Vec<Row> = Vec::with_capacity(rows.len());
    for row in rows {
        match out.last_mut() {
            Some(prev) if prev.symbol == row.symbol && prev.date == row.date => *prev = row,
            _ => out.push(row),
        }
    }
    out
}

/// Trailing mean over `window` values; `None` until the window is full.
pub fn trailing_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }
    (0..values.len())
        .map(|i| {
            (i + 1 >= window).then(|| {
                let slice = &values[i + 1 - window..=i];
                slice.iter().sum::<f64>() / window as f64
            })
        })
        .collect()
}

/// Arithmetic mean; `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}

/// Percent change from `from` to `to`, e.g. `100 -> 107` is `7.0`.
pub fn pct_change(from: f64, to: f64) -> f64 {
    (to / from - 1.0) * 100.0
}

/// Annualized volatility: sample standard deviation of simple returns times
/// `sqrt(252)`.
///
/// Non-finite returns are skipped. `None` with fewer than two returns.
pub fn annualized_volatility(closes: &[f64]) -> Option<f64> {
    let returns: Vec<f64> = closes
        .windows(2)
        .map(|w| w[1] / w[0] - 1.0)
        .filter(|r| r.is_finite())
        .collect();
    if returns.len() < 2 {
        return None;
    }

    let avg = mean(&returns)?;
    let var = returns.iter().map(|r| (r - avg).powi(2)).sum::<f64>() / (returns.len() - 1) as f64;
    Some(var.sqrt() * (TRADING_DAYS_PER_YEAR as f64).sqrt())
}
