//! Comparisons and top movers.

use super::{finite, rows_for, QueryError};
use crate::dataset::Dataset;
use crate::domain::canonical_symbol;
use crate::metrics::pct_change;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mover {
    pub symbol: String,
    pub pct_change: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Movers {
    pub top_gainers: Vec<Mover>,
    /// Worst first.
    pub top_losers: Vec<Mover>,
}

/// Whole-history percent return of two symbols, keyed by symbol.
///
/// Comparing a symbol with itself yields a single entry.
pub fn compare(
    ds: &Dataset,
    symbol_a: &str,
    symbol_b: &str,
) -> Result<BTreeMap<String, Option<f64>>, QueryError> {
    let mut out = BTreeMap::new();
    for symbol in [symbol_a, symbol_b] {
        let rows = rows_for(ds, symbol)?;
        let first = rows[0].row.close;
        let last = rows[rows.len() - 1].row.close;
        out.insert(canonical_symbol(symbol), finite(pct_change(first, last)));
    }
    Ok(out)
}

/// Rank symbols by the percent change between their two latest closes.
///
/// Symbols with fewer than two rows, or whose change is not finite, are left
/// out. With fewer than `n` eligible symbols every eligible one is returned.
pub fn top_movers(ds: &Dataset, n: usize) -> Movers {
    let mut ranked: Vec<Mover> = ds
        .by_symbol()
        .filter_map(|(symbol, rows)| match rows {
            [.., prev, last] => finite(pct_change(prev.row.close, last.row.close)).map(|pct| Mover {
                symbol: symbol.to_string(),
                pct_change: pct,
            }),
            _ => None,
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.pct_change
            .total_cmp(&a.pct_change)
            .then_with(|| a.symbol.cmp(&b.symbol))
    });

    let top_gainers = ranked.iter().take(n).cloned().collect();
    let top_losers = ranked.iter().rev().take(n).cloned().collect();

    Movers {
        top_gainers,
        top_losers,
    }
}
