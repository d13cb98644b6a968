//! The unified, sorted, enriched in-memory table.
//!
//! Rows are sorted by `(symbol, date)` with no duplicate date per symbol.
//! A per-symbol index gives each symbol's rows as a contiguous slice.
//! A Dataset is never mutated after construction; reloads build a new one.

use crate::domain::{canonical_symbol, EnrichedRow};
use std::collections::BTreeMap;
use std::ops::Range;
use std::path::PathBuf;
use thiserror::Error;

/// Errors from loading or publishing a Dataset.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("no valid OHLCV data found in {}", dir.display())]
    NoValidData { dir: PathBuf },

    #[error("dataset not loaded yet")]
    NotReady,

    #[error("cannot read data directory {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Source(#[from] crate::data::source::SourceError),
}

#[derive(Debug, Clone, Default)]
pub struct Dataset {
    rows: Vec<EnrichedRow>,
    index: BTreeMap<String, Range<usize>>,
}

impl Dataset {
    /// Build from rows already sorted by `(symbol, date)` and deduplicated.
    pub(crate) fn from_sorted(rows: Vec<EnrichedRow>) -> Self {
        let mut index: BTreeMap<String, Range<usize>> = BTreeMap::new();
        let mut start = 0;
        for i in 1..=rows.len() {
            if i == rows.len() || rows[i].row.symbol != rows[start].row.symbol {
                index.insert(rows[start].row.symbol.clone(), start..i);
                start = i;
            }
        }
        Self { rows, index }
    }

    pub fn rows(&self) -> &[EnrichedRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn symbol_count(&self) -> usize {
        self.index.len()
    }

    /// Symbols in ascending order.
    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.index.keys().map(|s| s.as_str())
    }

    /// A symbol's rows in date order. Lookup is case-insensitive.
    pub fn symbol_rows(&self, symbol: &str) -> Option<&[EnrichedRow]> {
        self.index
            .get(&canonical_symbol(symbol))
            .map(|range| &self.rows[range.clone()])
    }

    /// Per-symbol row slices, symbols ascending.
    pub fn by_symbol(&self) -> impl Iterator<Item = (&str, &[EnrichedRow])> {
        self.index
            .iter()
            .map(|(sym, range)| (sym.as_str(), &self.rows[range.clone()]))
    }

    /// BLAKE3 hash over every row's symbol, date and OHLCV.
    ///
    /// Rows are in canonical order, so the hash does not depend on the order
    /// sources were read in.
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for r in &self.rows {
            let row = &r.row;
            hasher.update(row.symbol.as_bytes());
            hasher.update(row.date.to_string().as_bytes());
            hasher.update(&row.open.to_le_bytes());
            hasher.update(&row.high.to_le_bytes());
            hasher.update(&row.low.to_le_bytes());
            hasher.update(&row.close.to_le_bytes());
            hasher.update(&row.volume.to_le_bytes());
        }
        hasher.finalize().to_hex().to_string()
    }
}
