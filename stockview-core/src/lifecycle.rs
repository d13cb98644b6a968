//! Symbol lifecycle: download new symbols, refresh existing sources.
//!
//! Sources are written in canonical form (`Date,Open,High,Low,Close,Volume,Symbol`,
//! sorted by date, one row per date). Neither `download` nor `refresh`
//! touches the published Dataset; `refresh_all` reloads it once at the end.

use crate::coordinator::DatasetHandle;
use crate::data::normalize::NormalizeError;
use crate::data::provider::{MarketDataProvider, ProviderError};
use crate::data::source::{self, SourceError};
use crate::dataset::DatasetError;
use crate::domain::{canonical_symbol, Row, Symbol};
use chrono::NaiveDate;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("no data returned for symbol {symbol}")]
    UnknownSymbol { symbol: String },

    #[error("invalid symbol {symbol:?}")]
    InvalidSymbol { symbol: String },

    #[error("no local source for {symbol} at {}; download it first", path.display())]
    LocalSourceMissing { symbol: String, path: PathBuf },

    #[error("local source for {symbol} is unreadable: {source}")]
    CorruptSource {
        symbol: String,
        #[source]
        source: NormalizeError,
    },

    #[error("provider failed for {symbol}: {source}")]
    Provider {
        symbol: String,
        #[source]
        source: ProviderError,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("reload failed: {0}")]
    Reload(#[from] DatasetError),
}

impl LifecycleError {
    fn from_source(symbol: &str, err: SourceError) -> Self {
        match err {
            SourceError::Io { path, source } => Self::Io { path, source },
            SourceError::Csv { path, source } => Self::Csv { path, source },
            SourceError::Rejected { source, .. } => Self::CorruptSource {
                symbol: symbol.to_string(),
                source,
            },
        }
    }
}

/// Result of a successful download.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Downloaded {
    pub symbol: Symbol,
    pub rows: usize,
    pub last_date: NaiveDate,
}

/// Result of a successful refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RefreshOutcome {
    UpToDate {
        symbol: Symbol,
    },
    Updated {
        symbol: Symbol,
        /// Dates not present in the source before.
        new_rows: usize,
        total_rows: usize,
    },
}

impl RefreshOutcome {
    pub fn symbol(&self) -> &str {
        match self {
            Self::UpToDate { symbol } | Self::Updated { symbol, .. } => symbol,
        }
    }

    pub fn is_updated(&self) -> bool {
        matches!(self, Self::Updated { .. })
    }
}

/// Result of refreshing every source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshAllReport {
    pub status: &'static str,
    pub symbols_updated: Vec<Symbol>,
    /// Per-symbol failure messages. A failure does not stop the batch.
    pub errors: BTreeMap<Symbol, String>,
}

pub struct SymbolManager {
    data_dir: PathBuf,
    provider: Arc<dyn MarketDataProvider>,
    /// One writer per source file at a time; different symbols proceed in parallel.
    locks: Mutex<HashMap<Symbol, Arc<Mutex<()>>>>,
}

impl SymbolManager {
    pub fn new(data_dir: impl Into<PathBuf>, provider: Arc<dyn MarketDataProvider>) -> Self {
        Self {
            data_dir: data_dir.into(),
            provider,
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn symbol_lock(&self, symbol: &str) -> Arc<Mutex<()>> {
        Arc::clone(self.locks.lock().entry(symbol.to_string()).or_default())
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Fetch a symbol's full history and write it as a new (or replacement) source.
    pub fn download(&self, symbol: &str) -> Result<Downloaded, LifecycleError> {
        let symbol = validated_symbol(symbol)?;
        let fetched = self
            .provider
            .fetch_full_history(&symbol)
            .map_err(|source| LifecycleError::Provider {
                symbol: symbol.clone(),
                source,
            })?;

        let rows = merge_by_date(&symbol, Vec::new(), fetched).rows;
        let Some(last_date) = rows.last().map(|r| r.date) else {
            return Err(LifecycleError::UnknownSymbol { symbol });
        };

        let path = source::source_path(&self.data_dir, &symbol);
        {
            let lock = self.symbol_lock(&symbol);
            let _guard = lock.lock();
            source::write_source(&path, &rows)
                .map_err(|e| LifecycleError::from_source(&symbol, e))?;
        }

        info!(%symbol, rows = rows.len(), %last_date, "downloaded");
        Ok(Downloaded {
            symbol,
            rows: rows.len(),
            last_date,
        })
    }

    /// Fetch rows since the source's latest date and merge them in.
    ///
    /// The latest local date is fetched again so a revised final bar
    /// replaces the stored one. When the fetch adds no date and revises no
    /// stored row the source is up to date and the file is left untouched.
    pub fn refresh(&self, symbol: &str) -> Result<RefreshOutcome, LifecycleError> {
        let symbol = validated_symbol(symbol)?;
        let path = source::source_path(&self.data_dir, &symbol);
        if !path.is_file() {
            return Err(LifecycleError::LocalSourceMissing { symbol, path });
        }

        let lock = self.symbol_lock(&symbol);
        let _guard = lock.lock();
        let existing = source::read_source(&path)
            .map_err(|e| LifecycleError::from_source(&symbol, e))?
            .rows;

        let fetched = match existing.iter().map(|r| r.date).max() {
            Some(since) => self.provider.fetch_history_since(&symbol, since),
            None => self.provider.fetch_full_history(&symbol),
        }
        .map_err(|source| LifecycleError::Provider {
            symbol: symbol.clone(),
            source,
        })?;

        let merged = merge_by_date(&symbol, existing, fetched);
        if merged.added == 0 && merged.revised == 0 {
            return Ok(RefreshOutcome::UpToDate { symbol });
        }

        source::write_source(&path, &merged.rows)
            .map_err(|e| LifecycleError::from_source(&symbol, e))?;

        info!(%symbol, new_rows = merged.added, total_rows = merged.rows.len(), "refreshed");
        Ok(RefreshOutcome::Updated {
            symbol,
            new_rows: merged.added,
            total_rows: merged.rows.len(),
        })
    }

    /// Refresh every source in the data directory, then reload `handle` once.
    ///
    /// Symbols are refreshed one after another. A symbol that fails is
    /// recorded in the report and the batch moves on.
    pub fn refresh_all(&self, handle: &DatasetHandle) -> Result<RefreshAllReport, LifecycleError> {
        let sources = source::list_sources(&self.data_dir)
            .map_err(|e| LifecycleError::from_source("*", e))?;

        let mut symbols_updated = Vec::new();
        let mut errors = BTreeMap::new();
        for (stem, _) in sources {
            let symbol = canonical_symbol(&stem);
            match self.refresh(&symbol) {
                Ok(outcome) if outcome.is_updated() => symbols_updated.push(symbol),
                Ok(_) => {}
                Err(e) => {
                    warn!(%symbol, error = %e, "refresh failed");
                    errors.insert(symbol, e.to_string());
                }
            }
        }

        handle.reload(&self.data_dir)?;
        Ok(RefreshAllReport {
            status: "refreshed",
            symbols_updated,
            errors,
        })
    }
}

/// Upper-cased symbol, rejected if it cannot name a source file.
fn validated_symbol(raw: &str) -> Result<Symbol, LifecycleError> {
    let symbol = canonical_symbol(raw);
    let ok = !symbol.is_empty()
        && symbol
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '=' | '_'))
        && !symbol.starts_with('.');
    if ok {
        Ok(symbol)
    } else {
        Err(LifecycleError::InvalidSymbol {
            symbol: raw.to_string(),
        })
    }
}

struct Merged {
    rows: Vec<Row>,
    /// Incoming dates that were not stored before.
    added: usize,
    /// Stored rows replaced by an incoming row with different values.
    revised: usize,
}

/// Union of `existing` and `incoming` keyed by date, incoming winning.
/// Every row is stamped with `symbol`; the result is date-sorted.
fn merge_by_date(symbol: &str, existing: Vec<Row>, incoming: Vec<Row>) -> Merged {
    let stamp = |mut r: Row| {
        r.symbol = symbol.to_string();
        r
    };
    let mut by_date: BTreeMap<NaiveDate, Row> =
        existing.into_iter().map(|r| (r.date, stamp(r))).collect();

    let (mut added, mut revised) = (0, 0);
    for row in incoming.into_iter().map(|r| stamp(r)) {
        match by_date.entry(row.date) {
            Entry::Vacant(slot) => {
                slot.insert(row);
                added += 1;
            }
            Entry::Occupied(mut slot) => {
                if *slot.get() != row {
                    slot.insert(row);
                    revised += 1;
                }
            }
        }
    }

    Merged {
        rows: by_date.into_values().collect(),
        added,
        revised,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::provider::MemoryProvider;
    use chrono::Datelike;
    use std::fs;

    fn row(day: u32, close: f64) -> Row {
        Row {
            symbol: "ABC".into(),
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 100.0,
        }
    }

    fn manager(dir: &Path) -> (SymbolManager, Arc<MemoryProvider>) {
        let provider = Arc::new(MemoryProvider::new());
        (SymbolManager::new(dir, provider.clone()), provider)
    }

    #[test]
    fn download_writes_sorted_deduplicated_source() {
        let dir = tempfile::tempdir().unwrap();
        let (mgr, provider) = manager(dir.path());
        provider.set_history("ABC", vec![row(3, 11.0), row(2, 10.0), row(3, 12.0)]);

        let done = mgr.download("abc").unwrap();

        assert_eq!(done.symbol, "ABC");
        assert_eq!(done.rows, 2);
        assert_eq!(done.last_date, NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());

        let stored = source::read_source(&dir.path().join("ABC.csv")).unwrap().rows;
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].close, 10.0);
        assert_eq!(stored[1].close, 12.0);
    }

    #[test]
    fn download_empty_is_unknown_symbol() {
        let dir = tempfile::tempdir().unwrap();
        let (mgr, _) = manager(dir.path());

        let err = mgr.download("NOPE").unwrap_err();

        assert!(matches!(err, LifecycleError::UnknownSymbol { ref symbol } if symbol == "NOPE"));
        assert!(!dir.path().join("NOPE.csv").exists());
    }

    #[test]
    fn download_rejects_path_like_symbols() {
        let dir = tempfile::tempdir().unwrap();
        let (mgr, provider) = manager(dir.path());

        for bad in ["", "  ", "../etc", "a/b", ".hidden"] {
            assert!(matches!(
                mgr.download(bad),
                Err(LifecycleError::InvalidSymbol { .. })
            ));
        }
        assert!(provider.calls().is_empty());
    }

    #[test]
    fn refresh_without_source_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let (mgr, _) = manager(dir.path());

        assert!(matches!(
            mgr.refresh("ABC"),
            Err(LifecycleError::LocalSourceMissing { .. })
        ));
    }

    #[test]
    fn refresh_merges_and_counts_new_dates() {
        let dir = tempfile::tempdir().unwrap();
        let (mgr, provider) = manager(dir.path());
        provider.set_history("ABC", vec![row(2, 10.0), row(3, 11.0)]);
        mgr.download("ABC").unwrap();

        provider.set_history("ABC", vec![row(2, 10.0), row(3, 11.5), row(4, 12.0), row(5, 13.0)]);
        let outcome = mgr.refresh("ABC").unwrap();

        assert_eq!(
            outcome,
            RefreshOutcome::Updated {
                symbol: "ABC".into(),
                new_rows: 2,
                total_rows: 4,
            }
        );
        // Fetched from the latest local date, inclusive.
        let stored = source::read_source(&dir.path().join("ABC.csv")).unwrap().rows;
        assert_eq!(stored[1].close, 11.5);
        assert_eq!(stored.len(), 4);
    }

    #[test]
    fn refresh_with_nothing_new_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let (mgr, provider) = manager(dir.path());
        provider.set_history("ABC", vec![row(2, 10.0), row(3, 11.0)]);
        mgr.download("ABC").unwrap();
        let path = dir.path().join("ABC.csv");
        let before = fs::read(&path).unwrap();

        provider.set_history("ABC", vec![row(2, 10.0)]);
        let outcome = mgr.refresh("ABC").unwrap();

        assert_eq!(outcome, RefreshOutcome::UpToDate { symbol: "ABC".into() });
        assert_eq!(fs::read(&path).unwrap(), before);
    }

    #[test]
    fn refresh_re_serving_stored_bars_is_up_to_date() {
        let dir = tempfile::tempdir().unwrap();
        let (mgr, provider) = manager(dir.path());
        provider.set_history("ABC", vec![row(1, 1.0), row(2, 2.0), row(3, 3.0)]);
        mgr.download("ABC").unwrap();
        let path = dir.path().join("ABC.csv");
        let before = fs::read(&path).unwrap();

        // Same history again: the provider re-serves the latest stored bar.
        let outcome = mgr.refresh("ABC").unwrap();

        assert_eq!(outcome, RefreshOutcome::UpToDate { symbol: "ABC".into() });
        assert_eq!(fs::read(&path).unwrap(), before);
    }

    #[test]
    fn refresh_with_revised_last_bar_is_updated() {
        let dir = tempfile::tempdir().unwrap();
        let (mgr, provider) = manager(dir.path());
        provider.set_history("ABC", vec![row(1, 1.0), row(2, 2.0)]);
        mgr.download("ABC").unwrap();

        provider.set_history("ABC", vec![row(1, 1.0), row(2, 2.25)]);
        let outcome = mgr.refresh("ABC").unwrap();

        assert_eq!(
            outcome,
            RefreshOutcome::Updated {
                symbol: "ABC".into(),
                new_rows: 0,
                total_rows: 2,
            }
        );
        let stored = source::read_source(&dir.path().join("ABC.csv")).unwrap().rows;
        assert_eq!(stored[1].close, 2.25);
    }

    #[test]
    fn symbols_lock_independently() {
        let dir = tempfile::tempdir().unwrap();
        let (mgr, provider) = manager(dir.path());
        let mut bbb = row(1, 5.0);
        bbb.symbol = "BBB".into();
        provider.set_history("BBB", vec![bbb]);

        // Holding AAA's lock must not block work on BBB.
        let aaa = mgr.symbol_lock("AAA");
        let _held = aaa.lock();
        mgr.download("BBB").unwrap();
        assert_eq!(mgr.refresh("BBB").unwrap(), RefreshOutcome::UpToDate { symbol: "BBB".into() });

        assert!(Arc::ptr_eq(&mgr.symbol_lock("AAA"), &aaa));
        assert!(!Arc::ptr_eq(&mgr.symbol_lock("BBB"), &aaa));
    }

    #[test]
    fn refresh_of_corrupt_source_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let (mgr, _) = manager(dir.path());
        fs::write(dir.path().join("ABC.csv"), "Date,Close\n2024-01-02,10\n").unwrap();

        assert!(matches!(
            mgr.refresh("ABC"),
            Err(LifecycleError::CorruptSource { .. })
        ));
    }

    #[test]
    fn refresh_outcome_serializes_with_status_tag() {
        let json = serde_json::to_value(RefreshOutcome::UpToDate { symbol: "ABC".into() }).unwrap();
        assert_eq!(json["status"], "up_to_date");
        assert_eq!(json["symbol"], "ABC");
    }

    #[test]
    fn merge_prefers_incoming_and_stamps_symbol() {
        let mut incoming = row(2, 99.0);
        incoming.symbol = "abc".into();

        let merged = merge_by_date("ABC", vec![row(2, 10.0), row(1, 9.0)], vec![incoming]);

        assert_eq!(merged.added, 0);
        assert_eq!(merged.revised, 1);
        assert_eq!(merged.rows.len(), 2);
        assert_eq!(merged.rows[0].date.day0(), 0);
        assert_eq!(merged.rows[1].close, 99.0);
        assert!(merged.rows.iter().all(|r| r.symbol == "ABC"));
    }

    #[test]
    fn merge_of_identical_rows_changes_nothing() {
        let merged = merge_by_date("ABC", vec![row(1, 9.0), row(2, 10.0)], vec![row(2, 10.0)]);

        assert_eq!(merged.added, 0);
        assert_eq!(merged.revised, 0);
        assert_eq!(merged.rows.len(), 2);
    }
}
