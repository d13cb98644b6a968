//! Dataset reload coordinator.
//!
//! [`DatasetHandle`] owns the currently published [`Dataset`] behind an
//! `ArcSwapOption`. Readers take an `Arc<Dataset>` snapshot without locking;
//! a reload builds a complete replacement and swaps the pointer, so a reader
//! sees either the old dataset or the new one, never a mix. A failed reload
//! leaves the published dataset untouched.

use crate::data::loader;
use crate::dataset::{Dataset, DatasetError};
use crate::metrics::enrich;
use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Load → enrich a directory of sources into a new Dataset.
pub fn build_dataset(data_dir: &Path) -> Result<Dataset, DatasetError> {
    let rows = loader::load(data_dir)?;
    Ok(enrich(rows))
}

/// Snapshot of the handle's state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Health {
    /// `"ok"` once a dataset is published, `"starting"` before.
    pub status: &'static str,
    pub rows: usize,
    pub symbols: usize,
    pub fingerprint: Option<String>,
}

#[derive(Debug, Default)]
pub struct DatasetHandle {
    current: ArcSwapOption<Dataset>,
    /// Serializes reloads so publishes land in the order they were built.
    reload_lock: Mutex<()>,
}

impl DatasetHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle with `data_dir` already loaded.
    pub fn load(data_dir: &Path) -> Result<Self, DatasetError> {
        let handle = Self::new();
        handle.reload(data_dir)?;
        Ok(handle)
    }

    /// The published dataset, or `NotReady` if none was ever published.
    pub fn current(&self) -> Result<Arc<Dataset>, DatasetError> {
        self.current.load_full().ok_or(DatasetError::NotReady)
    }

    pub fn is_ready(&self) -> bool {
        self.current.load().is_some()
    }

    /// Publish a dataset built elsewhere, replacing the current one.
    pub fn publish(&self, dataset: Dataset) -> Arc<Dataset> {
        let dataset = Arc::new(dataset);
        self.current.store(Some(Arc::clone(&dataset)));
        dataset
    }

    /// Rebuild from `data_dir` and publish on success.
    pub fn reload(&self, data_dir: &Path) -> Result<Arc<Dataset>, DatasetError> {
        let _guard = self.reload_lock.lock();

        match build_dataset(data_dir) {
            Ok(dataset) => {
                info!(
                    rows = dataset.len(),
                    symbols = dataset.symbol_count(),
                    dir = %data_dir.display(),
                    "dataset loaded"
                );
                Ok(self.publish(dataset))
            }
            Err(e) => {
                warn!(error = %e, ready = self.is_ready(), "reload failed; keeping current dataset");
                Err(e)
            }
        }
    }

    pub fn health(&self) -> Health {
        match self.current.load_full() {
            Some(ds) => Health {
                status: "ok",
                rows: ds.len(),
                symbols: ds.symbol_count(),
                fingerprint: Some(ds.fingerprint()),
            },
            None => Health {
                status: "starting",
                rows: 0,
                symbols: 0,
                fingerprint: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const ABC: &str = "Date,Open,High,Low,Close,Volume,Symbol\n\
                       2024-01-02,10,11,9,10.5,100,ABC\n\
                       2024-01-03,10.5,12,10,11,200,ABC\n";

    #[test]
    fn not_ready_before_first_publish() {
        let handle = DatasetHandle::new();
        assert!(matches!(handle.current(), Err(DatasetError::NotReady)));
        assert_eq!(handle.health().status, "starting");
    }

    #[test]
    fn reload_publishes() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("ABC.csv"), ABC).unwrap();

        let handle = DatasetHandle::load(dir.path()).unwrap();
        let ds = handle.current().unwrap();

        assert_eq!(ds.len(), 2);
        let health = handle.health();
        assert_eq!(health.status, "ok");
        assert_eq!(health.rows, 2);
        assert_eq!(health.symbols, 1);
        assert!(health.fingerprint.is_some());
    }

    #[test]
    fn failed_reload_keeps_previous_dataset() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("ABC.csv"), ABC).unwrap();
        let handle = DatasetHandle::load(dir.path()).unwrap();

        fs::remove_file(dir.path().join("ABC.csv")).unwrap();
        let err = handle.reload(dir.path()).unwrap_err();

        assert!(matches!(err, DatasetError::NoValidData { .. }));
        assert_eq!(handle.current().unwrap().len(), 2);
    }

    #[test]
    fn readers_keep_their_snapshot_across_reload() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("ABC.csv"), ABC).unwrap();
        let handle = DatasetHandle::load(dir.path()).unwrap();

        let before = handle.current().unwrap();
        fs::write(
            dir.path().join("XYZ.csv"),
            "Date,Open,High,Low,Close,Volume,Symbol\n2024-01-02,1,1,1,1,1,XYZ\n",
        )
        .unwrap();
        handle.reload(dir.path()).unwrap();

        assert_eq!(before.symbol_count(), 1);
        assert_eq!(handle.current().unwrap().symbol_count(), 2);
    }
}
