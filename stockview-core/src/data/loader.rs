//! Dataset loader: every symbol source in a directory, normalized and
//! concatenated.
//!
//! The loader neither sorts nor enriches; [`crate::metrics::enrich`] does that.

use super::source::{self, SourceError};
use crate::dataset::DatasetError;
use crate::domain::Row;
use rayon::prelude::*;
use std::path::Path;
use tracing::{debug, warn};

/// Load and normalize all `*.csv` sources under `data_dir`.
///
/// Sources that cannot be read or are missing a required column are skipped.
/// Fails with [`DatasetError::NoValidData`] when no source yields a row.
pub fn load(data_dir: &Path) -> Result<Vec<Row>, DatasetError> {
    let sources = source::list_sources(data_dir).map_err(|e| match e {
        SourceError::Io { path, source } => DatasetError::Io { path, source },
        other => DatasetError::Source(other),
    })?;

    // par_iter().map().collect() keeps file-name order.
    let per_source: Vec<Vec<Row>> = sources
        .par_iter()
        .map(|(name, path)| match source::read_source(path) {
            Ok(normalized) => {
                debug!(
                    source = %name,
                    read = normalized.read,
                    dropped = normalized.dropped,
                    "normalized source"
                );
                normalized.rows
            }
            Err(e) => {
                warn!(source = %name, error = %e, "skipping source");
                Vec::new()
            }
        })
        .collect();

    let rows: Vec<Row> = per_source.into_iter().flatten().collect();
    if rows.is_empty() {
        return Err(DatasetError::NoValidData {
            dir: data_dir.to_path_buf(),
        });
    }

    Ok(rows)
}
