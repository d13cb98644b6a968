//! Symbol sources, one CSV file per symbol.
//!
//! Layout: `{data_dir}/{SYMBOL}.csv` with header
//! `Date,Open,High,Low,Close,Volume,Symbol`.
//!
//! Writes are atomic: the file is written to `.csv.tmp` and renamed into
//! place, so the loader never reads a half-written source.

use super::normalize::{self, NormalizeError, Normalized, CANONICAL_COLUMNS};
use crate::domain::Row;
use csv::StringRecord;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("rejected source {path}: {source}")]
    Rejected {
        path: PathBuf,
        #[source]
        source: NormalizeError,
    },
}

/// Path of the source file for a symbol.
pub fn source_path(data_dir: &Path, symbol: &str) -> PathBuf {
    data_dir.join(format!("{symbol}.csv"))
}

/// All `*.csv` sources in a directory as `(file stem, path)`, sorted by file name.
pub fn list_sources(data_dir: &Path) -> Result<Vec<(String, PathBuf)>, SourceError> {
    let io_err = |source| SourceError::Io {
        path: data_dir.to_path_buf(),
        source,
    };

    let mut sources = Vec::new();
    for entry in fs::read_dir(data_dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("csv") {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            sources.push((stem.to_string(), path));
        }
    }

    sources.sort_by(|a, b| a.1.cmp(&b.1));
    Ok(sources)
}

/// Read a CSV file as a header record plus its data records.
pub fn read_table(path: &Path) -> Result<(StringRecord, Vec<StringRecord>), SourceError> {
    let csv_err = |source| SourceError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(csv_err)?;
    let headers = reader.headers().map_err(csv_err)?.clone();
    let records = reader
        .records()
        .collect::<Result<Vec<_>, _>>()
        .map_err(csv_err)?;

    Ok((headers, records))
}

/// Read and normalize one source file.
pub fn read_source(path: &Path) -> Result<Normalized, SourceError> {
    let (headers, records) = read_table(path)?;
    normalize::normalize(&headers, &records).map_err(|source| SourceError::Rejected {
        path: path.to_path_buf(),
        source,
    })
}

/// Write rows to a source file in canonical form, atomically.
pub fn write_source(path: &Path, rows: &[Row]) -> Result<(), SourceError> {
    let tmp_path = path.with_extension("csv.tmp");
    let csv_err = |source| SourceError::Csv {
        path: tmp_path.clone(),
        source,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| SourceError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    {
        let mut writer = csv::Writer::from_path(&tmp_path).map_err(csv_err)?;
        writer.write_record(CANONICAL_COLUMNS).map_err(csv_err)?;
        for row in rows {
            writer
                .write_record([
                    row.date.format("%Y-%m-%d").to_string(),
                    row.open.to_string(),
                    row.high.to_string(),
                    row.low.to_string(),
                    row.close.to_string(),
                    row.volume.to_string(),
                    row.symbol.clone(),
                ])
                .map_err(csv_err)?;
        }
        writer.flush().map_err(|source| SourceError::Io {
            path: tmp_path.clone(),
            source,
        })?;
    }

    fs::rename(&tmp_path, path).map_err(|source| {
        let _ = fs::remove_file(&tmp_path);
        SourceError::Io {
            path: path.to_path_buf(),
            source,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_rows() -> Vec<Row> {
        vec![
            Row {
                symbol: "ABC".into(),
                date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                open: 1234.5,
                high: 1300.0,
                low: 1200.0,
                close: 1250.25,
                volume: 1_000_000.0,
            },
            Row {
                symbol: "ABC".into(),
                date: NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
                open: 1250.0,
                high: 1260.0,
                low: 1240.0,
                close: 1255.0,
                volume: 900_000.0,
            },
        ]
    }

    #[test]
    fn write_then_read_preserves_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = source_path(dir.path(), "ABC");

        write_source(&path, &sample_rows()).unwrap();
        let read = read_source(&path).unwrap();

        assert_eq!(read.rows, sample_rows());
        assert_eq!(read.dropped, 0);
        assert!(!path.with_extension("csv.tmp").exists());
    }

    #[test]
    fn written_numbers_have_no_separators() {
        let dir = tempfile::tempdir().unwrap();
        let path = source_path(dir.path(), "ABC");

        write_source(&path, &sample_rows()).unwrap();
        let text = fs::read_to_string(&path).unwrap();

        assert_eq!(text.lines().next(), Some("Date,Open,High,Low,Close,Volume,Symbol"));
        assert!(text.contains("2024-01-02,1234.5,1300,1200,1250.25,1000000,ABC"));
    }

    #[test]
    fn list_sources_is_sorted_and_csv_only() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("ZZZ.csv"), "").unwrap();
        fs::write(dir.path().join("AAA.csv"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();

        let sources = list_sources(dir.path()).unwrap();
        let stems: Vec<&str> = sources.iter().map(|(s, _)| s.as_str()).collect();
        assert_eq!(stems, vec!["AAA", "ZZZ"]);
    }

    #[test]
    fn missing_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = list_sources(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, SourceError::Io { .. }));
    }
}
