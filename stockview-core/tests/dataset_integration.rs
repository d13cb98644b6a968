//! Integration tests for load → enrich → query over real source directories.

use chrono::NaiveDate;
use std::fs;
use std::path::Path;
use stockview_core::coordinator::build_dataset;
use stockview_core::data::{load, source_path, write_source};
use stockview_core::domain::Row;
use stockview_core::query::{compare, summary_52w, symbol_series, top_movers};
use stockview_core::DatasetError;

// ── Helpers ──────────────────────────────────────────────────────────

fn rows(symbol: &str, closes: &[f64]) -> Vec<Row> {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Row {
            symbol: symbol.into(),
            date: start + chrono::Duration::days(i as i64),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1000.0,
        })
        .collect()
}

fn write(dir: &Path, symbol: &str, rows: &[Row]) {
    write_source(&source_path(dir, symbol), rows).unwrap();
}

// ── Loading ──────────────────────────────────────────────────────────

#[test]
fn source_missing_a_column_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "GOOD", &rows("GOOD", &[10.0, 11.0, 12.0]));
    fs::write(
        dir.path().join("BAD.csv"),
        "Date,Open,High,Low,Volume,Symbol\n2024-01-02,1,1,1,1,BAD\n",
    )
    .unwrap();

    let loaded = load(dir.path()).unwrap();

    assert_eq!(loaded.len(), 3);
    assert!(loaded.iter().all(|r| r.symbol == "GOOD"));
}

#[test]
fn messy_headers_and_values_are_normalized() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("ABC.csv"),
        " date ,OPEN,high,Low,close,volume,symbol\n\
         2024-01-03,\"1,000.5\",\"1,010\",990,\"1,005\",\"12,000\",abc\n\
         not-a-date,1,1,1,1,1,abc\n\
         2024-01-02,990,1000,980,995,,abc\n",
    )
    .unwrap();

    let ds = build_dataset(dir.path()).unwrap();

    assert_eq!(ds.len(), 2);
    let series = symbol_series(&ds, "ABC", 10).unwrap();
    assert_eq!(series[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
    assert_eq!(series[0].volume, Some(0.0));
    assert_eq!(series[1].close, Some(1005.0));
    assert_eq!(series[1].volume, Some(12_000.0));
}

#[test]
fn empty_directory_has_no_valid_data() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        load(dir.path()),
        Err(DatasetError::NoValidData { .. })
    ));
}

#[test]
fn missing_directory_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        load(&dir.path().join("nope")),
        Err(DatasetError::Io { .. })
    ));
}

// ── Enrichment ───────────────────────────────────────────────────────

#[test]
fn ma_7_starts_at_seventh_row() {
    let dir = tempfile::tempdir().unwrap();
    let closes: Vec<f64> = (1..=10).map(f64::from).collect();
    write(dir.path(), "ABC", &rows("ABC", &closes));

    let ds = build_dataset(dir.path()).unwrap();
    let series = symbol_series(&ds, "ABC", 365).unwrap();

    assert!(series[..6].iter().all(|p| p.ma_7.is_none()));
    assert_eq!(series[6].ma_7, Some(4.0));
    assert_eq!(series[9].ma_7, Some(7.0));
}

#[test]
fn duplicate_dates_across_sources_collapse() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "ABC", &rows("ABC", &[10.0, 11.0]));
    // A second file holding the same symbol and dates, read after ABC.csv.
    write(dir.path(), "ABC_extra", &rows("ABC", &[20.0, 21.0]));

    let ds = build_dataset(dir.path()).unwrap();
    let series = symbol_series(&ds, "ABC", 365).unwrap();

    assert_eq!(series.len(), 2);
    assert_eq!(series[0].close, Some(20.0));
    assert_eq!(series[1].close, Some(21.0));
}

// ── Queries over loaded data ─────────────────────────────────────────

#[test]
fn compare_is_independent_of_source_order() {
    let forward = tempfile::tempdir().unwrap();
    write(forward.path(), "AAA", &rows("AAA", &[100.0, 105.0, 110.0]));
    write(forward.path(), "BBB", &rows("BBB", &[50.0, 45.0, 40.0]));

    // Same data, rows written newest first and symbols swapped between files.
    let shuffled = tempfile::tempdir().unwrap();
    let mut bbb = rows("BBB", &[50.0, 45.0, 40.0]);
    bbb.reverse();
    let mut aaa = rows("AAA", &[100.0, 105.0, 110.0]);
    aaa.reverse();
    write(shuffled.path(), "AAA", &bbb);
    write(shuffled.path(), "BBB", &aaa);

    let a = build_dataset(forward.path()).unwrap();
    let b = build_dataset(shuffled.path()).unwrap();

    assert_eq!(a.fingerprint(), b.fingerprint());
    assert_eq!(
        compare(&a, "AAA", "BBB").unwrap(),
        compare(&b, "BBB", "AAA").unwrap()
    );
    let out = compare(&a, "AAA", "BBB").unwrap();
    assert!((out["AAA"].unwrap() - 10.0).abs() < 1e-9);
    assert!((out["BBB"].unwrap() + 20.0).abs() < 1e-9);
}

#[test]
fn top_movers_with_few_symbols_returns_all_eligible() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "AAA", &rows("AAA", &[100.0, 110.0]));
    write(dir.path(), "BBB", &rows("BBB", &[100.0, 90.0]));
    write(dir.path(), "CCC", &rows("CCC", &[100.0]));

    let ds = build_dataset(dir.path()).unwrap();
    let movers = top_movers(&ds, 3);

    let gainers: Vec<&str> = movers.top_gainers.iter().map(|m| m.symbol.as_str()).collect();
    let losers: Vec<&str> = movers.top_losers.iter().map(|m| m.symbol.as_str()).collect();
    assert_eq!(gainers, vec!["AAA", "BBB"]);
    assert_eq!(losers, vec!["BBB", "AAA"]);
}

#[test]
fn trailing_summary_uses_last_252_rows() {
    let dir = tempfile::tempdir().unwrap();
    let mut closes = vec![1000.0];
    closes.extend((0..300).map(|i| 100.0 + (i % 5) as f64));
    write(dir.path(), "ABC", &rows("ABC", &closes));

    let ds = build_dataset(dir.path()).unwrap();
    let s = summary_52w(&ds, "ABC").unwrap();

    assert_eq!(s.rows, 252);
    assert_eq!(s.high_52w, 105.0);
    assert_eq!(s.low_52w, 99.0);
    assert!(s.volatility.unwrap() > 0.0);
}
