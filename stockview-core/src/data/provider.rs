//! Market data provider trait and structured error types.
//!
//! The [`MarketDataProvider`] trait abstracts over data sources (Yahoo Finance,
//! an in-memory table for tests) so the lifecycle manager can swap
//! implementations. An empty result is a valid answer, not an error: it means
//! either "nothing new" or "unknown symbol", and only the caller knows which.

use crate::domain::Row;
use chrono::NaiveDate;
use parking_lot::Mutex;
use std::collections::HashMap;
use thiserror::Error;

/// Structured error types for provider calls.
///
/// Designed to be displayable as a single descriptive message.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("HTTP {status} for {symbol}")]
    Http { status: u16, symbol: String },

    #[error("provider client error: {0}")]
    Client(String),
}

/// Source of daily OHLCV history.
///
/// Returned rows carry the requested symbol, upper-cased. Calls block and are
/// not retried; retry policy belongs to whoever calls the lifecycle manager.
pub trait MarketDataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Every available daily row for `symbol`.
    fn fetch_full_history(&self, symbol: &str) -> Result<Vec<Row>, ProviderError>;

    /// Daily rows for `symbol` dated on or after `since`.
    fn fetch_history_since(
        &self,
        symbol: &str,
        since: NaiveDate,
    ) -> Result<Vec<Row>, ProviderError>;
}

/// Provider backed by an in-memory table, for tests and offline use.
#[derive(Debug, Default)]
pub struct MemoryProvider {
    history: Mutex<HashMap<String, Vec<Row>>>,
    calls: Mutex<Vec<String>>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the history served for `symbol`.
    pub fn set_history(&self, symbol: &str, rows: Vec<Row>) {
        self.history.lock().insert(symbol.to_uppercase(), rows);
    }

    /// Symbols requested so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn rows_where(&self, symbol: &str, keep: impl Fn(&Row) -> bool) -> Vec<Row> {
        let symbol = symbol.to_uppercase();
        self.calls.lock().push(symbol.clone());
        self.history
            .lock()
            .get(&symbol)
            .map(|rows| rows.iter().filter(|r| keep(r)).cloned().collect())
            .unwrap_or_default()
    }
}

impl MarketDataProvider for MemoryProvider {
    fn name(&self) -> &str {
        "memory"
    }

    fn fetch_full_history(&self, symbol: &str) -> Result<Vec<Row>, ProviderError> {
        Ok(self.rows_where(symbol, |_| true))
    }

    fn fetch_history_since(
        &self,
        symbol: &str,
        since: NaiveDate,
    ) -> Result<Vec<Row>, ProviderError> {
        Ok(self.rows_where(symbol, |r| r.date >= since))
    }
}
