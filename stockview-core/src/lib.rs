//! Stockview Core — daily OHLCV dataset manager.
//!
//! This crate contains:
//! - Row normalization and per-symbol CSV sources
//! - Parallel dataset loading and metric enrichment (daily return, 7-day MA)
//! - Read-only queries: series, summaries, comparisons, movers, forecasts
//! - A TTL cache for query results
//! - Symbol download/refresh against a market data provider
//! - Atomic dataset reloads behind a shared handle
//! - A service facade tying the above together

pub mod cache;
pub mod config;
pub mod coordinator;
pub mod data;
pub mod dataset;
pub mod domain;
pub mod forecast;
pub mod lifecycle;
pub mod metrics;
pub mod query;
pub mod service;

pub use config::{ConfigError, ServiceConfig};
pub use coordinator::{DatasetHandle, Health};
pub use dataset::{Dataset, DatasetError};
pub use service::{ErrorKind, MarketDataService, ServiceError};
