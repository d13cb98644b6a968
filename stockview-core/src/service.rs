//! Market data service: the caller-facing facade.
//!
//! Owns the dataset handle, the symbol manager and two TTL caches, and
//! keeps the caches consistent with lifecycle operations:
//!
//! | operation     | reload             | invalidates                 |
//! |---------------|--------------------|-----------------------------|
//! | `download`    | always             | `symbols`, `data:<SYMBOL>`  |
//! | `refresh`     | only when updated  | `data:<SYMBOL>`             |
//! | `refresh_all` | once, at the end   | everything                  |

use crate::cache::TtlCache;
use crate::config::{ConfigError, ServiceConfig};
use crate::coordinator::{DatasetHandle, Health};
use crate::data::provider::{MarketDataProvider, ProviderError};
use crate::data::yahoo::YahooProvider;
use crate::dataset::{Dataset, DatasetError};
use crate::domain::canonical_symbol;
use crate::forecast::{Forecaster, LinearTrend};
use crate::lifecycle::{Downloaded, LifecycleError, RefreshAllReport, RefreshOutcome, SymbolManager};
use crate::query::{
    self, Movers, Prediction, QueryError, RecentPerformance, SeriesPoint, Summary, Summary52w,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

const SYMBOLS_KEY: &str = "symbols";

fn series_key(symbol: &str) -> String {
    format!("data:{}", canonical_symbol(symbol))
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// How a caller should treat a [`ServiceError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    BadRequest,
    /// Transient: no dataset yet, network down, rate limited.
    Unavailable,
    Internal,
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Dataset(e) | Self::Lifecycle(LifecycleError::Reload(e)) => dataset_kind(e),
            Self::Query(QueryError::SymbolNotFound { .. }) => ErrorKind::NotFound,
            Self::Lifecycle(e) => match e {
                // Caller-fixable: download an existing ticker, or download before refreshing.
                LifecycleError::UnknownSymbol { .. }
                | LifecycleError::LocalSourceMissing { .. }
                | LifecycleError::InvalidSymbol { .. } => ErrorKind::BadRequest,
                LifecycleError::Provider { source, .. } => provider_kind(source),
                _ => ErrorKind::Internal,
            },
            Self::Provider(e) => provider_kind(e),
            Self::Config(_) => ErrorKind::BadRequest,
        }
    }
}

fn dataset_kind(e: &DatasetError) -> ErrorKind {
    match e {
        DatasetError::NotReady | DatasetError::NoValidData { .. } => ErrorKind::Unavailable,
        _ => ErrorKind::Internal,
    }
}

fn provider_kind(e: &ProviderError) -> ErrorKind {
    match e {
        ProviderError::NetworkUnreachable(_) | ProviderError::RateLimited { .. } => {
            ErrorKind::Unavailable
        }
        _ => ErrorKind::Internal,
    }
}

pub struct MarketDataService {
    config: ServiceConfig,
    handle: Arc<DatasetHandle>,
    manager: SymbolManager,
    forecaster: Arc<dyn Forecaster>,
    symbols_cache: TtlCache<String, Vec<String>>,
    series_cache: TtlCache<String, Vec<SeriesPoint>>,
}

impl MarketDataService {
    pub fn new(
        config: ServiceConfig,
        handle: Arc<DatasetHandle>,
        provider: Arc<dyn MarketDataProvider>,
    ) -> Self {
        let manager = SymbolManager::new(config.data_dir.clone(), provider);
        Self {
            symbols_cache: TtlCache::new(config.symbols_ttl()),
            series_cache: TtlCache::new(config.data_ttl()),
            forecaster: Arc::new(LinearTrend),
            config,
            handle,
            manager,
        }
    }

    /// Service backed by Yahoo Finance, with nothing loaded yet.
    pub fn from_config(config: ServiceConfig) -> Result<Self, ServiceError> {
        config.validate()?;
        let provider = YahooProvider::new(config.provider_timeout())?;
        Ok(Self::new(config, Arc::new(DatasetHandle::new()), Arc::new(provider)))
    }

    pub fn with_forecaster(mut self, forecaster: Arc<dyn Forecaster>) -> Self {
        self.forecaster = forecaster;
        self
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn handle(&self) -> &Arc<DatasetHandle> {
        &self.handle
    }

    /// Load the data directory and publish it.
    pub fn load(&self) -> Result<Health, ServiceError> {
        self.handle.reload(&self.config.data_dir)?;
        Ok(self.handle.health())
    }

    fn dataset(&self) -> Result<Arc<Dataset>, ServiceError> {
        Ok(self.handle.current()?)
    }

    pub fn health(&self) -> Health {
        self.handle.health()
    }

    pub fn symbols(&self) -> Result<Vec<String>, ServiceError> {
        let key = SYMBOLS_KEY.to_string();
        if let Some(hit) = self.symbols_cache.get(&key) {
            debug!(%key, "cache hit");
            return Ok(hit);
        }
        debug!(%key, "cache miss");

        let symbols = query::list_symbols(&*self.dataset()?);
        self.symbols_cache.insert(key, symbols.clone());
        Ok(symbols)
    }

    /// The configured lookback of a symbol's rows.
    pub fn series(&self, symbol: &str) -> Result<Vec<SeriesPoint>, ServiceError> {
        let key = series_key(symbol);
        if let Some(hit) = self.series_cache.get(&key) {
            debug!(%key, "cache hit");
            return Ok(hit);
        }
        debug!(%key, "cache miss");

        let series = query::symbol_series(&*self.dataset()?, symbol, self.config.series_lookback)?;
        self.series_cache.insert(key, series.clone());
        Ok(series)
    }

    pub fn summary(&self, symbol: &str) -> Result<Summary, ServiceError> {
        Ok(query::summary(&*self.dataset()?, symbol)?)
    }

    pub fn summary_52w(&self, symbol: &str) -> Result<Summary52w, ServiceError> {
        Ok(query::summary_52w(&*self.dataset()?, symbol)?)
    }

    pub fn compare(
        &self,
        symbol_a: &str,
        symbol_b: &str,
    ) -> Result<BTreeMap<String, Option<f64>>, ServiceError> {
        Ok(query::compare(&*self.dataset()?, symbol_a, symbol_b)?)
    }

    pub fn movers(&self) -> Result<Movers, ServiceError> {
        Ok(query::top_movers(&*self.dataset()?, self.config.movers_count))
    }

    pub fn predict(&self, symbol: &str) -> Result<Prediction, ServiceError> {
        Ok(query::predict_next(
            &*self.dataset()?,
            symbol,
            self.forecaster.as_ref(),
            self.config.predict_window,
        )?)
    }

    pub fn recent_performance(
        &self,
        symbol: &str,
        days: usize,
    ) -> Result<RecentPerformance, ServiceError> {
        Ok(query::recent_performance(&*self.dataset()?, symbol, days)?)
    }

    pub fn download(&self, symbol: &str) -> Result<Downloaded, ServiceError> {
        let done = self.manager.download(symbol)?;
        self.handle.reload(&self.config.data_dir)?;
        self.symbols_cache.invalidate(&SYMBOLS_KEY.to_string());
        self.series_cache.invalidate(&series_key(&done.symbol));
        Ok(done)
    }

    pub fn refresh(&self, symbol: &str) -> Result<RefreshOutcome, ServiceError> {
        let outcome = self.manager.refresh(symbol)?;
        if outcome.is_updated() {
            self.handle.reload(&self.config.data_dir)?;
        }
        self.series_cache.invalidate(&series_key(outcome.symbol()));
        Ok(outcome)
    }

    pub fn refresh_all(&self) -> Result<RefreshAllReport, ServiceError> {
        let report = self.manager.refresh_all(&self.handle)?;
        self.symbols_cache.invalidate_all();
        self.series_cache.invalidate_all();
        Ok(report)
    }
}
