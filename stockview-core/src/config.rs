//! Service configuration, loaded from TOML.
//!
//! Every key is optional; a missing file section falls back to the defaults
//! below.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// Directory holding one `<SYMBOL>.csv` source per symbol.
    pub data_dir: PathBuf,
    pub symbols_ttl_secs: u64,
    pub data_ttl_secs: u64,
    /// Rows returned by a series query.
    pub series_lookback: usize,
    pub movers_count: usize,
    /// Closes fed to the forecaster.
    pub predict_window: usize,
    pub provider_timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            symbols_ttl_secs: 3600,
            data_ttl_secs: 300,
            series_lookback: crate::query::DEFAULT_LOOKBACK,
            movers_count: crate::query::DEFAULT_MOVERS,
            predict_window: crate::query::DEFAULT_PREDICT_WINDOW,
            provider_timeout_secs: 30,
        }
    }
}

impl ServiceConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            ("symbols_ttl_secs", self.symbols_ttl_secs == 0),
            ("data_ttl_secs", self.data_ttl_secs == 0),
            ("series_lookback", self.series_lookback == 0),
            ("movers_count", self.movers_count == 0),
            ("predict_window", self.predict_window == 0),
            ("provider_timeout_secs", self.provider_timeout_secs == 0),
        ];
        match checks.into_iter().find(|(_, zero)| *zero) {
            Some((field, _)) => Err(ConfigError::Zero { field }),
            None => Ok(()),
        }
    }

    pub fn symbols_ttl(&self) -> Duration {
        Duration::from_secs(self.symbols_ttl_secs)
    }

    pub fn data_ttl(&self) -> Duration {
        Duration::from_secs(self.data_ttl_secs)
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }
}
