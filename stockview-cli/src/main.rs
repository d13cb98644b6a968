//! Stockview CLI — query, download and refresh commands.
//!
//! Commands:
//! - `symbols`, `series`, `summary`, `compare`, `movers`, `predict`,
//!   `performance`, `health` — read the data directory and print JSON
//! - `download` — fetch full history for new symbols from Yahoo Finance
//! - `refresh`, `refresh-all` — append recent rows to existing sources
//!
//! Results go to stdout as pretty JSON; logs go to stderr (`RUST_LOG`).

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use stockview_core::query::DEFAULT_PERFORMANCE_DAYS;
use stockview_core::{MarketDataService, ServiceConfig};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "stockview", about = "Stockview CLI — daily OHLCV dataset manager")]
struct Cli {
    /// TOML config file. Defaults are used when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data directory, overriding the config file.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List loaded symbols.
    Symbols,
    /// Most recent rows of a symbol with daily return and 7-day MA.
    Series {
        symbol: String,

        /// Number of rows, overriding the config file.
        #[arg(long)]
        lookback: Option<usize>,
    },
    /// High/low/average close of a symbol.
    Summary {
        symbol: String,

        /// Trailing 252 rows with volatility instead of the whole history.
        #[arg(long, default_value_t = false)]
        trailing: bool,
    },
    /// Whole-history percent return of two symbols.
    Compare { symbol_a: String, symbol_b: String },
    /// Top gainers and losers of the latest session.
    Movers {
        #[arg(long)]
        count: Option<usize>,
    },
    /// Forecast the next close.
    Predict {
        symbol: String,

        /// Closes to fit on, overriding the config file.
        #[arg(long)]
        window: Option<usize>,
    },
    /// Return and average volume over the last N rows.
    Performance {
        symbol: String,

        #[arg(long, default_value_t = DEFAULT_PERFORMANCE_DAYS)]
        days: usize,
    },
    /// Dataset status.
    Health,
    /// Download full history for one or more symbols (e.g., AAPL MSFT).
    Download {
        #[arg(required = true)]
        symbols: Vec<String>,
    },
    /// Append recent rows to an existing symbol source.
    Refresh { symbol: String },
    /// Refresh every symbol source, then reload once.
    RefreshAll,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ServiceConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ServiceConfig::default(),
    };
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    match &cli.command {
        Commands::Series { lookback: Some(n), .. } => config.series_lookback = *n,
        Commands::Movers { count: Some(n) } => config.movers_count = *n,
        Commands::Predict { window: Some(n), .. } => config.predict_window = *n,
        _ => {}
    }

    let service = MarketDataService::from_config(config)?;

    match cli.command {
        Commands::Symbols => {
            load(&service)?;
            print_json(&service.symbols()?)
        }
        Commands::Series { symbol, .. } => {
            load(&service)?;
            print_json(&service.series(&symbol)?)
        }
        Commands::Summary { symbol, trailing } => {
            load(&service)?;
            if trailing {
                print_json(&service.summary_52w(&symbol)?)
            } else {
                print_json(&service.summary(&symbol)?)
            }
        }
        Commands::Compare { symbol_a, symbol_b } => {
            load(&service)?;
            print_json(&service.compare(&symbol_a, &symbol_b)?)
        }
        Commands::Movers { .. } => {
            load(&service)?;
            print_json(&service.movers()?)
        }
        Commands::Predict { symbol, .. } => {
            load(&service)?;
            print_json(&service.predict(&symbol)?)
        }
        Commands::Performance { symbol, days } => {
            load(&service)?;
            print_json(&service.recent_performance(&symbol, days)?)
        }
        Commands::Health => {
            // An empty or missing data directory is a valid "starting" state.
            if let Err(e) = service.load() {
                warn!(error = %e, "dataset not loaded");
            }
            print_json(&service.health())
        }
        Commands::Download { symbols } => run_download(&service, &symbols),
        Commands::Refresh { symbol } => print_json(&service.refresh(&symbol)?),
        Commands::RefreshAll => print_json(&service.refresh_all()?),
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stockview=info,stockview_core=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load(service: &MarketDataService) -> Result<()> {
    service
        .load()
        .with_context(|| format!("loading {}", service.config().data_dir.display()))?;
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Download each symbol in turn; report every result before failing.
fn run_download(service: &MarketDataService, symbols: &[String]) -> Result<()> {
    let mut results = BTreeMap::new();
    let mut failed = 0;

    for symbol in symbols {
        let entry = match service.download(symbol) {
            Ok(done) => serde_json::to_value(done)?,
            Err(e) => {
                failed += 1;
                warn!(%symbol, error = %e, "download failed");
                serde_json::json!({ "error": e.to_string() })
            }
        };
        results.insert(symbol.trim().to_uppercase(), entry);
    }

    print_json(&results)?;
    if failed > 0 {
        bail!("{failed} of {} downloads failed", symbols.len());
    }
    Ok(())
}
