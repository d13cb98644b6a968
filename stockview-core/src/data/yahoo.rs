//! Yahoo Finance data provider.
//!
//! Fetches daily OHLCV rows from Yahoo's v8 chart API with a blocking client.
//! Requests are made once; rate limits and network failures come back as
//! [`ProviderError`]s for the caller to act on.
//!
//! Yahoo Finance has no official API and is subject to unannounced format
//! changes. Any shape mismatch surfaces as `ResponseFormatChanged`.

use super::provider::{MarketDataProvider, ProviderError};
use crate::domain::Row;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    meta: Option<ChartMeta>,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    /// Exchange offset from UTC in seconds.
    gmtoffset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<f64>>,
}

/// Yahoo Finance data provider.
pub struct YahooProvider {
    client: reqwest::blocking::Client,
}

impl YahooProvider {
    pub fn new(timeout: Duration) -> Result<Self, ProviderError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| ProviderError::Client(e.to_string()))?;

        Ok(Self { client })
    }

    /// Build the chart API URL for a symbol from `start_ts` until now.
    fn chart_url(symbol: &str, start_ts: i64) -> String {
        let end_ts = Utc::now().timestamp();
        format!(
            "https://query2.finance.yahoo.com/v8/finance/chart/{symbol}\
             ?period1={start_ts}&period2={end_ts}&interval=1d&events=history"
        )
    }

    /// Parse the chart API response into rows tagged with `symbol`.
    ///
    /// A "Not Found" chart error is an empty result.
    fn parse_response(symbol: &str, resp: ChartResponse) -> Result<Vec<Row>, ProviderError> {
        let Some(result) = resp.chart.result else {
            return match resp.chart.error {
                Some(err) if err.code == "Not Found" => Ok(Vec::new()),
                Some(err) => Err(ProviderError::ResponseFormatChanged(format!(
                    "{}: {}",
                    err.code, err.description
                ))),
                None => Err(ProviderError::ResponseFormatChanged(
                    "empty result with no error".into(),
                )),
            };
        };

        let Some(data) = result.into_iter().next() else {
            return Ok(Vec::new());
        };

        // A symbol with no trading history has no timestamp array.
        let Some(timestamps) = data.timestamp else {
            return Ok(Vec::new());
        };
        // Bars are dated by the exchange's calendar day, not UTC's.
        let gmtoffset = data.meta.and_then(|m| m.gmtoffset).unwrap_or(0);

        let quote = data
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::ResponseFormatChanged("no quote data".into()))?;

        let mut rows = Vec::with_capacity(timestamps.len());
        for (i, &ts) in timestamps.iter().enumerate() {
            let date = chrono::DateTime::from_timestamp(ts.saturating_add(gmtoffset), 0)
                .map(|dt| dt.naive_utc().date())
                .ok_or_else(|| {
                    ProviderError::ResponseFormatChanged(format!("invalid timestamp: {ts}"))
                })?;

            let open = quote.open.get(i).copied().flatten();
            let high = quote.high.get(i).copied().flatten();
            let low = quote.low.get(i).copied().flatten();
            let close = quote.close.get(i).copied().flatten();
            let volume = quote.volume.get(i).copied().flatten();

            // Holidays come back with every field null; partial bars are
            // malformed. Both are dropped.
            let (Some(open), Some(high), Some(low), Some(close)) = (open, high, low, close)
            else {
                continue;
            };

            rows.push(Row {
                symbol: symbol.to_string(),
                date,
                open,
                high,
                low,
                close,
                volume: volume.unwrap_or(0.0),
            });
        }

        Ok(rows)
    }

    fn fetch_from(&self, symbol: &str, start_ts: i64) -> Result<Vec<Row>, ProviderError> {
        let symbol = symbol.trim().to_uppercase();
        let url = Self::chart_url(&symbol, start_ts);
        debug!(%symbol, start_ts, "requesting chart");

        let resp = self.client.get(&url).send().map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                ProviderError::NetworkUnreachable(e.to_string())
            } else {
                ProviderError::Client(e.to_string())
            }
        })?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(ProviderError::RateLimited { retry_after_secs });
        }
        if !status.is_success() {
            return Err(ProviderError::Http {
                status: status.as_u16(),
                symbol,
            });
        }

        let chart: ChartResponse = resp.json().map_err(|e| {
            ProviderError::ResponseFormatChanged(format!(
                "failed to parse response for {symbol}: {e}"
            ))
        })?;

        Self::parse_response(&symbol, chart)
    }
}

impl MarketDataProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch_full_history(&self, symbol: &str) -> Result<Vec<Row>, ProviderError> {
        self.fetch_from(symbol, 0)
    }

    fn fetch_history_since(
        &self,
        symbol: &str,
        since: NaiveDate,
    ) -> Result<Vec<Row>, ProviderError> {
        let start_ts = since
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or(0);
        self.fetch_from(symbol, start_ts)
    }
}
