//! External OHLCV feed.
//!
//! The venue itself has no public klines endpoint, so candles come
//! from a spot exchange REST API. The feed is a trait so the engine
//! can be driven from a fixture in tests.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::error::{SignalError, SignalResult};
use zo_core::Candle;

/// Default timeout for feed requests.
const FEED_TIMEOUT: Duration = Duration::from_secs(10);

/// Source of recent candles, oldest first.
#[async_trait]
pub trait CandleFeed: Send + Sync {
    async fn get_candles(
        &self,
        symbol: &str,
        interval: &str,
        limit: usize,
    ) -> SignalResult<Vec<Candle>>;
}

/// Klines feed over a Binance-compatible REST API.
///
/// `GET {base}/api/v3/klines?symbol=&interval=&limit=` returning a JSON
/// array of arrays: `[open_time, open, high, low, close, volume, ...]`
/// with prices as strings.
pub struct KlinesFeed {
    client: reqwest::Client,
    base_url: String,
}

impl KlinesFeed {
    pub fn new(base_url: impl Into<String>) -> SignalResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(FEED_TIMEOUT)
            .build()
            .map_err(|e| SignalError::FeedUnavailable(format!("failed to build client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl CandleFeed for KlinesFeed {
    async fn get_candles(
        &self,
        symbol: &str,
        interval: &str,
        limit: usize,
    ) -> SignalResult<Vec<Candle>> {
        let url = format!(
            "{}/api/v3/klines?symbol={symbol}&interval={interval}&limit={limit}",
            self.base_url.trim_end_matches('/')
        );
        debug!(%url, "fetching candles");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SignalError::FeedUnavailable(format!("klines request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SignalError::FeedUnavailable(format!(
                "klines request returned HTTP {status}"
            )));
        }

        let rows: Vec<Vec<Value>> = response
            .json()
            .await
            .map_err(|e| SignalError::FeedUnavailable(format!("klines body unreadable: {e}")))?;

        rows.iter().map(parse_kline_row).collect()
    }
}

/// Parse one kline row. Numeric fields arrive as strings on Binance
/// and as numbers on some compatible APIs; accept both.
fn parse_kline_row(row: &Vec<Value>) -> SignalResult<Candle> {
    if row.len() < 5 {
        return Err(SignalError::MalformedData(format!(
            "kline row has {} fields, need 5",
            row.len()
        )));
    }
    let open_time_ms = row[0]
        .as_i64()
        .ok_or_else(|| SignalError::MalformedData("open time is not an integer".into()))?;

    let candle = Candle {
        open_time_ms,
        open: value_as_f64(&row[1])?,
        high: value_as_f64(&row[2])?,
        low: value_as_f64(&row[3])?,
        close: value_as_f64(&row[4])?,
    };
    if !candle.is_well_formed() {
        return Err(SignalError::MalformedData(format!(
            "inconsistent candle at t={open_time_ms}"
        )));
    }
    Ok(candle)
}

fn value_as_f64(value: &Value) -> SignalResult<f64> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| SignalError::MalformedData("numeric field out of range".into())),
        Value::String(s) => s
            .parse()
            .map_err(|_| SignalError::MalformedData(format!("unparseable price field: {s}"))),
        other => Err(SignalError::MalformedData(format!(
            "unexpected field type: {other}"
        ))),
    }
}
