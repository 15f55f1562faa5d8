//! Indicator engine: fetch recent candles, compute RSI and ADX.

use tracing::debug;

use crate::error::{SignalError, SignalResult};
use crate::feed::CandleFeed;
use crate::indicators::{adx, last_valid, rsi};

/// Wilder period for both RSI and ADX.
pub const INDICATOR_PERIOD: usize = 14;

/// Candles requested per read; comfortably above the validity floor.
const CANDLE_FETCH_LIMIT: usize = 100;

/// Latest indicator values for one symbol/interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorSnapshot {
    pub rsi: f64,
    pub adx: f64,
    /// Close of the most recent candle, for logging context.
    pub last_close: f64,
}

/// Computes regime indicators from an external candle feed.
pub struct IndicatorEngine<F> {
    feed: F,
    symbol: String,
    interval: String,
    period: usize,
}

impl<F: CandleFeed> IndicatorEngine<F> {
    pub fn new(feed: F, symbol: impl Into<String>, interval: impl Into<String>) -> Self {
        Self {
            feed,
            symbol: symbol.into(),
            interval: interval.into(),
            period: INDICATOR_PERIOD,
        }
    }

    /// Minimum candle history for valid indicators.
    pub fn min_candles(&self) -> usize {
        2 * self.period + 20
    }

    /// Fetch candles and compute the current snapshot.
    pub async fn read(&self) -> SignalResult<IndicatorSnapshot> {
        let candles = self
            .feed
            .get_candles(&self.symbol, &self.interval, CANDLE_FETCH_LIMIT)
            .await?;

        let need = self.min_candles();
        if candles.len() < need {
            return Err(SignalError::InsufficientData {
                got: candles.len(),
                need,
            });
        }

        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let rsi_value = last_valid(&rsi(&closes, self.period))
            .ok_or_else(|| SignalError::MalformedData("RSI series has no valid value".into()))?;
        let adx_value = last_valid(&adx(&candles, self.period))
            .ok_or_else(|| SignalError::MalformedData("ADX series has no valid value".into()))?;
        let last_close = closes[closes.len() - 1];

        debug!(
            symbol = %self.symbol,
            interval = %self.interval,
            rsi = rsi_value,
            adx = adx_value,
            close = last_close,
            "indicators computed"
        );

        Ok(IndicatorSnapshot {
            rsi: rsi_value,
            adx: adx_value,
            last_close,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use zo_core::Candle;

    struct FixtureFeed {
        candles: Vec<Candle>,
    }

    #[async_trait]
    impl CandleFeed for FixtureFeed {
        async fn get_candles(
            &self,
            _symbol: &str,
            _interval: &str,
            _limit: usize,
        ) -> SignalResult<Vec<Candle>> {
            Ok(self.candles.clone())
        }
    }

    struct DownFeed;

    #[async_trait]
    impl CandleFeed for DownFeed {
        async fn get_candles(
            &self,
            _symbol: &str,
            _interval: &str,
            _limit: usize,
        ) -> SignalResult<Vec<Candle>> {
            Err(SignalError::FeedUnavailable("connection refused".into()))
        }
    }

    /// 48 bars (exactly 2*period + 20) of a ranging market around 70k.
    /// Expected values computed with an independent reference
    /// implementation.
    fn ranging_candles() -> Vec<Candle> {
        let high = [
            70025.0, 70087.7, 70102.9, 70102.9, 70059.2, 69989.6, 69963.2, 70026.3, 70088.5,
            70102.6, 70102.6, 70058.0, 69988.4, 69964.0, 70027.7, 70089.3, 70102.3, 70102.3,
            70056.7, 69987.2, 69964.9, 70029.0, 70090.1, 70101.9, 70101.9, 70055.5, 69986.0,
            69965.8, 70030.4, 70090.9, 70101.5, 70101.5, 70054.3, 69984.9, 69966.7, 70031.7,
            70091.6, 70101.1, 70101.1, 70053.0, 69983.7, 69967.7, 70033.1, 70092.4, 70100.7,
            70100.7, 70051.7, 69982.6,
        ];
        let low = [
            69975.0, 69975.0, 70037.7, 70009.2, 69939.6, 69896.8, 69896.8, 69913.2, 69976.3,
            70038.5, 70008.0, 69938.4, 69896.5, 69896.5, 69914.0, 69977.7, 70039.3, 70006.7,
            69937.2, 69896.3, 69896.3, 69914.9, 69979.0, 70040.1, 70005.5, 69936.0, 69896.0,
            69896.0, 69915.8, 69980.4, 70040.9, 70004.3, 69934.9, 69895.8, 69895.8, 69916.7,
            69981.7, 70041.6, 70003.0, 69933.7, 69895.7, 69895.7, 69917.7, 69983.1, 70042.4,
            70001.7, 69932.6, 69895.5,
        ];
        let close = [
            70000.0, 70062.7, 70077.9, 70034.2, 69964.6, 69921.8, 69938.2, 70001.3, 70063.5,
            70077.6, 70033.0, 69963.4, 69921.5, 69939.0, 70002.7, 70064.3, 70077.3, 70031.7,
            69962.2, 69921.3, 69939.9, 70004.0, 70065.1, 70076.9, 70030.5, 69961.0, 69921.0,
            69940.8, 70005.4, 70065.9, 70076.5, 70029.3, 69959.9, 69920.8, 69941.7, 70006.7,
            70066.6, 70076.1, 70028.0, 69958.7, 69920.7, 69942.7, 70008.1, 70067.4, 70075.7,
            70026.7, 69957.6, 69920.5,
        ];
        high.iter()
            .zip(&low)
            .zip(&close)
            .enumerate()
            .map(|(i, ((&h, &l), &c))| Candle {
                open_time_ms: i as i64 * 300_000,
                open: c,
                high: h,
                low: l,
                close: c,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_read_ranging_market() {
        let engine = IndicatorEngine::new(
            FixtureFeed {
                candles: ranging_candles(),
            },
            "BTCUSDT",
            "5m",
        );
        let snapshot = engine.read().await.unwrap();
        assert!((snapshot.adx - 9.126).abs() < 0.5, "adx={}", snapshot.adx);
        assert!((snapshot.rsi - 43.3806).abs() < 0.5, "rsi={}", snapshot.rsi);
        assert_eq!(snapshot.last_close, 69920.5);
    }

    #[tokio::test]
    async fn test_read_requires_minimum_history() {
        let mut candles = ranging_candles();
        candles.pop();
        let engine = IndicatorEngine::new(FixtureFeed { candles }, "BTCUSDT", "5m");
        match engine.read().await {
            Err(SignalError::InsufficientData { got: 47, need: 48 }) => {}
            other => panic!("expected InsufficientData, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_read_propagates_feed_unavailable() {
        let engine = IndicatorEngine::new(DownFeed, "BTCUSDT", "5m");
        assert!(matches!(
            engine.read().await,
            Err(SignalError::FeedUnavailable(_))
        ));
    }
}
