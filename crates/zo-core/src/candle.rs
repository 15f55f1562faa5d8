//! OHLC candle type for the indicator engine.
//!
//! Indicator math runs in `f64`; candles are converted at the feed
//! boundary and never travel back into order placement, so decimal
//! exactness is not required here.

use serde::{Deserialize, Serialize};

/// A single OHLC candle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Interval open time, Unix milliseconds.
    pub open_time_ms: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Candle {
    /// Basic sanity: high is the top of the bar, low the bottom, and
    /// nothing is NaN.
    pub fn is_well_formed(&self) -> bool {
        let vals = [self.open, self.high, self.low, self.close];
        if vals.iter().any(|v| !v.is_finite()) {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open.max(self.close)
            && self.low <= self.open.min(self.close)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_formed() {
        let c = Candle {
            open_time_ms: 0,
            open: 100.0,
            high: 105.0,
            low: 99.0,
            close: 104.0,
        };
        assert!(c.is_well_formed());
    }

    #[test]
    fn test_rejects_inverted_bar() {
        let c = Candle {
            open_time_ms: 0,
            open: 100.0,
            high: 99.0,
            low: 105.0,
            close: 104.0,
        };
        assert!(!c.is_well_formed());
    }

    #[test]
    fn test_rejects_nan() {
        let c = Candle {
            open_time_ms: 0,
            open: f64::NAN,
            high: 105.0,
            low: 99.0,
            close: 104.0,
        };
        assert!(!c.is_well_formed());
    }
}
