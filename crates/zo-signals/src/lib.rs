//! Market-regime signals: candle feed interface and Wilder-smoothed
//! RSI/ADX.
//!
//! The grid venue has no public klines API, so candles come from an
//! external feed behind the [`CandleFeed`] trait. Indicator math is a
//! contract: the risk gate acts on the values, and Wilder smoothing of
//! the directional components specifically (an SMA-smoothed variant
//! inflates ADX roughly 2x and would trip the gate constantly).

pub mod engine;
pub mod error;
pub mod feed;
pub mod indicators;

pub use engine::{IndicatorEngine, IndicatorSnapshot, INDICATOR_PERIOD};
pub use error::{SignalError, SignalResult};
pub use feed::{CandleFeed, KlinesFeed};
