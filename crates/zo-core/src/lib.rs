//! Core types shared across the zo grid bot.
//!
//! Decimal-safe price/size newtypes, order records, candles, and the
//! common error type. No I/O lives here.

pub mod candle;
pub mod decimal;
pub mod error;
pub mod order;

pub use candle::Candle;
pub use decimal::{Price, Size, WIRE_SCALE};
pub use error::{CoreError, Result};
pub use order::{ClientOrderId, MarketId, Order, OrderSide, OrderState};
