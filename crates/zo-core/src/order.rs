//! Order-related types and identifiers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::decimal::{Price, Size};
use crate::error::CoreError;

/// Venue market identifier (BTCUSD = 0 on mainnet).
pub type MarketId = u32;

/// Order side: buy or sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Returns the opposite side.
    pub fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }

    /// Returns 1 for buy, -1 for sell: the sign convention used for
    /// sizes on the wire and for position arithmetic.
    pub fn sign(&self) -> i8 {
        match self {
            Self::Buy => 1,
            Self::Sell => -1,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

/// Client order ID.
///
/// A positive 32-bit integer, unique within a process lifetime. The
/// exchange adapter derives fresh ids from the clock and retries on
/// collision with the local tracker, so uniqueness holds even across
/// long-lived processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientOrderId(u32);

impl ClientOrderId {
    /// Wrap a raw id. Zero is not a valid order id.
    pub fn new(id: u32) -> Result<Self, CoreError> {
        if id == 0 {
            return Err(CoreError::InvalidOrderId);
        }
        Ok(Self(id))
    }

    #[inline]
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ClientOrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a locally tracked order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderState {
    /// Resting on the book (as far as we know).
    Open,
    /// Removed: either cancelled by us or inferred filled.
    Done,
}

/// A locally tracked resting order.
///
/// The venue exposes no order-query endpoint, so this record is the
/// authoritative local view of an outstanding order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: ClientOrderId,
    pub market: MarketId,
    pub side: OrderSide,
    pub price: Price,
    pub size: Size,
    pub placed_at: DateTime<Utc>,
    pub state: OrderState,
}

impl Order {
    /// Build an open order record, enforcing strictly positive price
    /// and size.
    pub fn open(
        id: ClientOrderId,
        market: MarketId,
        side: OrderSide,
        price: Price,
        size: Size,
        placed_at: DateTime<Utc>,
    ) -> Result<Self, CoreError> {
        if !price.is_positive() {
            return Err(CoreError::InvalidPrice(format!(
                "order price must be positive, got {price}"
            )));
        }
        if !size.is_positive() {
            return Err(CoreError::InvalidSize(format!(
                "order size must be positive, got {size}"
            )));
        }
        Ok(Self {
            id,
            market,
            side,
            price,
            size,
            placed_at,
            state: OrderState::Open,
        })
    }

    /// Signed position delta if this order were to fill.
    pub fn fill_delta(&self) -> rust_decimal::Decimal {
        self.size.inner() * rust_decimal::Decimal::from(self.side.sign())
    }
}
