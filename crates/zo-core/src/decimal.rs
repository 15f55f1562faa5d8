//! Precision-safe decimal types for trading.
//!
//! Uses `rust_decimal` for exact decimal arithmetic, avoiding
//! floating-point rounding errors critical in financial calculations.
//! The venue wire format carries prices and sizes as integers in
//! 10^-8 units; conversions live here so no other crate multiplies
//! by the scale directly.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Div, Mul, Sub};
use std::str::FromStr;

use crate::error::CoreError;

/// Wire scale: prices and sizes travel as integers in 10^-8 units.
pub const WIRE_SCALE: u32 = 8;

/// Price with exact decimal precision.
///
/// Wraps `Decimal` to provide type safety and prevent mixing
/// prices with sizes in calculations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(pub Decimal);

impl Price {
    pub const ZERO: Self = Self(Decimal::ZERO);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    /// Midpoint of two prices.
    #[inline]
    pub fn mid(bid: Price, ask: Price) -> Price {
        Self((bid.0 + ask.0) / Decimal::TWO)
    }

    /// Round down to the exchange tick.
    #[inline]
    pub fn round_to_tick(&self, tick_size: Price) -> Self {
        if tick_size.is_zero() {
            return *self;
        }
        Self((self.0 / tick_size.0).floor() * tick_size.0)
    }

    /// Convert to wire units (integer 10^-8), truncating sub-tick dust.
    ///
    /// Fails on prices too large for an i64 in wire units.
    pub fn to_wire_units(&self) -> Result<i64, CoreError> {
        let scaled = self.0 * Decimal::from(10u64.pow(WIRE_SCALE));
        scaled
            .trunc()
            .to_i64()
            .ok_or_else(|| CoreError::InvalidPrice(format!("price {} overflows wire units", self.0)))
    }

    /// Reconstruct from wire units.
    pub fn from_wire_units(units: i64) -> Self {
        Self(Decimal::new(units, WIRE_SCALE))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Price {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl From<Decimal> for Price {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Price {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Mul<Decimal> for Price {
    type Output = Self;

    fn mul(self, rhs: Decimal) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl Div<Decimal> for Price {
    type Output = Self;

    fn div(self, rhs: Decimal) -> Self::Output {
        Self(self.0 / rhs)
    }
}

/// Size/quantity with exact decimal precision.
///
/// Sizes are stored unsigned; the order side carries the sign
/// convention used on the wire (buy positive, sell negative).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Size(pub Decimal);

impl Size {
    pub const ZERO: Self = Self(Decimal::ZERO);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    /// Convert to signed wire units (integer 10^-8): buy positive,
    /// sell negative.
    pub fn to_wire_units(&self, sign: i8) -> Result<i64, CoreError> {
        let scaled = self.0 * Decimal::from(10u64.pow(WIRE_SCALE)) * Decimal::from(sign);
        scaled
            .trunc()
            .to_i64()
            .ok_or_else(|| CoreError::InvalidSize(format!("size {} overflows wire units", self.0)))
    }

    /// Reconstruct an unsigned size from signed wire units.
    pub fn from_wire_units(units: i64) -> Self {
        Self(Decimal::new(units.abs(), WIRE_SCALE))
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Size {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl From<Decimal> for Size {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

impl Add for Size {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Size {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Mul<Decimal> for Size {
    type Output = Self;

    fn mul(self, rhs: Decimal) -> Self::Output {
        Self(self.0 * rhs)
    }
}
