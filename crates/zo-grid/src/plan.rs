//! Grid plan computation.
//!
//! Pure functions from market state to the desired ladder; no I/O and
//! no mutation, so every rule here is directly testable.
//!
//! Geometry: mid `m = (bid + ask) / 2`, window `[m(1-W), m(1+W)]`.
//! Side split skews order counts away from the position: the more
//! inventory, the more of the ladder quotes the reducing side, until
//! the cap `k_max` makes the ladder one-sided.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use zo_core::{Price, Size};

/// Grid controller configuration. Field names follow the venue-side
/// configuration keys.
#[derive(Debug, Clone)]
pub struct GridConfig {
    /// Total ladder size N across both sides.
    pub total_orders: u32,
    /// Window half-width W as a fraction of mid.
    pub window_percent: Decimal,
    /// Tick spacing g between rungs, in quote units.
    pub grid_spacing: Decimal,
    /// Safe gap delta between top of book and the first rung.
    pub safe_gap: Decimal,
    /// Per-order size o in base asset.
    pub order_size: Size,
    /// Position cap k_max, in multiples of the order size.
    pub max_multiplier: Decimal,
    /// Exchange price tick for discretization.
    pub price_tick: Price,
}

/// The desired ladder for one tick. Never persisted.
#[derive(Debug, Clone)]
pub struct GridPlan {
    pub mid: Price,
    pub window_low: Price,
    pub window_high: Price,
    /// Sell rungs, nearest to mid first (ascending price).
    pub sells: Vec<Price>,
    /// Buy rungs, nearest to mid first (descending price).
    pub buys: Vec<Price>,
}

impl GridPlan {
    pub fn contains_in_window(&self, price: Price) -> bool {
        price >= self.window_low && price <= self.window_high
    }
}

/// Split the ladder between sides from the current position.
///
/// Returns `(sell_ratio, buy_ratio)`:
/// - `p = 0`: (1/2, 1/2);
/// - `k = |p|/o >= k_max`: (1, 0) for a long, (0, 1) for a short --
///   only reducing orders remain;
/// - otherwise with `r = k/k_max`: long `(1/2·(1+r), 1/2·(1-r))`,
///   short mirrored.
pub fn side_split(position: Decimal, order_size: Size, max_multiplier: Decimal) -> (Decimal, Decimal) {
    if !order_size.is_positive() || max_multiplier <= Decimal::ZERO {
        return (dec!(0.5), dec!(0.5));
    }
    if position.is_zero() {
        return (dec!(0.5), dec!(0.5));
    }

    let k = position.abs() / order_size.inner();
    if k >= max_multiplier {
        return if position > Decimal::ZERO {
            (Decimal::ONE, Decimal::ZERO)
        } else {
            (Decimal::ZERO, Decimal::ONE)
        };
    }

    let r = k / max_multiplier;
    let half = dec!(0.5);
    if position > Decimal::ZERO {
        (half * (Decimal::ONE + r), half * (Decimal::ONE - r))
    } else {
        (half * (Decimal::ONE - r), half * (Decimal::ONE + r))
    }
}

/// Compute the desired ladder.
///
/// Sell rungs climb from `ask + safe_gap` in `grid_spacing` steps, buy
/// rungs descend from `bid - safe_gap`. Rungs are discretized to the
/// exchange tick and rungs outside the window are dropped, which may
/// yield fewer than the ratio'd count.
pub fn build_plan(bid: Price, ask: Price, position: Decimal, config: &GridConfig) -> GridPlan {
    let mid = Price::mid(bid, ask);
    let window_low = mid * (Decimal::ONE - config.window_percent);
    let window_high = mid * (Decimal::ONE + config.window_percent);

    let (sell_ratio, buy_ratio) = side_split(position, config.order_size, config.max_multiplier);
    let n = Decimal::from(config.total_orders);
    let sell_count = (n * sell_ratio).floor().to_u32().unwrap_or(0);
    let buy_count = (n * buy_ratio).floor().to_u32().unwrap_or(0);

    let mut sells = Vec::with_capacity(sell_count as usize);
    for i in 0..sell_count {
        let raw = ask.inner() + config.safe_gap + config.grid_spacing * Decimal::from(i);
        let rung = Price::new(raw).round_to_tick(config.price_tick);
        if rung > window_high {
            break;
        }
        sells.push(rung);
    }

    let mut buys = Vec::with_capacity(buy_count as usize);
    for i in 0..buy_count {
        let raw = bid.inner() - config.safe_gap - config.grid_spacing * Decimal::from(i);
        let rung = Price::new(raw).round_to_tick(config.price_tick);
        if rung < window_low || !rung.is_positive() {
            break;
        }
        buys.push(rung);
    }

    GridPlan {
        mid,
        window_low,
        window_high,
        sells,
        buys,
    }
}
