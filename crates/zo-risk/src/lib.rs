//! Risk gate for the grid controller.
//!
//! Classifies the instantaneous market regime from RSI and ADX and
//! maintains the cool-down state machine. The bot prioritizes standing
//! down over quoting when in doubt: a trending or overextended market
//! triggers a cool-down during which the controller only cancels and
//! flattens.

pub mod gate;

pub use gate::{Cooldown, Regime, RegimeConfig, RegimeGate, Verdict};
