//! Bot configuration, loaded from the environment.
//!
//! The process surface is a single long-running command with no
//! arguments; every knob is an environment variable. Validation runs
//! before any network call and failures are fatal.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;

use crate::error::{AppError, AppResult};
use zo_core::{MarketId, Price, Size};
use zo_grid::{GridConfig, PaceConfig};
use zo_risk::RegimeConfig;

#[derive(Clone)]
pub struct BotConfig {
    /// Base URL of the venue.
    pub api_url: String,
    /// Base58 identity private key. Never logged.
    pub identity_key: String,
    /// Instrument binding.
    pub symbol: String,
    pub market_id: MarketId,

    // grid parameters
    pub total_orders: u32,
    pub window_percent: Decimal,
    pub grid_spacing: Decimal,
    pub safe_gap: Decimal,
    pub order_size: Decimal,
    pub max_multiplier: Decimal,
    pub price_tick: Decimal,

    // regime parameters
    pub rsi_min: f64,
    pub rsi_max: f64,
    pub adx_trend_threshold: f64,
    pub adx_strong_trend: f64,
    pub cooldown_minutes: i64,

    // feed binding
    pub indicator_symbol: String,
    pub indicator_timeframe: String,
    pub klines_url: String,

    // supervisor timing
    pub cycle_interval: Duration,
    pub backoff: Duration,

    // venue rate-limit pacing
    pub min_order_interval: Duration,
    pub order_cooldown: Duration,
    pub cancel_pace: Duration,

    // position handling
    pub initial_position: Decimal,
    pub flatten_on_exit: bool,
}

impl BotConfig {
    /// Load from the environment, applying defaults for everything but
    /// the identity key.
    pub fn from_env() -> AppResult<Self> {
        let config = Self {
            api_url: env_or("API_URL", "https://zo-mainnet.n1.xyz".to_string())?,
            identity_key: env_required("IDENTITY_KEY")?,
            symbol: env_or("SYMBOL", "BTCUSD".to_string())?,
            market_id: env_or("MARKET_ID", 0)?,
            total_orders: env_or("TOTAL_ORDERS", 18)?,
            window_percent: env_or("WINDOW_PERCENT", Decimal::new(12, 2))?,
            grid_spacing: env_or("GRID_SPACING", Decimal::from(10))?,
            safe_gap: env_or("SAFE_GAP", Decimal::from(5))?,
            order_size: env_or("ORDER_SIZE", Decimal::new(1, 3))?,
            max_multiplier: env_or("MAX_MULTIPLIER", Decimal::from(15))?,
            price_tick: env_or("PRICE_TICK", Decimal::new(1, 2))?,
            rsi_min: env_or("RSI_MIN", 30.0)?,
            rsi_max: env_or("RSI_MAX", 70.0)?,
            adx_trend_threshold: env_or("ADX_TREND_THRESHOLD", 25.0)?,
            adx_strong_trend: env_or("ADX_STRONG_TREND", 30.0)?,
            cooldown_minutes: env_or("COOLDOWN_MINUTES", 15)?,
            indicator_symbol: env_or("INDICATOR_SYMBOL", "BTCUSDT".to_string())?,
            indicator_timeframe: env_or("INDICATOR_TIMEFRAME", "5m".to_string())?,
            klines_url: env_or("KLINES_URL", "https://api.binance.com".to_string())?,
            cycle_interval: Duration::from_secs(env_or("CYCLE_INTERVAL_SECONDS", 10u64)?),
            backoff: Duration::from_secs(env_or("BACKOFF_SECONDS", 60u64)?),
            min_order_interval: Duration::from_millis(env_or("MIN_ORDER_INTERVAL", 8000u64)?),
            order_cooldown: Duration::from_millis(env_or("ORDER_COOLDOWN", 4000u64)?),
            cancel_pace: Duration::from_millis(env_or("CANCEL_PACE", 500u64)?),
            initial_position: env_or("INITIAL_POSITION", Decimal::ZERO)?,
            flatten_on_exit: env_or("FLATTEN_ON_EXIT", true)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the controller cannot safely run with.
    pub fn validate(&self) -> AppResult<()> {
        if self.identity_key.trim().is_empty() {
            return Err(AppError::Config("IDENTITY_KEY is required".into()));
        }
        if self.api_url.trim().is_empty() {
            return Err(AppError::Config("API_URL must not be empty".into()));
        }
        if self.total_orders == 0 {
            return Err(AppError::Config("TOTAL_ORDERS must be positive".into()));
        }
        if self.window_percent <= Decimal::ZERO || self.window_percent >= Decimal::ONE {
            return Err(AppError::Config(
                "WINDOW_PERCENT must be in (0, 1)".into(),
            ));
        }
        if self.grid_spacing <= Decimal::ZERO {
            return Err(AppError::Config("GRID_SPACING must be positive".into()));
        }
        if self.safe_gap < Decimal::ZERO {
            return Err(AppError::Config("SAFE_GAP must not be negative".into()));
        }
        if self.order_size <= Decimal::ZERO {
            return Err(AppError::Config("ORDER_SIZE must be positive".into()));
        }
        if self.max_multiplier <= Decimal::ZERO {
            return Err(AppError::Config("MAX_MULTIPLIER must be positive".into()));
        }
        if self.price_tick <= Decimal::ZERO {
            return Err(AppError::Config("PRICE_TICK must be positive".into()));
        }
        if self.rsi_min >= self.rsi_max {
            return Err(AppError::Config("RSI_MIN must be below RSI_MAX".into()));
        }
        if self.adx_trend_threshold >= self.adx_strong_trend {
            return Err(AppError::Config(
                "ADX_TREND_THRESHOLD must be below ADX_STRONG_TREND".into(),
            ));
        }
        if self.cooldown_minutes <= 0 {
            return Err(AppError::Config("COOLDOWN_MINUTES must be positive".into()));
        }
        if self.cycle_interval.is_zero() {
            return Err(AppError::Config(
                "CYCLE_INTERVAL_SECONDS must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn grid_config(&self) -> GridConfig {
        GridConfig {
            total_orders: self.total_orders,
            window_percent: self.window_percent,
            grid_spacing: self.grid_spacing,
            safe_gap: self.safe_gap,
            order_size: Size::new(self.order_size),
            max_multiplier: self.max_multiplier,
            price_tick: Price::new(self.price_tick),
        }
    }

    pub fn pace_config(&self) -> PaceConfig {
        PaceConfig {
            min_order_interval: self.min_order_interval,
            order_cooldown: self.order_cooldown,
            cancel_pace: self.cancel_pace,
        }
    }

    pub fn regime_config(&self) -> RegimeConfig {
        RegimeConfig {
            rsi_min: self.rsi_min,
            rsi_max: self.rsi_max,
            adx_trend_threshold: self.adx_trend_threshold,
            adx_strong_trend: self.adx_strong_trend,
            cooldown_minutes: self.cooldown_minutes,
        }
    }
}

impl fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotConfig")
            .field("api_url", &self.api_url)
            .field("identity_key", &"<redacted>")
            .field("symbol", &self.symbol)
            .field("market_id", &self.market_id)
            .field("total_orders", &self.total_orders)
            .field("window_percent", &self.window_percent)
            .field("grid_spacing", &self.grid_spacing)
            .field("safe_gap", &self.safe_gap)
            .field("order_size", &self.order_size)
            .field("max_multiplier", &self.max_multiplier)
            .field("cycle_interval", &self.cycle_interval)
            .finish_non_exhaustive()
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> AppResult<T>
where
    T::Err: fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("{key}={raw:?}: {e}"))),
        Err(_) => Ok(default),
    }
}

fn env_required(key: &str) -> AppResult<String> {
    std::env::var(key)
        .map(|v| v.trim().to_string())
        .map_err(|_| AppError::Config(format!("{key} is required")))
}
