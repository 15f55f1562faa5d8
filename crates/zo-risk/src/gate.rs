//! Regime classification and cool-down state.
//!
//! Decision table, evaluated in order (all comparisons strict):
//!
//! | Condition                                      | Admit | Cool-down |
//! |------------------------------------------------|-------|-----------|
//! | ADX > strong (30)                              | no    | yes       |
//! | trend < ADX <= strong and RSI outside band ± 5 | no    | yes       |
//! | trend < ADX <= strong                          | yes*  | no        |
//! | RSI outside [rsi_min, rsi_max]                 | no    | yes       |
//! | otherwise                                      | yes   | no        |
//!
//! *cautious: quoting continues but the regime is logged as trending.
//!
//! Cool-down exit is purely time-based: the first evaluation at or
//! after `exit_at` returns the gate to idle and classifies fresh.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Extra RSI slack allowed while the market is moderately trending.
const TREND_RSI_TOLERANCE: f64 = 5.0;

/// Regime gate configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegimeConfig {
    /// Lower bound of the normal RSI band.
    pub rsi_min: f64,
    /// Upper bound of the normal RSI band.
    pub rsi_max: f64,
    /// ADX above this is a trending market.
    pub adx_trend_threshold: f64,
    /// ADX above this is a strong trend: stand down unconditionally.
    pub adx_strong_trend: f64,
    /// Cool-down length in minutes.
    pub cooldown_minutes: i64,
}

impl Default for RegimeConfig {
    fn default() -> Self {
        Self {
            rsi_min: 30.0,
            rsi_max: 70.0,
            adx_trend_threshold: 25.0,
            adx_strong_trend: 30.0,
            cooldown_minutes: 15,
        }
    }
}

/// Market regime label, for logging and the cautious flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Regime {
    Ranging,
    ModerateTrend,
    StrongTrend,
}

impl std::fmt::Display for Regime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ranging => write!(f, "ranging"),
            Self::ModerateTrend => write!(f, "moderate_trend"),
            Self::StrongTrend => write!(f, "strong_trend"),
        }
    }
}

/// Active cool-down record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cooldown {
    pub reason: String,
    pub entered_at: DateTime<Utc>,
    pub exit_at: DateTime<Utc>,
}

/// Outcome of one gate evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub admit: bool,
    /// True when this evaluation started a cool-down. The caller runs
    /// the suspend path (cancel-all + flatten) on the same tick.
    pub trigger_cooldown: bool,
    /// Admitted, but the market is trending; quote with care.
    pub cautious: bool,
    pub regime: Regime,
    pub reason: Option<String>,
}

impl Verdict {
    fn admit(regime: Regime, cautious: bool) -> Self {
        Self {
            admit: true,
            trigger_cooldown: false,
            cautious,
            regime,
            reason: None,
        }
    }

    fn deny(regime: Regime, reason: String) -> Self {
        Self {
            admit: false,
            trigger_cooldown: true,
            cautious: false,
            regime,
            reason: Some(reason),
        }
    }
}

/// Regime gate: owns the cool-down record.
#[derive(Debug)]
pub struct RegimeGate {
    config: RegimeConfig,
    cooldown: Option<Cooldown>,
}

impl RegimeGate {
    pub fn new(config: RegimeConfig) -> Self {
        Self {
            config,
            cooldown: None,
        }
    }

    /// The active cool-down after expiring any stale one, or None.
    ///
    /// Exit is time-based: the first poll at or after `exit_at` clears
    /// the record.
    pub fn poll_cooldown(&mut self, now: DateTime<Utc>) -> Option<&Cooldown> {
        if let Some(cd) = &self.cooldown {
            if now >= cd.exit_at {
                info!(reason = %cd.reason, "cool-down expired, resuming regime checks");
                self.cooldown = None;
            }
        }
        self.cooldown.as_ref()
    }

    /// Whether a cool-down is currently active (without expiring it).
    pub fn in_cooldown(&self) -> bool {
        self.cooldown.is_some()
    }

    /// Classify the regime and update cool-down state.
    ///
    /// Callers should `poll_cooldown` first; an active cool-down denies
    /// without consulting the table.
    pub fn evaluate(&mut self, now: DateTime<Utc>, rsi: f64, adx: f64) -> Verdict {
        if let Some(cd) = self.poll_cooldown(now) {
            return Verdict {
                admit: false,
                trigger_cooldown: false,
                cautious: false,
                regime: Regime::StrongTrend,
                reason: Some(format!("cooling down until {}: {}", cd.exit_at, cd.reason)),
            };
        }

        let verdict = self.classify(rsi, adx);
        if verdict.trigger_cooldown {
            let reason = verdict.reason.clone().unwrap_or_default();
            self.enter_cooldown(now, reason);
        } else {
            debug!(rsi, adx, regime = %verdict.regime, cautious = verdict.cautious, "regime admitted");
        }
        verdict
    }

    fn classify(&self, rsi: f64, adx: f64) -> Verdict {
        let cfg = &self.config;

        if adx > cfg.adx_strong_trend {
            return Verdict::deny(
                Regime::StrongTrend,
                format!("strong trend (ADX {adx:.2} > {})", cfg.adx_strong_trend),
            );
        }

        if adx > cfg.adx_trend_threshold {
            let lo = cfg.rsi_min - TREND_RSI_TOLERANCE;
            let hi = cfg.rsi_max + TREND_RSI_TOLERANCE;
            if rsi < lo || rsi > hi {
                return Verdict::deny(
                    Regime::ModerateTrend,
                    format!("extreme RSI under trending market (RSI {rsi:.2}, ADX {adx:.2})"),
                );
            }
            return Verdict::admit(Regime::ModerateTrend, true);
        }

        if rsi < cfg.rsi_min || rsi > cfg.rsi_max {
            return Verdict::deny(
                Regime::Ranging,
                format!(
                    "RSI {rsi:.2} outside {}-{} band",
                    cfg.rsi_min, cfg.rsi_max
                ),
            );
        }

        Verdict::admit(Regime::Ranging, false)
    }

    fn enter_cooldown(&mut self, now: DateTime<Utc>, reason: String) {
        let exit_at = now + Duration::minutes(self.config.cooldown_minutes);
        warn!(
            %reason,
            minutes = self.config.cooldown_minutes,
            exit_at = %exit_at,
            "entering risk cool-down"
        );
        self.cooldown = Some(Cooldown {
            reason,
            entered_at: now,
            exit_at,
        });
    }
}
