//! Supervisor: owns the periodic tick and sequences the pipeline.
//!
//! Each tick runs indicator engine -> risk gate -> (if admitted)
//! session check + grid cycle. A denied regime with a fresh cool-down
//! runs the suspend path instead (cancel-all + flatten). Ticks never
//! overlap: a tick that exceeds the period delays the next. Any error
//! or panic inside a tick logs with context and backs the supervisor
//! off before the next attempt.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::Utc;
use futures_util::FutureExt;
use rust_decimal::Decimal;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use zo_exchange::{ClientConfig, ExchangeClient};
use zo_grid::GridEngine;
use zo_orders::OrderTracker;
use zo_risk::RegimeGate;
use zo_signals::{IndicatorEngine, KlinesFeed};
use zo_wire::IdentityKey;

use crate::config::BotConfig;
use crate::error::{AppError, AppResult};

/// Attempts for the terminal cancel-all/flatten sequence.
const TERMINAL_ATTEMPTS: u32 = 3;

/// Main application.
pub struct Application {
    config: BotConfig,
    client: Arc<ExchangeClient>,
    engine: GridEngine,
    indicators: IndicatorEngine<KlinesFeed>,
    gate: RegimeGate,
}

impl Application {
    pub fn new(config: BotConfig) -> AppResult<Self> {
        let identity = IdentityKey::from_base58(&config.identity_key)
            .map_err(|e| AppError::Config(format!("IDENTITY_KEY: {e}")))?;

        let tracker = Arc::new(OrderTracker::new());
        let mut client_config = ClientConfig::new(&config.api_url);
        client_config.cancel_pace = config.cancel_pace;
        let client = Arc::new(ExchangeClient::new(client_config, identity, tracker)?);
        client.seed_position(config.initial_position);

        let engine = GridEngine::new(
            client.clone(),
            config.grid_config(),
            config.pace_config(),
            config.market_id,
        );
        let feed = KlinesFeed::new(&config.klines_url)?;
        let indicators = IndicatorEngine::new(
            feed,
            config.indicator_symbol.clone(),
            config.indicator_timeframe.clone(),
        );
        let gate = RegimeGate::new(config.regime_config());

        Ok(Self {
            config,
            client,
            engine,
            indicators,
            gate,
        })
    }

    /// Run until a shutdown signal, then withdraw from the venue.
    pub async fn run(mut self) -> AppResult<()> {
        // startup session; a signature rejection here is fatal
        self.client.ensure_session().await?;
        info!(
            symbol = %self.config.symbol,
            market_id = self.config.market_id,
            interval = ?self.config.cycle_interval,
            "grid bot running"
        );

        let mut ticker = tokio::time::interval(self.config.cycle_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match AssertUnwindSafe(self.tick()).catch_unwind().await {
                        Ok(Ok(())) => {}
                        // a rejected identity signature cannot heal
                        Ok(Err(e)) if is_auth_failure(&e) => {
                            error!(error = %e, "identity rejected by venue; shutting down");
                            self.terminal_sequence().await;
                            return Err(e);
                        }
                        Ok(Err(e)) => {
                            error!(
                                error = %e,
                                backoff = ?self.config.backoff,
                                "tick failed; backing off"
                            );
                            tokio::time::sleep(self.config.backoff).await;
                        }
                        Err(panic) => {
                            error!(
                                panic = panic_message(&panic),
                                backoff = ?self.config.backoff,
                                "tick panicked; backing off"
                            );
                            tokio::time::sleep(self.config.backoff).await;
                        }
                    }
                }
                _ = &mut shutdown => {
                    info!("shutdown signal received");
                    break;
                }
            }
        }

        self.terminal_sequence().await;
        Ok(())
    }

    /// One tick of the pipeline.
    async fn tick(&mut self) -> AppResult<()> {
        let now = Utc::now();

        // 1. active cool-down: keep the book clear and the position flat
        if let Some(cooldown) = self.gate.poll_cooldown(now) {
            let reason = cooldown.reason.clone();
            let exit_at = cooldown.exit_at;
            info!(%reason, %exit_at, "cool-down active: withdrawing ladder");
            let position = self.position();
            self.engine.suspend(position).await?;
            return Ok(());
        }

        // 2. indicators; an unavailable feed denies admission without
        //    touching cool-down state
        let snapshot = match self.indicators.read().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "indicators unavailable; denying admission this tick");
                return Ok(());
            }
        };

        // 3. regime gate
        let verdict = self.gate.evaluate(now, snapshot.rsi, snapshot.adx);
        if verdict.trigger_cooldown {
            warn!(
                reason = verdict.reason.as_deref().unwrap_or(""),
                rsi = snapshot.rsi,
                adx = snapshot.adx,
                "regime rejected: cancelling and flattening"
            );
            let position = self.position();
            self.engine.suspend(position).await?;
            return Ok(());
        }
        if !verdict.admit {
            info!(reason = verdict.reason.as_deref().unwrap_or(""), "admission denied");
            return Ok(());
        }
        if verdict.cautious {
            debug!(regime = %verdict.regime, "trending regime: quoting with care");
        }

        // 4. admitted: refresh the session opportunistically, rebuild
        //    the ladder
        self.client.ensure_session().await?;
        let position = self.position();
        self.engine.run_cycle(position).await?;
        Ok(())
    }

    fn position(&self) -> Decimal {
        self.client
            .position()
            .unwrap_or(self.config.initial_position)
    }

    /// Best-effort terminal sequence: cancel all open orders and, if
    /// configured, flatten the position. Bounded retries.
    async fn terminal_sequence(&self) {
        info!(
            flatten = self.config.flatten_on_exit,
            "terminal sequence: withdrawing from the venue"
        );
        for attempt in 1..=TERMINAL_ATTEMPTS {
            match self.terminal_once().await {
                Ok(()) => {
                    let (filled, cancelled) = self.client.tracker().history_counts();
                    info!(filled, cancelled, "terminal sequence complete");
                    return;
                }
                Err(e) if attempt < TERMINAL_ATTEMPTS => {
                    warn!(error = %e, attempt, "terminal sequence failed; retrying");
                    tokio::time::sleep(std::time::Duration::from_secs(2)).await;
                }
                Err(e) => {
                    error!(
                        error = %e,
                        "terminal sequence failed; outstanding orders must be cancelled out-of-band"
                    );
                }
            }
        }
    }

    async fn terminal_once(&self) -> AppResult<()> {
        if self.config.flatten_on_exit {
            self.engine.suspend(self.position()).await?;
        } else {
            self.client.cancel_all().await?;
        }
        Ok(())
    }
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                warn!(error = %e, "SIGTERM handler unavailable; handling SIGINT only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
    }
}

/// Whether an error is a signature rejection, at any nesting depth.
/// Session creation signs with the long-lived identity key, so this
/// cannot be healed by retrying.
fn is_auth_failure(error: &AppError) -> bool {
    use zo_exchange::ExchangeError;
    matches!(
        error,
        AppError::Exchange(ExchangeError::AuthFailure(_))
            | AppError::Grid(zo_grid::GridError::Exchange(ExchangeError::AuthFailure(_)))
    )
}

fn panic_message(panic: &Box<dyn std::any::Any + Send>) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}
