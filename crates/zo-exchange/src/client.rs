//! The exchange client: frames, signs and posts actions, decodes
//! receipts, and keeps the local tracker in lockstep.
//!
//! All shared state (session record, position heartbeat) sits behind
//! short-lived mutexes that are never held across an await.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::{debug, info, warn};

use zo_core::{ClientOrderId, MarketId, Order, OrderSide, Price, Size, WIRE_SCALE};
use zo_orders::{OrderTracker, RemoveReason};
use zo_wire::{
    frame_payload, read_frame, seal_frame, Action, ActionKind, CancelOrder, CreateSession,
    ErrCode, FillMode, IdentityKey, PlaceOrder, Receipt, ReceiptBody, SessionKeypair, WireSide,
};

use crate::error::{ExchangeError, ExchangeResult};
use crate::session::{Session, SessionState, SESSION_LIFETIME_SECS};

/// Default deadline for every venue request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default spacing between consecutive cancels in `cancel_all`, so a
/// full withdrawal does not hammer the venue rate limiter.
const CANCEL_PACE: Duration = Duration::from_millis(500);

/// Client construction parameters.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: String,
    pub request_timeout: Duration,
    /// Spacing between consecutive cancels in `cancel_all`. Zero
    /// disables the delay.
    pub cancel_pace: Duration,
}

impl ClientConfig {
    pub fn new(api_url: impl Into<String>) -> Self {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        Self {
            api_url,
            request_timeout: REQUEST_TIMEOUT,
            cancel_pace: CANCEL_PACE,
        }
    }
}

/// Process-wide venue adapter.
///
/// Owns the session record exclusively; the order tracker is shared
/// with the grid controller, which only reads it.
pub struct ExchangeClient {
    http: reqwest::Client,
    api_url: String,
    cancel_pace: Duration,
    identity: IdentityKey,
    session: Mutex<SessionState>,
    tracker: Arc<OrderTracker>,
    /// Latest signed position seen in a receipt heartbeat.
    last_position: Mutex<Option<Decimal>>,
}

impl ExchangeClient {
    pub fn new(
        config: ClientConfig,
        identity: IdentityKey,
        tracker: Arc<OrderTracker>,
    ) -> ExchangeResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ExchangeError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            api_url: config.api_url,
            cancel_pace: config.cancel_pace,
            identity,
            session: Mutex::new(SessionState::None),
            tracker,
            last_position: Mutex::new(None),
        })
    }

    pub fn tracker(&self) -> &Arc<OrderTracker> {
        &self.tracker
    }

    // ------------------------------------------------------------------
    // Session lifecycle
    // ------------------------------------------------------------------

    /// Idempotent: no-op while a live, non-near-expiry session exists;
    /// otherwise performs create_session with the identity key.
    pub async fn ensure_session(&self) -> ExchangeResult<()> {
        let now = Utc::now();
        {
            let mut state = self.session.lock();
            match &*state {
                SessionState::Live(s) if !s.needs_renewal(now) => return Ok(()),
                SessionState::Live(s) => {
                    debug!(session_id = s.id, expires_at = %s.expires_at, "session near expiry, renewing");
                    let old = s.clone();
                    *state = SessionState::Expiring(old);
                }
                SessionState::Expiring(_) => {}
                SessionState::None | SessionState::Creating => {
                    *state = SessionState::Creating;
                }
            }
        }

        match self.create_session().await {
            Ok(session) => {
                info!(
                    session_id = session.id,
                    expires_at = %session.expires_at,
                    "trading session established"
                );
                *self.session.lock() = SessionState::Live(session);
                Ok(())
            }
            Err(e) => {
                *self.session.lock() = SessionState::None;
                Err(e)
            }
        }
    }

    /// Drop the current session; the next action will create a fresh
    /// one.
    pub fn invalidate_session(&self) {
        *self.session.lock() = SessionState::None;
    }

    /// Whether a live session currently exists (renewal not checked).
    pub fn has_live_session(&self) -> bool {
        self.session.lock().is_live()
    }

    async fn create_session(&self) -> ExchangeResult<Session> {
        // fresh keypair per session avoids DUPLICATE_SESSION on re-create
        let keypair = SessionKeypair::generate();
        let server_time = self.server_time().await;
        let expiry_timestamp = server_time + SESSION_LIFETIME_SECS;

        let action = Action {
            current_timestamp: server_time,
            nonce: action_nonce(),
            kind: ActionKind::CreateSession(CreateSession {
                user_pubkey: self.identity.public_key_bytes(),
                session_pubkey: keypair.public_key_bytes(),
                expiry_timestamp,
            }),
        };

        let framed = frame_payload(&action.encode());
        let signature = self.identity.user_sign(&framed);
        let receipt = self.post_frame(seal_frame(framed, signature)).await?;

        match receipt.err {
            Some(ErrCode::SignatureInvalid) => {
                return Err(ExchangeError::AuthFailure(
                    "identity signature rejected at session creation".into(),
                ));
            }
            Some(code) => return Err(ExchangeError::Rejected(code)),
            None => {}
        }

        match receipt.body {
            Some(ReceiptBody::SessionCreated { session_id }) => Ok(Session {
                id: session_id,
                keypair,
                // expiry tracked on the local clock so renewal is not
                // fooled by venue clock skew
                expires_at: Utc::now() + chrono::Duration::seconds(SESSION_LIFETIME_SECS as i64),
            }),
            _ => Err(ExchangeError::UnexpectedReceipt(
                "create_session receipt without session id".into(),
            )),
        }
    }

    // ------------------------------------------------------------------
    // Orders
    // ------------------------------------------------------------------

    /// Place a post-only limit order. On success the order is recorded
    /// in the tracker and its client order id returned.
    pub async fn place_order(
        &self,
        market: MarketId,
        side: OrderSide,
        price: Price,
        size: Size,
    ) -> ExchangeResult<ClientOrderId> {
        let id = allocate_order_id(&self.tracker);
        let price_units = wire_price(price)?;
        let size_units = size.to_wire_units(side.sign())?;

        let receipt = self
            .signed_action(|session_id| {
                ActionKind::PlaceOrder(PlaceOrder {
                    session_id,
                    market_id: market,
                    side: wire_side(side),
                    fill_mode: FillMode::PostOnly,
                    reduce_only: false,
                    price_units,
                    size_units,
                    client_order_id: id.value(),
                })
            })
            .await?;

        if let Some(ReceiptBody::OrderPosted { order_id }) = receipt.body {
            if order_id != id.value() {
                warn!(sent = id.value(), echoed = order_id, "venue echoed a different order id");
            }
        }

        let order = Order::open(id, market, side, price, size, Utc::now())?;
        info!(id = %id, %side, %price, %size, "order resting");
        self.tracker.add(order);
        Ok(id)
    }

    /// Cancel an order by client id. `OrderNotFound` means the order
    /// had already filled; both outcomes clean up the tracker and
    /// return Ok.
    pub async fn cancel_order(&self, id: ClientOrderId) -> ExchangeResult<()> {
        let result = self
            .signed_action(|session_id| {
                ActionKind::CancelOrder(CancelOrder {
                    session_id,
                    order_id: id.value(),
                })
            })
            .await;

        match result {
            Ok(_) => {
                debug!(id = %id, "order cancelled");
                self.tracker.remove(id, RemoveReason::Cancelled);
                Ok(())
            }
            Err(ExchangeError::OrderNotFound) => {
                info!(id = %id, "cancel found no order: treating as filled");
                self.tracker.remove(id, RemoveReason::Filled);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Cancel every order the tracker believes is open, pacing
    /// consecutive cancels to stay under the venue rate limit.
    /// Returns the number of cancel actions issued.
    pub async fn cancel_all(&self) -> ExchangeResult<usize> {
        let open = self.tracker.list_open();
        let total = open.len();
        for (i, order) in open.into_iter().enumerate() {
            if i > 0 && !self.cancel_pace.is_zero() {
                tokio::time::sleep(self.cancel_pace).await;
            }
            self.cancel_order(order.id).await?;
        }
        if total > 0 {
            info!(count = total, "cancelled all open orders");
        }
        Ok(total)
    }

    /// Submit an immediate-or-cancel reduce-only order (the flatten
    /// path). Never recorded in the tracker: an IOC order cannot rest.
    pub async fn submit_ioc_reduce_only(
        &self,
        market: MarketId,
        side: OrderSide,
        price: Price,
        size: Size,
    ) -> ExchangeResult<()> {
        let id = allocate_order_id(&self.tracker);
        let price_units = wire_price(price)?;
        let size_units = size.to_wire_units(side.sign())?;

        self.signed_action(|session_id| {
            ActionKind::PlaceOrder(PlaceOrder {
                session_id,
                market_id: market,
                side: wire_side(side),
                fill_mode: FillMode::ImmediateOrCancel,
                reduce_only: true,
                price_units,
                size_units,
                client_order_id: id.value(),
            })
        })
        .await?;

        info!(%side, %price, %size, "reduce-only IOC submitted");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Market data
    // ------------------------------------------------------------------

    /// Current best bid and best ask.
    pub async fn get_top_of_book(&self, market: MarketId) -> ExchangeResult<(Price, Price)> {
        let url = format!("{}/market/{market}/orderbook", self.api_url);
        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ExchangeError::Transport(format!(
                "orderbook request returned HTTP {status}"
            )));
        }
        let doc: Value = response
            .json()
            .await
            .map_err(|e| ExchangeError::MarketData(format!("orderbook body unreadable: {e}")))?;

        let bid = best_price(&doc, "bids")?;
        let ask = best_price(&doc, "asks")?;
        Ok((bid, ask))
    }

    /// Venue clock in Unix seconds, falling back to the local clock
    /// when the endpoint is unreachable.
    pub async fn server_time(&self) -> u64 {
        match self.fetch_server_time().await {
            Ok(t) => t,
            Err(e) => {
                warn!(error = %e, "server time unavailable, using local clock");
                Utc::now().timestamp().max(0) as u64
            }
        }
    }

    async fn fetch_server_time(&self) -> ExchangeResult<u64> {
        let url = format!("{}/timestamp", self.api_url);
        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ExchangeError::Transport(format!(
                "timestamp request returned HTTP {status}"
            )));
        }
        let text = response.text().await?;
        text.trim()
            .parse()
            .map_err(|_| ExchangeError::MarketData(format!("unparseable timestamp: {text:?}")))
    }

    /// Latest position heartbeat observed in receipts, if any.
    pub fn position(&self) -> Option<Decimal> {
        *self.last_position.lock()
    }

    /// Seed the position cell if no heartbeat has arrived yet (used at
    /// startup with the configured initial position).
    pub fn seed_position(&self, position: Decimal) {
        let mut cell = self.last_position.lock();
        if cell.is_none() {
            *cell = Some(position);
        }
    }

    // ------------------------------------------------------------------
    // Plumbing
    // ------------------------------------------------------------------

    /// Run a session-signed action with the retry-once-on-expiry
    /// discipline: expiry (or a per-action signature rejection)
    /// invalidates the session, recreates it and retries exactly once.
    /// A second expiry within the same action is a hard failure.
    async fn signed_action<F>(&self, build: F) -> ExchangeResult<Receipt>
    where
        F: Fn(u64) -> ActionKind,
    {
        let first = self.try_signed_action(&build).await;
        let retryable = matches!(
            first,
            Err(ExchangeError::SessionExpired) | Err(ExchangeError::AuthFailure(_))
        );
        if !retryable {
            return first;
        }
        warn!("session rejected by venue; recreating and retrying once");
        self.invalidate_session();
        self.try_signed_action(&build).await
    }

    async fn try_signed_action<F>(&self, build: &F) -> ExchangeResult<Receipt>
    where
        F: Fn(u64) -> ActionKind,
    {
        self.ensure_session().await?;
        let session = self
            .session
            .lock()
            .usable()
            .cloned()
            .ok_or(ExchangeError::SessionExpired)?;

        let timestamp = self.server_time().await;
        let action = Action {
            current_timestamp: timestamp,
            nonce: action_nonce(),
            kind: build(session.id),
        };
        let framed = frame_payload(&action.encode());
        let signature = session.keypair.session_sign(&framed);
        let receipt = self.post_frame(seal_frame(framed, signature)).await?;
        map_receipt(receipt)
    }

    async fn post_frame(&self, body: Vec<u8>) -> ExchangeResult<Receipt> {
        let url = format!("{}/action", self.api_url);
        let response = self
            .http
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExchangeError::Transport(format!(
                "venue returned HTTP {status}"
            )));
        }
        let bytes = response.bytes().await?;
        let payload = read_frame(&bytes)?;
        let receipt = Receipt::decode(payload)?;

        if let Some(units) = receipt.position_units {
            let position = Decimal::new(units, WIRE_SCALE);
            debug!(%position, "position heartbeat");
            *self.last_position.lock() = Some(position);
        }
        Ok(receipt)
    }
}

/// Map a decoded receipt's error field onto adapter errors.
fn map_receipt(receipt: Receipt) -> ExchangeResult<Receipt> {
    match receipt.err {
        None => Ok(receipt),
        Some(code) if code.is_session_error() => Err(ExchangeError::SessionExpired),
        Some(ErrCode::SignatureInvalid) => Err(ExchangeError::AuthFailure(
            "venue rejected action signature".into(),
        )),
        Some(ErrCode::OrderNotFound) => Err(ExchangeError::OrderNotFound),
        Some(ErrCode::PostOnlyWouldMatch) => Err(ExchangeError::PostOnlyWouldMatch),
        Some(code) => Err(ExchangeError::Rejected(code)),
    }
}

/// Fresh client order id: microseconds since the epoch mod (2^31 - 1),
/// re-read until it collides with neither zero nor a tracked id.
fn allocate_order_id(tracker: &OrderTracker) -> ClientOrderId {
    loop {
        let micros = Utc::now().timestamp_micros();
        let raw = (micros.rem_euclid(i64::from(i32::MAX))) as u32;
        if let Ok(id) = ClientOrderId::new(raw) {
            if !tracker.contains(id) {
                return id;
            }
        }
    }
}

fn action_nonce() -> u64 {
    (Utc::now().timestamp_millis().rem_euclid(1_000_000)) as u64
}

fn wire_side(side: OrderSide) -> WireSide {
    match side {
        OrderSide::Buy => WireSide::Bid,
        OrderSide::Sell => WireSide::Ask,
    }
}

fn wire_price(price: Price) -> ExchangeResult<u64> {
    let units = price.to_wire_units()?;
    u64::try_from(units).map_err(|_| {
        ExchangeError::Core(zo_core::CoreError::InvalidPrice(format!(
            "price {price} is not positive on the wire"
        )))
    })
}

/// Best price from an orderbook document: `doc[side][0][0]`, numbers
/// or numeric strings accepted.
fn best_price(doc: &Value, side: &str) -> ExchangeResult<Price> {
    let levels = doc
        .get(side)
        .and_then(Value::as_array)
        .filter(|levels| !levels.is_empty())
        .ok_or_else(|| ExchangeError::MarketData(format!("orderbook has no {side}")))?;
    let first = levels[0]
        .as_array()
        .and_then(|level| level.first())
        .ok_or_else(|| ExchangeError::MarketData(format!("empty best level in {side}")))?;
    decimal_from_value(first).map(Price::new)
}

fn decimal_from_value(value: &Value) -> ExchangeResult<Decimal> {
    let text = match value {
        Value::String(s) => s.clone(),
        // round-trip through the JSON text keeps decimal digits exact
        Value::Number(n) => n.to_string(),
        other => {
            return Err(ExchangeError::MarketData(format!(
                "unexpected price field: {other}"
            )));
        }
    };
    text.parse()
        .map_err(|_| ExchangeError::MarketData(format!("unparseable price: {text:?}")))
}
