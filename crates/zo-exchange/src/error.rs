//! Exchange error types.

use thiserror::Error;
use zo_wire::ErrCode;

#[derive(Debug, Error)]
pub enum ExchangeError {
    /// Signature verification rejected. Fatal at session creation;
    /// per-action it invalidates the session and retries once.
    #[error("Authentication failure: {0}")]
    AuthFailure(String),

    /// The venue signalled session expiry. Callers recreate the
    /// session and retry once; repeated expiry within one tick is a
    /// hard failure.
    #[error("Session expired")]
    SessionExpired,

    /// Cancel target unknown to the venue: the order already filled.
    /// Swallowed at cancel sites after cleaning up the tracker.
    #[error("Order not found")]
    OrderNotFound,

    /// Post-only order would have crossed the book. Swallowed at place
    /// sites; the next tick re-quotes from the then-current book.
    #[error("Post-only order would match")]
    PostOnlyWouldMatch,

    /// Timeout or network error.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Any other venue rejection.
    #[error("Venue rejected action: {0}")]
    Rejected(ErrCode),

    /// Orderbook or stats document missing expected fields.
    #[error("Malformed market data: {0}")]
    MarketData(String),

    /// Receipt decoded but did not carry the expected result branch.
    #[error("Unexpected receipt: {0}")]
    UnexpectedReceipt(String),

    #[error(transparent)]
    Wire(#[from] zo_wire::WireError),

    #[error(transparent)]
    Core(#[from] zo_core::CoreError),
}

impl From<reqwest::Error> for ExchangeError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

pub type ExchangeResult<T> = Result<T, ExchangeError>;
