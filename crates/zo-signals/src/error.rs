//! Signal error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignalError {
    /// The external feed could not produce candles this tick. The
    /// supervisor treats this as deny-admit with no cool-down change.
    #[error("Feed unavailable: {0}")]
    FeedUnavailable(String),

    #[error("Insufficient candle history: got {got}, need {need}")]
    InsufficientData { got: usize, need: usize },

    #[error("Malformed candle data: {0}")]
    MalformedData(String),
}

pub type SignalResult<T> = Result<T, SignalError>;
