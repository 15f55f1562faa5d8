//! Wire error types.

use thiserror::Error;

/// Errors raised while framing or decoding wire messages.
#[derive(Debug, Error)]
pub enum WireError {
    /// Varint decode failure or payload length mismatch. Fatal for the
    /// tick that observed it.
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),
}

/// Result type alias for wire operations.
pub type Result<T> = std::result::Result<T, WireError>;
