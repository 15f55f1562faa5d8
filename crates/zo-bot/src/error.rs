//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid or missing configuration. Fatal at startup.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Exchange(#[from] zo_exchange::ExchangeError),

    #[error(transparent)]
    Grid(#[from] zo_grid::GridError),

    #[error(transparent)]
    Signal(#[from] zo_signals::SignalError),
}

pub type AppResult<T> = Result<T, AppError>;
