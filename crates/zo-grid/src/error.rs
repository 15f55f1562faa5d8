//! Grid controller error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GridError {
    #[error(transparent)]
    Exchange(#[from] zo_exchange::ExchangeError),
}

pub type GridResult<T> = Result<T, GridError>;
