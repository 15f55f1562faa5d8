//! Exchange adapter for the zo venue.
//!
//! The venue accepts signed, varint-framed actions over HTTP and
//! returns framed receipts. It exposes no order-query endpoint; the
//! adapter therefore owns the authoritative local order tracker and
//! keeps it in lockstep with receipts.

pub mod client;
pub mod error;
pub mod session;

pub use client::{ClientConfig, ExchangeClient};
pub use error::{ExchangeError, ExchangeResult};
pub use session::{Session, SessionState, RENEW_BEFORE_SECS, SESSION_LIFETIME_SECS};
