//! Authoritative local view of outstanding orders.
//!
//! The venue exposes no order-query endpoint, so the tracker is the
//! only record of what is resting on the book. It tolerates races with
//! fills: an order that disappears server-side is cleaned up when its
//! cancel comes back ORDER_NOT_FOUND.

pub mod tracker;

pub use tracker::{cent_bucket, OrderTracker, RemoveReason, PRICE_TOLERANCE};
