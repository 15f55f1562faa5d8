//! Order tracker: id-keyed primary map plus a (side, price-bucket)
//! secondary index.
//!
//! Both maps are mutated under one mutex, so they are consistent at
//! every public-call boundary. No operation suspends; callers in async
//! context never hold a guard across an await.
//!
//! The secondary index buckets prices to one cent. The grid controller
//! never intentionally places two same-side orders within one cent, so
//! the index holds at most one record per bucket; a violation is logged
//! and the newer order wins the bucket (the primary map keeps both).

use std::collections::HashMap;

use parking_lot::Mutex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use zo_core::{ClientOrderId, Order, OrderSide, OrderState, Price};

/// Price tolerance for lookups, in quote units: one cent.
pub const PRICE_TOLERANCE: &str = "0.01";

/// Bounded history of removed orders.
const MAX_HISTORY: usize = 1000;

/// Why an order left the open set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoveReason {
    Cancelled,
    /// Cancel came back ORDER_NOT_FOUND: the order had already filled.
    Filled,
}

/// Map a price to its one-cent bucket key.
pub fn cent_bucket(price: Price) -> i64 {
    (price.inner() * Decimal::ONE_HUNDRED)
        .round()
        .to_i64()
        .unwrap_or(i64::MAX)
}

#[derive(Default)]
struct TrackerState {
    /// Primary index: exactly one record per id.
    by_id: HashMap<ClientOrderId, Order>,
    /// Secondary index: (side, cent bucket) -> id.
    by_price: HashMap<(OrderSide, i64), ClientOrderId>,
    /// Removed orders, oldest first, bounded.
    history: Vec<(Order, RemoveReason)>,
}

/// Local order book. Serialized internally; cheap to share behind an
/// `Arc`.
#[derive(Default)]
pub struct OrderTracker {
    state: Mutex<TrackerState>,
}

impl OrderTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a freshly placed order.
    pub fn add(&self, order: Order) {
        let mut state = self.state.lock();
        let bucket = (order.side, cent_bucket(order.price));
        if let Some(existing) = state.by_price.insert(bucket, order.id) {
            // controller invariant: one order per side per cent
            warn!(
                existing = %existing,
                new = %order.id,
                side = %order.side,
                price = %order.price,
                "duplicate order in price bucket; newer order takes the index slot"
            );
        }
        debug!(id = %order.id, side = %order.side, price = %order.price, size = %order.size, "tracking order");
        state.by_id.insert(order.id, order);
    }

    /// Remove an order, moving it to history. Returns the record if it
    /// was being tracked.
    pub fn remove(&self, id: ClientOrderId, reason: RemoveReason) -> Option<Order> {
        let mut state = self.state.lock();
        let mut order = state.by_id.remove(&id)?;
        let bucket = (order.side, cent_bucket(order.price));
        // only clear the bucket if it still points at this order
        if state.by_price.get(&bucket) == Some(&id) {
            state.by_price.remove(&bucket);
        }
        order.state = OrderState::Done;
        debug!(id = %id, ?reason, "order removed from tracking");
        state.history.push((order.clone(), reason));
        if state.history.len() > MAX_HISTORY {
            state.history.remove(0);
        }
        Some(order)
    }

    /// Whether an id is currently tracked as open.
    pub fn contains(&self, id: ClientOrderId) -> bool {
        self.state.lock().by_id.contains_key(&id)
    }

    /// First open order on `side` within one cent of `price`.
    pub fn find_by_price(&self, side: OrderSide, price: Price) -> Option<Order> {
        let state = self.state.lock();
        if let Some(id) = state.by_price.get(&(side, cent_bucket(price))) {
            return state.by_id.get(id).cloned();
        }
        // bucket boundaries: fall back to a tolerance scan
        let tolerance: Decimal = PRICE_TOLERANCE.parse().expect("const tolerance parses");
        state
            .by_id
            .values()
            .find(|o| o.side == side && (o.price.inner() - price.inner()).abs() <= tolerance)
            .cloned()
    }

    /// Snapshot of all open orders, unordered.
    pub fn list_open(&self) -> Vec<Order> {
        self.state.lock().by_id.values().cloned().collect()
    }

    /// Snapshot of open orders on one side, sorted by price ascending.
    pub fn list_side(&self, side: OrderSide) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .state
            .lock()
            .by_id
            .values()
            .filter(|o| o.side == side)
            .cloned()
            .collect();
        orders.sort_by_key(|o| o.price);
        orders
    }

    /// Number of open orders.
    pub fn open_count(&self) -> usize {
        self.state.lock().by_id.len()
    }

    /// Count of removed orders by reason, for the shutdown report.
    pub fn history_counts(&self) -> (usize, usize) {
        let state = self.state.lock();
        let filled = state
            .history
            .iter()
            .filter(|(_, r)| *r == RemoveReason::Filled)
            .count();
        (filled, state.history.len() - filled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use zo_core::Size;

    fn order(id: u32, side: OrderSide, price: Decimal) -> Order {
        Order::open(
            ClientOrderId::new(id).unwrap(),
            0,
            side,
            Price::new(price),
            Size::new(dec!(0.001)),
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn test_add_remove_round_trip() {
        let tracker = OrderTracker::new();
        let o = order(1, OrderSide::Buy, dec!(69995));
        tracker.add(o.clone());

        assert!(tracker.contains(o.id));
        assert_eq!(tracker.open_count(), 1);

        let removed = tracker.remove(o.id, RemoveReason::Cancelled).unwrap();
        assert_eq!(removed.state, OrderState::Done);
        assert!(!tracker.contains(o.id));
        assert_eq!(tracker.open_count(), 0);
    }

    #[test]
    fn test_remove_unknown_id_is_none() {
        let tracker = OrderTracker::new();
        assert!(tracker
            .remove(ClientOrderId::new(99).unwrap(), RemoveReason::Filled)
            .is_none());
    }

    #[test]
    fn test_id_index_size_equals_adds_minus_removes() {
        let tracker = OrderTracker::new();
        for i in 1..=10u32 {
            tracker.add(order(i, OrderSide::Sell, dec!(70000) + Decimal::from(i) * dec!(10)));
        }
        for i in 1..=4u32 {
            tracker.remove(ClientOrderId::new(i).unwrap(), RemoveReason::Cancelled);
        }
        assert_eq!(tracker.open_count(), 10 - 4);
    }

    #[test]
    fn test_find_by_price_within_tolerance() {
        let tracker = OrderTracker::new();
        tracker.add(order(1, OrderSide::Buy, dec!(69995.00)));

        let hit = tracker.find_by_price(OrderSide::Buy, Price::new(dec!(69995.004)));
        assert_eq!(hit.unwrap().id.value(), 1);

        // wrong side misses
        assert!(tracker
            .find_by_price(OrderSide::Sell, Price::new(dec!(69995.00)))
            .is_none());

        // more than a cent away misses
        assert!(tracker
            .find_by_price(OrderSide::Buy, Price::new(dec!(69995.02)))
            .is_none());
    }

    #[test]
    fn test_price_index_consistent_after_remove() {
        let tracker = OrderTracker::new();
        let o = order(1, OrderSide::Sell, dec!(70015));
        tracker.add(o.clone());
        tracker.remove(o.id, RemoveReason::Filled);

        assert!(tracker
            .find_by_price(OrderSide::Sell, Price::new(dec!(70015)))
            .is_none());

        // bucket is free again for a new order
        let o2 = order(2, OrderSide::Sell, dec!(70015));
        tracker.add(o2);
        assert_eq!(
            tracker
                .find_by_price(OrderSide::Sell, Price::new(dec!(70015)))
                .unwrap()
                .id
                .value(),
            2
        );
    }

    #[test]
    fn test_list_side_sorted() {
        let tracker = OrderTracker::new();
        tracker.add(order(1, OrderSide::Buy, dec!(69985)));
        tracker.add(order(2, OrderSide::Buy, dec!(69995)));
        tracker.add(order(3, OrderSide::Sell, dec!(70015)));

        let buys = tracker.list_side(OrderSide::Buy);
        assert_eq!(buys.len(), 2);
        assert!(buys[0].price < buys[1].price);
        assert_eq!(tracker.list_side(OrderSide::Sell).len(), 1);
    }

    #[test]
    fn test_history_counts() {
        let tracker = OrderTracker::new();
        tracker.add(order(1, OrderSide::Buy, dec!(69985)));
        tracker.add(order(2, OrderSide::Buy, dec!(69975)));
        tracker.remove(ClientOrderId::new(1).unwrap(), RemoveReason::Filled);
        tracker.remove(ClientOrderId::new(2).unwrap(), RemoveReason::Cancelled);

        assert_eq!(tracker.history_counts(), (1, 1));
    }

    #[test]
    fn test_cent_bucket_boundaries() {
        assert_eq!(cent_bucket(Price::new(dec!(70015))), 7_001_500);
        assert_eq!(cent_bucket(Price::new(dec!(70015.004))), 7_001_500);
        assert_ne!(
            cent_bucket(Price::new(dec!(70015.00))),
            cent_bucket(Price::new(dec!(70015.02)))
        );
    }
}
