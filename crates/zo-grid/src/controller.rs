//! Per-tick controller: diff the desired ladder against the tracker
//! and drive the adapter.
//!
//! Ordering discipline: cancels go out before places so the venue has
//! room to accept post-only orders; cancels run farthest-from-mid
//! first, places nearest-to-mid first so the book is visibly quoted as
//! fast as possible.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{debug, info, warn};

use zo_core::{MarketId, Order, OrderSide, Price, Size};
use zo_exchange::{ExchangeClient, ExchangeError};
use zo_orders::cent_bucket;

use crate::error::GridResult;
use crate::plan::{build_plan, GridConfig, GridPlan};

/// Positions smaller than this are dust and not worth flattening.
const POSITION_DUST: Decimal = dec!(0.0001);

/// Crossing margin for the flatten order: 0.5% through the book.
const FLATTEN_CROSS: Decimal = dec!(0.005);

/// Delays between venue actions, guarding the venue rate limiter.
/// A zero duration disables that delay.
#[derive(Debug, Clone)]
pub struct PaceConfig {
    /// Floor between consecutive order placements, tracked across
    /// ticks.
    pub min_order_interval: Duration,
    /// Sleep after each successful placement.
    pub order_cooldown: Duration,
    /// Spacing between consecutive cancels within one cycle.
    pub cancel_pace: Duration,
}

impl Default for PaceConfig {
    fn default() -> Self {
        Self {
            min_order_interval: Duration::from_millis(8000),
            order_cooldown: Duration::from_millis(4000),
            cancel_pace: Duration::from_millis(500),
        }
    }
}

impl PaceConfig {
    /// No delays at all; used by tests.
    pub fn unpaced() -> Self {
        Self {
            min_order_interval: Duration::ZERO,
            order_cooldown: Duration::ZERO,
            cancel_pace: Duration::ZERO,
        }
    }
}

async fn sleep_if(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

/// Actions required to move the book to the plan.
#[derive(Debug, Clone)]
pub struct LadderDiff {
    /// Open orders with no rung in the plan, farthest from mid first.
    pub cancels: Vec<Order>,
    /// Plan rungs with no open order, nearest to mid first.
    pub places: Vec<(OrderSide, Price)>,
}

/// What one admitted cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CycleReport {
    pub placed: usize,
    pub cancelled: usize,
    /// Post-only rejections dropped silently this cycle.
    pub dropped: usize,
}

/// Symmetric difference between the plan and the open ladder, bucketed
/// to one cent per side. Rungs present in both are left untouched.
pub fn diff_ladder(plan: &GridPlan, open: &[Order]) -> LadderDiff {
    let mut open_buckets: HashMap<(OrderSide, i64), &Order> = HashMap::new();
    for order in open {
        open_buckets.insert((order.side, cent_bucket(order.price)), order);
    }

    let target_buckets: HashMap<(OrderSide, i64), Price> = plan
        .sells
        .iter()
        .map(|&p| ((OrderSide::Sell, cent_bucket(p)), p))
        .chain(plan.buys.iter().map(|&p| ((OrderSide::Buy, cent_bucket(p)), p)))
        .collect();

    let mut cancels: Vec<Order> = open
        .iter()
        .filter(|o| !target_buckets.contains_key(&(o.side, cent_bucket(o.price))))
        .cloned()
        .collect();
    // farthest from mid first: frees the most displaced rungs early
    cancels.sort_by(|a, b| {
        let da = (a.price.inner() - plan.mid.inner()).abs();
        let db = (b.price.inner() - plan.mid.inner()).abs();
        db.cmp(&da)
    });

    let mut places: Vec<(OrderSide, Price)> = target_buckets
        .iter()
        .filter(|(key, _)| !open_buckets.contains_key(*key))
        .map(|(&(side, _), &price)| (side, price))
        .collect();
    // nearest to mid first: quote the touch as fast as possible
    places.sort_by(|a, b| {
        let da = (a.1.inner() - plan.mid.inner()).abs();
        let db = (b.1.inner() - plan.mid.inner()).abs();
        da.cmp(&db)
    });

    LadderDiff { cancels, places }
}

/// Drives the adapter from the plan each tick.
pub struct GridEngine {
    client: Arc<ExchangeClient>,
    config: GridConfig,
    pace: PaceConfig,
    market: MarketId,
    /// When the last order placement went out, across ticks.
    last_place_at: Option<Instant>,
}

impl GridEngine {
    pub fn new(
        client: Arc<ExchangeClient>,
        config: GridConfig,
        pace: PaceConfig,
        market: MarketId,
    ) -> Self {
        Self {
            client,
            config,
            pace,
            market,
            last_place_at: None,
        }
    }

    /// One admitted cycle: read the book, rebuild the ladder.
    pub async fn run_cycle(&mut self, position: Decimal) -> GridResult<CycleReport> {
        let (bid, ask) = self.client.get_top_of_book(self.market).await?;
        let plan = build_plan(bid, ask, position, &self.config);
        let open = self.client.tracker().list_open();
        let diff = diff_ladder(&plan, &open);

        debug!(
            %bid,
            %ask,
            mid = %plan.mid,
            open = open.len(),
            target = plan.sells.len() + plan.buys.len(),
            cancels = diff.cancels.len(),
            places = diff.places.len(),
            "ladder diff"
        );

        let mut report = CycleReport::default();

        for (i, order) in diff.cancels.iter().enumerate() {
            if i > 0 {
                sleep_if(self.pace.cancel_pace).await;
            }
            self.client.cancel_order(order.id).await?;
            report.cancelled += 1;
        }

        for &(side, price) in &diff.places {
            self.pace_placement().await;
            match self
                .client
                .place_order(self.market, side, price, self.config.order_size)
                .await
            {
                Ok(_) => {
                    self.last_place_at = Some(Instant::now());
                    report.placed += 1;
                    sleep_if(self.pace.order_cooldown).await;
                }
                Err(ExchangeError::PostOnlyWouldMatch) => {
                    // book moved under us; next tick re-quotes
                    debug!(%side, %price, "post-only would cross, dropped");
                    report.dropped += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }

        info!(
            placed = report.placed,
            cancelled = report.cancelled,
            dropped = report.dropped,
            resting = self.client.tracker().open_count(),
            "cycle complete"
        );
        Ok(report)
    }

    /// Wait out the placement floor: at least `min_order_interval`
    /// between consecutive placements, counted across ticks.
    async fn pace_placement(&self) {
        let Some(last) = self.last_place_at else {
            return;
        };
        if let Some(wait) = self.pace.min_order_interval.checked_sub(last.elapsed()) {
            if !wait.is_zero() {
                debug!(?wait, "pacing order placement");
                tokio::time::sleep(wait).await;
            }
        }
    }

    /// Denied-regime fallback and terminal path: cancel everything and
    /// flatten the position.
    pub async fn suspend(&self, position: Decimal) -> GridResult<()> {
        let cancelled = self.client.cancel_all().await?;
        if cancelled > 0 {
            info!(cancelled, "ladder withdrawn");
        }
        self.flatten(position).await
    }

    /// Close the position with an IOC reduce-only order priced through
    /// the book. Best-effort: a venue rejection (e.g. no position
    /// server-side) is logged, not propagated.
    async fn flatten(&self, position: Decimal) -> GridResult<()> {
        if position.abs() <= POSITION_DUST {
            debug!(%position, "no position to flatten");
            return Ok(());
        }

        let (bid, ask) = self.client.get_top_of_book(self.market).await?;
        let (side, raw_price) = if position > Decimal::ZERO {
            (OrderSide::Sell, bid * (Decimal::ONE - FLATTEN_CROSS))
        } else {
            (OrderSide::Buy, ask * (Decimal::ONE + FLATTEN_CROSS))
        };
        let price = raw_price.round_to_tick(self.config.price_tick);
        let close_size = Size::new(position.abs());

        warn!(%side, %price, size = %close_size, "flattening position");
        match self
            .client
            .submit_ioc_reduce_only(self.market, side, price, close_size)
            .await
        {
            Ok(()) => Ok(()),
            Err(ExchangeError::Rejected(code)) => {
                warn!(%code, "flatten rejected by venue; position may already be flat");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::build_plan;
    use chrono::Utc;
    use zo_core::ClientOrderId;

    fn config() -> GridConfig {
        GridConfig {
            total_orders: 18,
            window_percent: dec!(0.12),
            grid_spacing: dec!(10),
            safe_gap: dec!(5),
            order_size: Size::new(dec!(0.001)),
            max_multiplier: dec!(15),
            price_tick: Price::new(dec!(0.01)),
        }
    }

    fn open_order(id: u32, side: OrderSide, price: Decimal) -> Order {
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

    fn clean_plan() -> GridPlan {
        build_plan(
            Price::new(dec!(70000)),
            Price::new(dec!(70010)),
            Decimal::ZERO,
            &config(),
        )
    }

    #[test]
    fn test_pace_defaults_match_venue_throttle() {
        let pace = PaceConfig::default();
        assert_eq!(pace.min_order_interval, Duration::from_millis(8000));
        assert_eq!(pace.order_cooldown, Duration::from_millis(4000));
        assert_eq!(pace.cancel_pace, Duration::from_millis(500));

        let unpaced = PaceConfig::unpaced();
        assert!(unpaced.min_order_interval.is_zero());
        assert!(unpaced.order_cooldown.is_zero());
        assert!(unpaced.cancel_pace.is_zero());
    }

    #[test]
    fn test_empty_book_places_whole_ladder() {
        let plan = clean_plan();
        let diff = diff_ladder(&plan, &[]);
        assert!(diff.cancels.is_empty());
        assert_eq!(diff.places.len(), 18);
    }

    #[test]
    fn test_matching_orders_left_untouched() {
        let plan = clean_plan();
        let open = vec![
            open_order(1, OrderSide::Sell, dec!(70015)),
            open_order(2, OrderSide::Buy, dec!(69995)),
        ];
        let diff = diff_ladder(&plan, &open);
        assert!(diff.cancels.is_empty());
        assert_eq!(diff.places.len(), 16);
        assert!(!diff
            .places
            .iter()
            .any(|&(_, p)| p == Price::new(dec!(70015)) || p == Price::new(dec!(69995))));
    }

    #[test]
    fn test_sub_cent_drift_counts_as_matching() {
        let plan = clean_plan();
        // resting order four tenths of a cent off the rung
        let open = vec![open_order(1, OrderSide::Sell, dec!(70015.004))];
        let diff = diff_ladder(&plan, &open);
        assert!(diff.cancels.is_empty());
        assert_eq!(diff.places.len(), 17);
    }

    #[test]
    fn test_displaced_orders_cancelled_farthest_first() {
        let plan = clean_plan();
        let open = vec![
            open_order(1, OrderSide::Sell, dec!(70555)), // 550 from mid
            open_order(2, OrderSide::Buy, dec!(69200)),  // 805 from mid
            open_order(3, OrderSide::Sell, dec!(70205)), // 200 from mid
        ];
        let diff = diff_ladder(&plan, &open);
        let ids: Vec<u32> = diff.cancels.iter().map(|o| o.id.value()).collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }

    #[test]
    fn test_places_ordered_nearest_to_mid_first() {
        let plan = clean_plan();
        let diff = diff_ladder(&plan, &[]);

        // first two places are the touch rungs, then distance grows
        let first: Vec<Price> = diff.places[..2].iter().map(|&(_, p)| p).collect();
        assert!(first.contains(&Price::new(dec!(70015))));
        assert!(first.contains(&Price::new(dec!(69995))));

        let distances: Vec<Decimal> = diff
            .places
            .iter()
            .map(|&(_, p)| (p.inner() - plan.mid.inner()).abs())
            .collect();
        assert!(distances.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_wrong_side_at_same_price_is_not_a_match() {
        let plan = clean_plan();
        // a buy resting where a sell rung belongs
        let open = vec![open_order(1, OrderSide::Buy, dec!(70015))];
        let diff = diff_ladder(&plan, &open);
        assert_eq!(diff.cancels.len(), 1);
        assert_eq!(diff.places.len(), 18);
    }

    #[test]
    fn test_orders_outside_window_always_cancelled() {
        let plan = clean_plan();
        // stale rung from a much higher market, far outside the window
        let open = vec![open_order(1, OrderSide::Sell, dec!(80000))];
        let diff = diff_ladder(&plan, &open);
        assert_eq!(diff.cancels.len(), 1);
        assert_eq!(diff.cancels[0].id.value(), 1);
    }

    /// Applying the diff to the open set yields exactly the plan: the
    /// post-cycle tracker holds plan rungs only, all inside the window.
    #[test]
    fn test_applying_diff_reaches_the_plan() {
        let plan = clean_plan();
        let open = vec![
            open_order(1, OrderSide::Sell, dec!(70015)), // kept
            open_order(2, OrderSide::Sell, dec!(70555)), // displaced
            open_order(3, OrderSide::Buy, dec!(69915)),  // kept
        ];
        let diff = diff_ladder(&plan, &open);

        let cancelled: Vec<u32> = diff.cancels.iter().map(|o| o.id.value()).collect();
        let mut surviving: Vec<(OrderSide, i64)> = open
            .iter()
            .filter(|o| !cancelled.contains(&o.id.value()))
            .map(|o| (o.side, cent_bucket(o.price)))
            .collect();
        surviving.extend(diff.places.iter().map(|&(s, p)| (s, cent_bucket(p))));
        surviving.sort_by_key(|&(s, b)| (s.sign(), b));

        let mut want: Vec<(OrderSide, i64)> = plan
            .sells
            .iter()
            .map(|&p| (OrderSide::Sell, cent_bucket(p)))
            .chain(plan.buys.iter().map(|&p| (OrderSide::Buy, cent_bucket(p))))
            .collect();
        want.sort_by_key(|&(s, b)| (s.sign(), b));

        assert_eq!(surviving, want);
        for &(_, bucket) in &surviving {
            let price = Price::new(Decimal::new(bucket, 2));
            assert!(plan.contains_in_window(price));
        }
    }
}
