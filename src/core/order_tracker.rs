//! In-memory book of the grid orders a session believes are resting

use crate::core::types::{OrderId, OrderSide};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

/// A grid order that was accepted by the gateway
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackedOrder {
    pub order_id: OrderId,
    pub side: OrderSide,
    pub price: f64,
    pub grid_level: usize,
    pub quantity: f64,
}

/// Maps order id to metadata for one session.
///
/// Ordered by id so reconciliation processes orders in placement order.
#[derive(Debug, Default, Clone)]
pub struct OrderTracker {
    orders: BTreeMap<OrderId, TrackedOrder>,
}

impl OrderTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a freshly placed order. Returns the previous entry if the id was reused.
    pub fn insert(&mut self, order: TrackedOrder) -> Option<TrackedOrder> {
        self.orders.insert(order.order_id, order)
    }

    pub fn remove(&mut self, order_id: OrderId) -> Option<TrackedOrder> {
        self.orders.remove(&order_id)
    }

    pub fn get(&self, order_id: OrderId) -> Option<&TrackedOrder> {
        self.orders.get(&order_id)
    }

    pub fn contains(&self, order_id: OrderId) -> bool {
        self.orders.contains_key(&order_id)
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackedOrder> {
        self.orders.values()
    }

    /// Tracked ids that are absent from the exchange's open set.
    ///
    /// Absence is all the polling model can see, so a filled order, an order
    /// cancelled outside this process and a late rejection look the same here.
    pub fn missing_from(&self, open_ids: &HashSet<OrderId>) -> Vec<OrderId> {
        self.orders
            .keys()
            .filter(|id| !open_ids.contains(id))
            .copied()
            .collect()
    }

    pub fn count_by_side(&self, side: OrderSide) -> usize {
        self.orders.values().filter(|o| o.side == side).count()
    }

    pub fn orders_at_level(&self, grid_level: usize) -> usize {
        self.orders.values().filter(|o| o.grid_level == grid_level).count()
    }

    /// Remove and return every tracked order
    pub fn drain(&mut self) -> Vec<TrackedOrder> {
        std::mem::take(&mut self.orders).into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(id: u64, side: OrderSide, price: f64, level: usize) -> TrackedOrder {
        TrackedOrder {
            order_id: OrderId(id),
            side,
            price,
            grid_level: level,
            quantity: 0.001,
        }
    }

    fn tracker_with_ladder() -> OrderTracker {
        let mut tracker = OrderTracker::new();
        tracker.insert(order(1, OrderSide::Buy, 40_000.0, 0));
        tracker.insert(order(2, OrderSide::Buy, 42_000.0, 1));
        tracker.insert(order(3, OrderSide::Sell, 50_000.0, 2));
        tracker.insert(order(4, OrderSide::Sell, 48_000.0, 3));
        tracker
    }

    #[test]
    fn test_missing_from_open_set() {
        let tracker = tracker_with_ladder();
        let open: HashSet<OrderId> = [OrderId(1), OrderId(3), OrderId(99)].into_iter().collect();

        assert_eq!(tracker.missing_from(&open), vec![OrderId(2), OrderId(4)]);
    }

    #[test]
    fn test_everything_open_means_nothing_missing() {
        let tracker = tracker_with_ladder();
        let open: HashSet<OrderId> = tracker.iter().map(|o| o.order_id).collect();
        assert!(tracker.missing_from(&open).is_empty());
    }

    #[test]
    fn test_counts() {
        let tracker = tracker_with_ladder();
        assert_eq!(tracker.len(), 4);
        assert_eq!(tracker.count_by_side(OrderSide::Buy), 2);
        assert_eq!(tracker.count_by_side(OrderSide::Sell), 2);
        assert_eq!(tracker.orders_at_level(1), 1);
        assert_eq!(tracker.orders_at_level(7), 0);
    }

    #[test]
    fn test_remove_and_drain() {
        let mut tracker = tracker_with_ladder();
        let removed = tracker.remove(OrderId(2)).unwrap();
        assert_eq!(removed.grid_level, 1);
        assert!(!tracker.contains(OrderId(2)));
        assert!(tracker.remove(OrderId(2)).is_none());

        let drained = tracker.drain();
        assert_eq!(drained.len(), 3);
        assert!(tracker.is_empty());
        assert!(tracker.drain().is_empty());
    }
}
