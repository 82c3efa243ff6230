//! Price level implementation with FIFO queue
//!
//! A price level contains all resting orders sharing one `(side, tick)`.
//! Orders are maintained in FIFO order to enforce time priority; the
//! aggregate size is cached so top-of-book reads never scan the queue.

use std::collections::VecDeque;

/// A resting order inside a level queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestingOrder {
    pub id: u64,
    /// Remaining quantity; always positive while queued
    pub quantity: u32,
    pub timestamp: u64,
}

/// Result of consuming liquidity from the front of a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrontFill {
    /// Maker order that was hit
    pub id: u64,
    /// Quantity taken from the maker
    pub filled: u32,
    /// True when the maker was fully consumed and left the queue
    pub exhausted: bool,
}

/// One order affected by a head-of-queue bulk cancel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadCancel {
    pub id: u64,
    pub cancelled: u32,
    /// True when the order was removed entirely (not just reduced)
    pub removed: bool,
}

/// A FIFO queue of resting orders at a single price.
#[derive(Debug, Clone, Default)]
pub struct PriceLevel {
    orders: VecDeque<RestingOrder>,
    total: u64,
}

impl PriceLevel {
    pub fn new() -> Self {
        Self {
            orders: VecDeque::new(),
            total: 0,
        }
    }

    /// Append an order at the back of the queue (time priority).
    pub fn push_back(&mut self, order: RestingOrder) {
        self.total += u64::from(order.quantity);
        self.orders.push_back(order);
    }

    /// Peek at the front order without consuming it.
    pub fn peek_front(&self) -> Option<&RestingOrder> {
        self.orders.front()
    }

    /// Consume up to `max_qty` from the front order.
    ///
    /// Partial fills decrement the maker in place and leave it at the head
    /// of the queue. Returns None on an empty level.
    pub fn fill_front(&mut self, max_qty: u32) -> Option<FrontFill> {
        let front = self.orders.front_mut()?;
        let filled = max_qty.min(front.quantity);
        let id = front.id;
        front.quantity -= filled;
        self.total -= u64::from(filled);

        let exhausted = front.quantity == 0;
        if exhausted {
            self.orders.pop_front();
        }
        Some(FrontFill {
            id,
            filled,
            exhausted,
        })
    }

    /// Remove an order by id, preserving the relative order of the rest.
    ///
    /// Returns the removed order's remaining quantity, or None if the id is
    /// not queued at this level.
    pub fn remove(&mut self, id: u64) -> Option<u32> {
        let position = self.orders.iter().position(|o| o.id == id)?;
        let order = self.orders.remove(position)?;
        self.total -= u64::from(order.quantity);
        Some(order.quantity)
    }

    /// Cancel up to `max_qty` from the head of the queue.
    ///
    /// Whole orders are removed front-first; the last order touched may be
    /// partially reduced so that exactly `min(max_qty, level size)` is
    /// cancelled. Returns one record per affected order.
    pub fn cancel_from_head(&mut self, max_qty: u32) -> Vec<HeadCancel> {
        let mut budget = max_qty;
        let mut cancelled = Vec::new();

        while budget > 0 {
            let (front_id, front_qty) = match self.orders.front() {
                Some(o) => (o.id, o.quantity),
                None => break,
            };
            if front_qty <= budget {
                self.orders.pop_front();
                budget -= front_qty;
                self.total -= u64::from(front_qty);
                cancelled.push(HeadCancel {
                    id: front_id,
                    cancelled: front_qty,
                    removed: true,
                });
            } else {
                if let Some(front) = self.orders.front_mut() {
                    front.quantity -= budget;
                }
                self.total -= u64::from(budget);
                cancelled.push(HeadCancel {
                    id: front_id,
                    cancelled: budget,
                    removed: false,
                });
                budget = 0;
            }
        }

        cancelled
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Aggregate size: sum of queued order quantities.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Number of orders queued at this level.
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    /// Iterate the queue front-to-back.
    pub fn iter(&self) -> impl Iterator<Item = &RestingOrder> {
        self.orders.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(id: u64, qty: u32) -> RestingOrder {
        RestingOrder {
            id,
            quantity: qty,
            timestamp: id,
        }
    }

    #[test]
    fn test_push_updates_total() {
        let mut level = PriceLevel::new();
        level.push_back(order(1, 5));
        level.push_back(order(2, 7));

        assert_eq!(level.total(), 12);
        assert_eq!(level.order_count(), 2);
        assert!(!level.is_empty());
    }

    #[test]
    fn test_fifo_order_preserved() {
        let mut level = PriceLevel::new();
        level.push_back(order(1, 1));
        level.push_back(order(2, 2));
        level.push_back(order(3, 3));

        assert_eq!(level.peek_front().unwrap().id, 1);
        level.fill_front(1);
        assert_eq!(level.peek_front().unwrap().id, 2);
    }

    #[test]
    fn test_fill_front_partial_keeps_maker_at_head() {
        let mut level = PriceLevel::new();
        level.push_back(order(1, 10));

        let fill = level.fill_front(4).unwrap();
        assert_eq!(fill.id, 1);
        assert_eq!(fill.filled, 4);
        assert!(!fill.exhausted);
        assert_eq!(level.peek_front().unwrap().quantity, 6);
        assert_eq!(level.total(), 6);
    }

    #[test]
    fn test_fill_front_exhausts_and_pops() {
        let mut level = PriceLevel::new();
        level.push_back(order(1, 3));
        level.push_back(order(2, 5));

        let fill = level.fill_front(10).unwrap();
        assert_eq!(fill.filled, 3);
        assert!(fill.exhausted);
        assert_eq!(level.peek_front().unwrap().id, 2);
        assert_eq!(level.total(), 5);
    }

    #[test]
    fn test_remove_middle_preserves_relative_order() {
        let mut level = PriceLevel::new();
        level.push_back(order(1, 1));
        level.push_back(order(2, 2));
        level.push_back(order(3, 3));

        assert_eq!(level.remove(2), Some(2));
        let ids: Vec<u64> = level.iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(level.total(), 4);
    }

    #[test]
    fn test_remove_unknown_is_none() {
        let mut level = PriceLevel::new();
        level.push_back(order(1, 1));
        assert_eq!(level.remove(99), None);
        assert_eq!(level.total(), 1);
    }

    #[test]
    fn test_cancel_from_head_whole_orders() {
        let mut level = PriceLevel::new();
        level.push_back(order(1, 3));
        level.push_back(order(2, 4));

        let cancelled = level.cancel_from_head(7);
        assert_eq!(cancelled.len(), 2);
        assert!(cancelled.iter().all(|c| c.removed));
        assert!(level.is_empty());
        assert_eq!(level.total(), 0);
    }

    #[test]
    fn test_cancel_from_head_partial_last_order() {
        let mut level = PriceLevel::new();
        level.push_back(order(1, 3));
        level.push_back(order(2, 10));

        let cancelled = level.cancel_from_head(5);
        assert_eq!(cancelled[0], HeadCancel { id: 1, cancelled: 3, removed: true });
        assert_eq!(cancelled[1], HeadCancel { id: 2, cancelled: 2, removed: false });
        assert_eq!(level.peek_front().unwrap().quantity, 8);
        assert_eq!(level.total(), 8);
    }
}
