//! Matching engine core
//!
//! Coordinates the bid/ask books, the order-id index, and the match loop.
//! All operations are total: valid inputs never panic, unknown cancel
//! targets are a no-op, and rejected orders leave no state behind.

use std::collections::HashMap;

use types::errors::OrderError;
use types::events::Trade;
use types::order::{Order, OrderType, Side};
use types::tick::TickGrid;

use crate::book::{AskBook, BidBook, RestingOrder};

/// Immutable engine configuration, fixed at construction.
#[derive(Debug, Clone, Copy)]
pub struct BookConfig {
    pub grid: TickGrid,
    /// Run a full invariant sweep after every mutation. Violations panic:
    /// they indicate programmer error, not input error.
    pub validate: bool,
}

impl Default for BookConfig {
    fn default() -> Self {
        Self {
            grid: TickGrid::default(),
            validate: false,
        }
    }
}

/// The resting remainder of a submitted limit order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resting {
    pub order_id: u64,
    pub side: Side,
    pub price_tick: i64,
    pub quantity: u32,
}

/// Outcome of submitting one order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Submission {
    /// Executions in match order (maker price, FIFO within level)
    pub trades: Vec<Trade>,
    /// Present when a limit remainder was posted to the book
    pub resting: Option<Resting>,
}

/// A resting order removed by a cancel operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancelledOrder {
    pub order_id: u64,
    pub side: Side,
    pub price_tick: i64,
    /// Quantity removed from the book
    pub quantity: u32,
}

/// Price-time-priority limit order book.
pub struct OrderBook {
    bids: BidBook,
    asks: AskBook,
    /// id → (side, tick); cancel-by-id never scans the book
    index: HashMap<u64, (Side, i64)>,
    config: BookConfig,
}

impl OrderBook {
    pub fn new(config: BookConfig) -> Self {
        Self {
            bids: BidBook::new(),
            asks: AskBook::new(),
            index: HashMap::new(),
            config,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(BookConfig::default())
    }

    pub fn grid(&self) -> TickGrid {
        self.config.grid
    }

    /// Submit an order: match the marketable portion, rest the remainder.
    ///
    /// MARKET orders walk the opposite side best-first and drop any unfilled
    /// remainder. LIMIT orders match while the opposite best is within their
    /// limit, then post what is left at `(side, price_tick)`.
    pub fn submit(&mut self, order: Order) -> Result<Submission, OrderError> {
        order.validate()?;

        let limit_tick = match order.kind {
            OrderType::Limit => order.price_tick,
            OrderType::Market => None,
        };

        let (trades, remaining) = match order.side {
            Side::Bid => self.match_against_asks(limit_tick, order.quantity),
            Side::Ask => self.match_against_bids(limit_tick, order.quantity),
        };

        let mut resting = None;
        if remaining > 0 && order.kind == OrderType::Limit {
            // limit_tick is present: validate() guarantees it for limits
            if let Some(tick) = limit_tick {
                let entry = RestingOrder {
                    id: order.id,
                    quantity: remaining,
                    timestamp: order.timestamp,
                };
                match order.side {
                    Side::Bid => self.bids.insert(tick, entry),
                    Side::Ask => self.asks.insert(tick, entry),
                }
                self.index.insert(order.id, (order.side, tick));
                resting = Some(Resting {
                    order_id: order.id,
                    side: order.side,
                    price_tick: tick,
                    quantity: remaining,
                });
            }
        }

        self.check_invariants();
        Ok(Submission { trades, resting })
    }

    /// Match an incoming bid against the ask side.
    ///
    /// Returns the executions and the unfilled remainder.
    fn match_against_asks(&mut self, limit_tick: Option<i64>, mut remaining: u32) -> (Vec<Trade>, u32) {
        let mut trades = Vec::new();

        while remaining > 0 {
            let Some(best_tick) = self.asks.best_tick() else {
                break;
            };
            if limit_tick.is_some_and(|limit| best_tick > limit) {
                break;
            }

            let mut exhausted_ids = Vec::new();
            if let Some(level) = self.asks.level_mut(best_tick) {
                while remaining > 0 {
                    let Some(fill) = level.fill_front(remaining) else {
                        break;
                    };
                    trades.push(Trade {
                        maker_id: fill.id,
                        price_tick: best_tick,
                        quantity: fill.filled,
                    });
                    remaining -= fill.filled;
                    if fill.exhausted {
                        exhausted_ids.push(fill.id);
                    }
                }
            }
            for id in exhausted_ids {
                self.index.remove(&id);
            }
            self.asks.drop_if_empty(best_tick);
        }

        (trades, remaining)
    }

    /// Match an incoming ask against the bid side.
    fn match_against_bids(&mut self, limit_tick: Option<i64>, mut remaining: u32) -> (Vec<Trade>, u32) {
        let mut trades = Vec::new();

        while remaining > 0 {
            let Some(best_tick) = self.bids.best_tick() else {
                break;
            };
            if limit_tick.is_some_and(|limit| best_tick < limit) {
                break;
            }

            let mut exhausted_ids = Vec::new();
            if let Some(level) = self.bids.level_mut(best_tick) {
                while remaining > 0 {
                    let Some(fill) = level.fill_front(remaining) else {
                        break;
                    };
                    trades.push(Trade {
                        maker_id: fill.id,
                        price_tick: best_tick,
                        quantity: fill.filled,
                    });
                    remaining -= fill.filled;
                    if fill.exhausted {
                        exhausted_ids.push(fill.id);
                    }
                }
            }
            for id in exhausted_ids {
                self.index.remove(&id);
            }
            self.bids.drop_if_empty(best_tick);
        }

        (trades, remaining)
    }

    /// Cancel a resting order by id.
    ///
    /// Unknown ids are a no-op and return None; callers treat that as a
    /// cancelled quantity of zero.
    pub fn cancel(&mut self, order_id: u64) -> Option<CancelledOrder> {
        let (side, tick) = self.index.remove(&order_id)?;
        let quantity = match side {
            Side::Bid => self.bids.remove_order(tick, order_id),
            Side::Ask => self.asks.remove_order(tick, order_id),
        }?;

        self.check_invariants();
        Some(CancelledOrder {
            order_id,
            side,
            price_tick: tick,
            quantity,
        })
    }

    /// Cancel up to `quantity` from the head of a price level.
    ///
    /// Operator-style bulk cancel: whole orders are removed front-first and
    /// the last order touched may be partially reduced.
    pub fn cancel_level(&mut self, side: Side, price_tick: i64, quantity: u32) -> Vec<CancelledOrder> {
        let head_cancels = match side {
            Side::Bid => self
                .bids
                .level_mut(price_tick)
                .map(|l| l.cancel_from_head(quantity))
                .unwrap_or_default(),
            Side::Ask => self
                .asks
                .level_mut(price_tick)
                .map(|l| l.cancel_from_head(quantity))
                .unwrap_or_default(),
        };

        for cancel in &head_cancels {
            if cancel.removed {
                self.index.remove(&cancel.id);
            }
        }
        match side {
            Side::Bid => self.bids.drop_if_empty(price_tick),
            Side::Ask => self.asks.drop_if_empty(price_tick),
        }

        self.check_invariants();
        head_cancels
            .into_iter()
            .map(|c| CancelledOrder {
                order_id: c.id,
                side,
                price_tick,
                quantity: c.cancelled,
            })
            .collect()
    }

    /// Best bid `(tick, aggregate size)`. O(1).
    pub fn best_bid(&self) -> Option<(i64, u64)> {
        self.bids.best()
    }

    /// Best ask `(tick, aggregate size)`. O(1).
    pub fn best_ask(&self) -> Option<(i64, u64)> {
        self.asks.best()
    }

    /// Up to `n` levels best-first as `(tick, aggregate size)`.
    pub fn depth(&self, side: Side, n: usize) -> Vec<(i64, u64)> {
        match side {
            Side::Bid => self.bids.depth(n),
            Side::Ask => self.asks.depth(n),
        }
    }

    /// Whether `order_id` is resting in the book.
    pub fn contains(&self, order_id: u64) -> bool {
        self.index.contains_key(&order_id)
    }

    /// Locate a resting order: `(side, tick)`.
    pub fn locate(&self, order_id: u64) -> Option<(Side, i64)> {
        self.index.get(&order_id).copied()
    }

    /// Number of resting orders across both sides.
    pub fn resting_orders(&self) -> usize {
        self.index.len()
    }

    /// Total resting volume on one side.
    pub fn total_volume(&self, side: Side) -> u64 {
        match side {
            Side::Bid => self.bids.total_volume(),
            Side::Ask => self.asks.total_volume(),
        }
    }

    /// All level ticks on one side, ascending.
    pub fn level_ticks(&self, side: Side) -> Vec<i64> {
        match side {
            Side::Bid => self.bids.ticks(),
            Side::Ask => self.asks.ticks(),
        }
    }

    fn check_invariants(&self) {
        if !self.config.validate {
            return;
        }

        if let (Some((bid, _)), Some((ask, _))) = (self.bids.best(), self.asks.best()) {
            assert!(bid < ask, "crossed book: best bid {bid} >= best ask {ask}");
        }

        let mut indexed = 0usize;
        for (tick, level) in self.bids.iter_levels() {
            assert!(!level.is_empty(), "empty bid level at {tick}");
            let sum: u64 = level.iter().map(|o| u64::from(o.quantity)).sum();
            assert_eq!(sum, level.total(), "bid level {tick} size desync");
            for order in level.iter() {
                assert_eq!(
                    self.index.get(&order.id),
                    Some(&(Side::Bid, *tick)),
                    "bid order {} missing from index",
                    order.id
                );
                indexed += 1;
            }
        }
        for (tick, level) in self.asks.iter_levels() {
            assert!(!level.is_empty(), "empty ask level at {tick}");
            let sum: u64 = level.iter().map(|o| u64::from(o.quantity)).sum();
            assert_eq!(sum, level.total(), "ask level {tick} size desync");
            for order in level.iter() {
                assert_eq!(
                    self.index.get(&order.id),
                    Some(&(Side::Ask, *tick)),
                    "ask order {} missing from index",
                    order.id
                );
                indexed += 1;
            }
        }
        assert_eq!(indexed, self.index.len(), "index holds stale order ids");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validated_book() -> OrderBook {
        OrderBook::new(BookConfig {
            grid: TickGrid::default(),
            validate: true,
        })
    }

    fn limit(id: u64, side: Side, tick: i64, qty: u32) -> Order {
        Order::limit(id, side, tick, qty, id).unwrap()
    }

    fn market(id: u64, side: Side, qty: u32) -> Order {
        Order::market(id, side, qty, id).unwrap()
    }

    #[test]
    fn test_empty_book_has_no_best() {
        let book = OrderBook::with_defaults();
        assert_eq!(book.best_bid(), None);
        assert_eq!(book.best_ask(), None);
    }

    #[test]
    fn test_market_on_empty_book_trades_nothing() {
        let mut book = validated_book();
        let result = book.submit(market(1, Side::Bid, 10)).unwrap();

        assert!(result.trades.is_empty());
        assert!(result.resting.is_none());
        assert_eq!(book.resting_orders(), 0);
    }

    #[test]
    fn test_non_crossing_limit_rests() {
        let mut book = validated_book();
        let result = book.submit(limit(1, Side::Bid, 1000, 5)).unwrap();

        assert!(result.trades.is_empty());
        assert_eq!(
            result.resting,
            Some(Resting {
                order_id: 1,
                side: Side::Bid,
                price_tick: 1000,
                quantity: 5
            })
        );
        assert_eq!(book.best_bid(), Some((1000, 5)));
    }

    #[test]
    fn test_fifo_consumption_at_same_price() {
        let mut book = validated_book();
        book.submit(limit(1, Side::Ask, 1000, 3)).unwrap();
        book.submit(limit(2, Side::Ask, 1000, 3)).unwrap();

        let result = book.submit(market(3, Side::Bid, 4)).unwrap();
        assert_eq!(
            result.trades,
            vec![
                Trade { maker_id: 1, price_tick: 1000, quantity: 3 },
                Trade { maker_id: 2, price_tick: 1000, quantity: 1 },
            ]
        );
        assert_eq!(book.best_ask(), Some((1000, 2)));
    }

    #[test]
    fn test_crossing_limit_trades_at_maker_price() {
        let mut book = validated_book();
        book.submit(limit(1, Side::Ask, 10000, 5)).unwrap();

        // Bid at 10100 hits the resting ask at 10000: trade prints at 10000
        let result = book.submit(limit(2, Side::Bid, 10100, 3)).unwrap();
        assert_eq!(
            result.trades,
            vec![Trade { maker_id: 1, price_tick: 10000, quantity: 3 }]
        );
        assert!(result.resting.is_none());
        assert_eq!(book.best_ask(), Some((10000, 2)));
    }

    #[test]
    fn test_crossing_limit_remainder_rests_on_own_side() {
        let mut book = validated_book();
        book.submit(limit(1, Side::Ask, 10000, 3)).unwrap();

        let result = book.submit(limit(2, Side::Bid, 10100, 5)).unwrap();
        assert_eq!(result.trades.len(), 1);
        assert_eq!(
            result.resting,
            Some(Resting {
                order_id: 2,
                side: Side::Bid,
                price_tick: 10100,
                quantity: 2
            })
        );
        assert_eq!(book.best_bid(), Some((10100, 2)));
        assert_eq!(book.best_ask(), None);
    }

    #[test]
    fn test_market_price_improvement_walk() {
        let mut book = validated_book();
        book.submit(limit(1, Side::Ask, 10000, 3)).unwrap();
        book.submit(limit(2, Side::Ask, 10100, 4)).unwrap();
        book.submit(limit(3, Side::Ask, 10200, 5)).unwrap();

        let result = book.submit(market(4, Side::Bid, 10)).unwrap();
        assert_eq!(
            result.trades,
            vec![
                Trade { maker_id: 1, price_tick: 10000, quantity: 3 },
                Trade { maker_id: 2, price_tick: 10100, quantity: 4 },
                Trade { maker_id: 3, price_tick: 10200, quantity: 3 },
            ]
        );
        assert_eq!(book.best_ask(), Some((10200, 2)));
    }

    #[test]
    fn test_market_remainder_is_dropped() {
        let mut book = validated_book();
        book.submit(limit(1, Side::Ask, 10000, 3)).unwrap();

        let result = book.submit(market(2, Side::Bid, 10)).unwrap();
        assert_eq!(result.trades.len(), 1);
        assert!(result.resting.is_none());
        assert_eq!(book.best_ask(), None);
        assert_eq!(book.resting_orders(), 0);
    }

    #[test]
    fn test_cancel_middle_of_queue() {
        let mut book = validated_book();
        book.submit(limit(1, Side::Bid, 1000, 1)).unwrap();
        book.submit(limit(2, Side::Bid, 1000, 2)).unwrap();
        book.submit(limit(3, Side::Bid, 1000, 3)).unwrap();

        let cancelled = book.cancel(2).unwrap();
        assert_eq!(cancelled.quantity, 2);
        assert_eq!(book.best_bid(), Some((1000, 4)));

        // Remaining orders keep their relative order
        let result = book.submit(market(4, Side::Ask, 1)).unwrap();
        assert_eq!(result.trades[0].maker_id, 1);
    }

    #[test]
    fn test_cancel_unknown_id_is_noop() {
        let mut book = validated_book();
        book.submit(limit(1, Side::Bid, 1000, 5)).unwrap();

        assert!(book.cancel(99).is_none());
        assert_eq!(book.best_bid(), Some((1000, 5)));

        // Re-cancelling a cancelled id is also a no-op
        assert!(book.cancel(1).is_some());
        assert!(book.cancel(1).is_none());
    }

    #[test]
    fn test_cancel_level_partial_budget() {
        let mut book = validated_book();
        book.submit(limit(1, Side::Ask, 1000, 3)).unwrap();
        book.submit(limit(2, Side::Ask, 1000, 10)).unwrap();

        let cancelled = book.cancel_level(Side::Ask, 1000, 5);
        let total: u32 = cancelled.iter().map(|c| c.quantity).sum();
        assert_eq!(total, 5);
        assert_eq!(book.best_ask(), Some((1000, 8)));
        // Order 1 fully cancelled, order 2 reduced but still indexed
        assert!(!book.contains(1));
        assert!(book.contains(2));
    }

    #[test]
    fn test_cancel_level_unknown_level_is_noop() {
        let mut book = validated_book();
        assert!(book.cancel_level(Side::Bid, 1234, 10).is_empty());
    }

    #[test]
    fn test_invalid_orders_leave_no_state() {
        let mut book = validated_book();
        let mut bad = limit(1, Side::Bid, 1000, 5);
        bad.quantity = 0;
        assert_eq!(book.submit(bad), Err(OrderError::InvalidQuantity));
        assert_eq!(book.resting_orders(), 0);
    }

    #[test]
    fn test_add_then_cancel_restores_book() {
        let mut book = validated_book();
        book.submit(limit(1, Side::Bid, 990, 4)).unwrap();
        let before_best = book.best_bid();
        let before_volume = book.total_volume(Side::Bid);

        book.submit(limit(2, Side::Bid, 1000, 7)).unwrap();
        book.cancel(2).unwrap();

        assert_eq!(book.best_bid(), before_best);
        assert_eq!(book.total_volume(Side::Bid), before_volume);
        assert_eq!(book.resting_orders(), 1);
    }
}
