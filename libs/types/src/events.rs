//! Trades and the per-order (L3) event feed
//!
//! The book reports executions as `Trade`s; the generator renders every
//! applied intent as an `L3Event`. Events are totally ordered by
//! `(ts, event_id)`.

use serde::{Deserialize, Serialize};

use crate::order::Side;

/// An executed trade.
///
/// The trade price is always the maker's resting price tick; quantity is
/// `min(taker_remaining, maker_remaining)` at match time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    /// Resting order consumed by the incoming order
    pub maker_id: u64,
    pub price_tick: i64,
    pub quantity: u32,
}

/// Per-order-granularity market event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum L3Event {
    /// A limit order (or remainder) was posted to the book
    Add {
        order_id: u64,
        side: Side,
        price_tick: i64,
        quantity: u32,
        ts: u64,
    },
    /// A resting order was (partially) consumed by an incoming order
    Execute {
        maker_id: u64,
        aggressor_side: Side,
        price_tick: i64,
        quantity: u32,
        ts: u64,
    },
    /// A resting order was removed before being filled
    Cancel {
        order_id: u64,
        side: Side,
        price_tick: i64,
        cancelled_quantity: u32,
        ts: u64,
    },
}

impl L3Event {
    /// Event timestamp (monotonic nanoseconds).
    pub fn ts(&self) -> u64 {
        match self {
            L3Event::Add { ts, .. } | L3Event::Execute { ts, .. } | L3Event::Cancel { ts, .. } => {
                *ts
            }
        }
    }

    /// The order id the event is about (maker id for executions).
    pub fn event_id(&self) -> u64 {
        match self {
            L3Event::Add { order_id, .. } | L3Event::Cancel { order_id, .. } => *order_id,
            L3Event::Execute { maker_id, .. } => *maker_id,
        }
    }

    /// Total-order sort key: timestamp, then id for ties.
    pub fn sort_key(&self) -> (u64, u64) {
        (self.ts(), self.event_id())
    }
}
