//! Depth snapshot sampling
//!
//! Converts the live book into a compact, bounded view: up to `depth`
//! levels per side, best-first, real prices. Sampling is coalescing by
//! construction: the sampler always reads the current book state and never
//! queues stale views.

use orderbook::OrderBook;
use serde::{Deserialize, Serialize};
use types::order::Side;
use types::tick::TickGrid;

/// A bounded-depth view of the book at a point in time.
///
/// `bids` descend and `asks` ascend by price, both best-first. This struct
/// is also the wire schema: field order and names are part of the format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepthSnapshot {
    /// Monotonic capture time (nanoseconds)
    pub ts: u64,
    /// Strictly increasing per sampler, never reused
    pub seq: u64,
    /// `[price, size]` pairs, highest bid first
    pub bids: Vec<(f64, u64)>,
    /// `[price, size]` pairs, lowest ask first
    pub asks: Vec<(f64, u64)>,
}

/// Samples the book at a bounded depth, stamping each snapshot with a
/// monotonically increasing sequence number.
pub struct SnapshotSampler {
    depth: usize,
    seq: u64,
    grid: TickGrid,
}

impl SnapshotSampler {
    pub fn new(depth: usize, grid: TickGrid) -> Self {
        Self {
            depth,
            seq: 0,
            grid,
        }
    }

    /// Capture the current book state.
    pub fn sample(&mut self, book: &OrderBook, ts: u64) -> DepthSnapshot {
        self.seq += 1;

        let to_price = |(tick, size): (i64, u64)| (self.grid.tick_to_price(tick), size);
        DepthSnapshot {
            ts,
            seq: self.seq,
            bids: book.depth(Side::Bid, self.depth).into_iter().map(to_price).collect(),
            asks: book.depth(Side::Ask, self.depth).into_iter().map(to_price).collect(),
        }
    }

    /// Last issued sequence number.
    pub fn seq(&self) -> u64 {
        self.seq
    }
}
