//! Matching engine
//!
//! Price-time-priority limit order book over integer price ticks.
//!
//! **Key invariants:**
//! - Strict FIFO within a price level
//! - Trade price is always the maker's resting tick
//! - Best bid < best ask after any operation returns
//! - Aggregate level size equals the sum of queued order quantities
//! - No empty levels survive an operation

pub mod book;
pub mod engine;

pub use engine::{BookConfig, CancelledOrder, OrderBook, Resting, Submission};
