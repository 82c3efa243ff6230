//! Trading agents for synthetic order flow
//!
//! Agents never touch the book: they receive a read-only view and return
//! intents, which the generator applies. Each agent tracks the orders it
//! placed so cancellations are always owner-initiated.

pub mod market_maker;
pub mod mean_reversion;
pub mod momentum;
pub mod noise;

use rand_chacha::ChaCha8Rng;
use types::order::{OrderType, Side};
use types::tick::TickGrid;

pub use market_maker::{MarketMaker, MarketMakerConfig};
pub use mean_reversion::MeanReversion;
pub use momentum::Momentum;
pub use noise::Noise;

/// Read-only market state handed to agents each tick.
#[derive(Debug, Clone, Copy)]
pub struct BookView {
    /// Monotonic nanoseconds
    pub t: u64,
    pub mid_price: f64,
    pub mid_tick: i64,
    pub best_bid: Option<(i64, u64)>,
    pub best_ask: Option<(i64, u64)>,
    /// Rolling-return signal from the mid-price process
    pub momentum: f64,
    /// Current regime- and intraday-scaled relative volatility
    pub volatility: f64,
    pub grid: TickGrid,
}

/// A new order proposed by an agent; the generator assigns the id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderSpec {
    pub side: Side,
    pub kind: OrderType,
    /// Required for LIMIT, ignored for MARKET
    pub price_tick: Option<i64>,
    pub quantity: u32,
}

impl OrderSpec {
    pub fn limit(side: Side, price_tick: i64, quantity: u32) -> Self {
        Self {
            side,
            kind: OrderType::Limit,
            price_tick: Some(price_tick.max(1)),
            quantity,
        }
    }

    pub fn market(side: Side, quantity: u32) -> Self {
        Self {
            side,
            kind: OrderType::Market,
            price_tick: None,
            quantity,
        }
    }
}

/// An action an agent wants applied to the book.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Place(OrderSpec),
    /// Cancel one of the agent's own resting orders
    Cancel(u64),
}

/// A trading strategy polled once per generator tick.
///
/// Dispatch is flat; state is private to each agent. The notification
/// hooks keep inventory and live-order tracking owner-initiated.
pub trait Agent: Send {
    fn name(&self) -> &'static str;

    /// Propose zero or more intents for this tick.
    fn propose(&mut self, view: &BookView, rng: &mut ChaCha8Rng) -> Vec<Intent>;

    /// One of this agent's orders rested on the book.
    fn on_order_placed(&mut self, _order_id: u64, _side: Side, _price_tick: i64) {}

    /// One of this agent's resting orders left the book (filled or
    /// cancelled).
    fn on_order_removed(&mut self, _order_id: u64) {}

    /// One of this agent's orders was (partially) executed.
    fn on_fill(&mut self, _order_id: u64, _side: Side, _quantity: u32) {}
}
