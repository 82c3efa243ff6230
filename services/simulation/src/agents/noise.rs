//! Noise agent
//!
//! Uniformly random side, size, and near-touch offset; occasionally pulls
//! its oldest resting order. Provides baseline two-sided flow.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use types::order::Side;

use super::{Agent, BookView, Intent, OrderSpec};

/// Random small orders around the mid.
pub struct Noise {
    max_size: u32,
    max_offset_ticks: i64,
    cancel_prob: f64,
    live: Vec<u64>,
}

impl Noise {
    pub fn new(max_size: u32, max_offset_ticks: i64) -> Self {
        Self {
            max_size,
            max_offset_ticks,
            cancel_prob: 0.15,
            live: Vec::new(),
        }
    }
}

impl Default for Noise {
    fn default() -> Self {
        Self::new(4, 6)
    }
}

impl Agent for Noise {
    fn name(&self) -> &'static str {
        "noise"
    }

    fn propose(&mut self, view: &BookView, rng: &mut ChaCha8Rng) -> Vec<Intent> {
        let mut intents = Vec::new();

        if !self.live.is_empty() && rng.gen::<f64>() < self.cancel_prob {
            intents.push(Intent::Cancel(self.live[0]));
        }

        let side = if rng.gen::<f64>() < 0.5 { Side::Bid } else { Side::Ask };
        let size = rng.gen_range(1..=self.max_size);
        let offset = rng.gen_range(1..=self.max_offset_ticks);
        let tick = match side {
            Side::Bid => (view.mid_tick - offset).max(1),
            Side::Ask => view.mid_tick + offset,
        };
        intents.push(Intent::Place(OrderSpec::limit(side, tick, size)));

        intents
    }

    fn on_order_placed(&mut self, order_id: u64, _side: Side, _price_tick: i64) {
        self.live.push(order_id);
    }

    fn on_order_removed(&mut self, order_id: u64) {
        self.live.retain(|id| *id != order_id);
    }
}
