//! Mean-reversion agent
//!
//! Fades large deviations from a slowly adapting anchor price with passive
//! limits: sells above the anchor, buys below, always behind the touch.

use rand_chacha::ChaCha8Rng;
use types::order::Side;

use super::{Agent, BookView, Intent, OrderSpec};

/// Anchor EWMA adaptation rate per tick.
const ANCHOR_ADAPT: f64 = 0.001;

/// Contrarian agent issuing passive limits against the trend.
pub struct MeanReversion {
    anchor: f64,
    /// Relative deviation required to act
    threshold: f64,
    size: u32,
    /// Ticks behind the mid the passive limit is placed
    passive_offset_ticks: i64,
}

impl MeanReversion {
    pub fn new(anchor: f64, threshold: f64, size: u32) -> Self {
        Self {
            anchor,
            threshold,
            size,
            passive_offset_ticks: 3,
        }
    }

    pub fn anchor(&self) -> f64 {
        self.anchor
    }
}

impl Agent for MeanReversion {
    fn name(&self) -> &'static str {
        "mean_reversion"
    }

    fn propose(&mut self, view: &BookView, _rng: &mut ChaCha8Rng) -> Vec<Intent> {
        // The anchor trails the mid slowly so multi-session drifts do not
        // leave the agent permanently one-sided
        self.anchor += ANCHOR_ADAPT * (view.mid_price - self.anchor);

        if self.anchor <= 0.0 {
            return Vec::new();
        }
        let deviation = (view.mid_price - self.anchor) / self.anchor;

        let (side, tick) = if deviation > self.threshold {
            // Price rich: offer above the mid
            (Side::Ask, view.mid_tick + self.passive_offset_ticks)
        } else if deviation < -self.threshold {
            // Price cheap: bid below the mid
            (Side::Bid, (view.mid_tick - self.passive_offset_ticks).max(1))
        } else {
            return Vec::new();
        };

        vec![Intent::Place(OrderSpec::limit(side, tick, self.size))]
    }
}
