//! Momentum agent
//!
//! Trades with the rolling-return signal: when it exceeds the threshold,
//! issues an aggressive limit on that side, priced through the touch so it
//! executes immediately against resting liquidity.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use types::order::Side;

use super::{Agent, BookView, Intent, OrderSpec};

/// Trend follower issuing aggressive limits.
pub struct Momentum {
    /// Momentum magnitude required to act
    threshold: f64,
    size: u32,
    /// Ticks through the opposite best the limit is priced
    aggression_ticks: i64,
    /// Probability of acting on a triggered signal each tick
    fire_prob: f64,
}

impl Momentum {
    pub fn new(threshold: f64, size: u32) -> Self {
        Self {
            threshold,
            size,
            aggression_ticks: 2,
            fire_prob: 0.5,
        }
    }
}

impl Default for Momentum {
    fn default() -> Self {
        Self::new(0.003, 5)
    }
}

impl Agent for Momentum {
    fn name(&self) -> &'static str {
        "momentum"
    }

    fn propose(&mut self, view: &BookView, rng: &mut ChaCha8Rng) -> Vec<Intent> {
        let side = if view.momentum > self.threshold {
            Side::Bid
        } else if view.momentum < -self.threshold {
            Side::Ask
        } else {
            return Vec::new();
        };

        if rng.gen::<f64>() >= self.fire_prob {
            return Vec::new();
        }

        // Cross the touch so the order is marketable on arrival
        let tick = match side {
            Side::Bid => match view.best_ask {
                Some((ask, _)) => ask + self.aggression_ticks,
                None => return Vec::new(),
            },
            Side::Ask => match view.best_bid {
                Some((bid, _)) => (bid - self.aggression_ticks).max(1),
                None => return Vec::new(),
            },
        };

        vec![Intent::Place(OrderSpec::limit(side, tick, self.size))]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use types::tick::TickGrid;

    fn view(momentum: f64) -> BookView {
        BookView {
            t: 0,
            mid_price: 10.0,
            mid_tick: 1000,
            best_bid: Some((998, 10)),
            best_ask: Some((1002, 10)),
            momentum,
            volatility: 0.005,
            grid: TickGrid::default(),
        }
    }

    fn fire_always() -> Momentum {
        Momentum {
            threshold: 0.003,
            size: 5,
            aggression_ticks: 2,
            fire_prob: 1.0,
        }
    }

    #[test]
    fn test_quiet_signal_does_nothing() {
        let mut agent = fire_always();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(agent.propose(&view(0.0), &mut rng).is_empty());
    }

    #[test]
    fn test_positive_momentum_buys_through_the_ask() {
        let mut agent = fire_always();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let intents = agent.propose(&view(0.01), &mut rng);

        match intents.as_slice() {
            [Intent::Place(spec)] => {
                assert_eq!(spec.side, Side::Bid);
                assert!(spec.price_tick.unwrap() > 1002);
            }
            other => panic!("unexpected intents: {other:?}"),
        }
    }

    #[test]
    fn test_negative_momentum_sells_through_the_bid() {
        let mut agent = fire_always();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let intents = agent.propose(&view(-0.01), &mut rng);

        match intents.as_slice() {
            [Intent::Place(spec)] => {
                assert_eq!(spec.side, Side::Ask);
                assert!(spec.price_tick.unwrap() < 998);
            }
            other => panic!("unexpected intents: {other:?}"),
        }
    }

    #[test]
    fn test_no_opposite_best_no_order() {
        let mut agent = fire_always();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut v = view(0.01);
        v.best_ask = None;
        assert!(agent.propose(&v, &mut rng).is_empty());
    }
}
