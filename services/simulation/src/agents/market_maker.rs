//! Market maker agent — symmetric quoting, inventory management
//!
//! Targets a two-sided quote around the mid with a width derived from
//! current volatility, skewed against accumulated inventory. Quotes that
//! drift too far from the target are pulled and re-placed.

use rand_chacha::ChaCha8Rng;
use types::order::Side;

use super::{Agent, BookView, Intent, OrderSpec};

/// Configuration for the market maker.
#[derive(Debug, Clone, Copy)]
pub struct MarketMakerConfig {
    /// Half-spread floor, in ticks
    pub base_spread_ticks: i64,
    /// Quote size
    pub size: u32,
    /// Absolute net inventory limit; quoting stops beyond it
    pub max_inventory: i64,
    /// Re-quote when a live quote is this far from its target tick
    pub requote_distance_ticks: i64,
    /// Converts relative volatility into extra half-spread ticks
    pub vol_spread_scale: f64,
}

impl Default for MarketMakerConfig {
    fn default() -> Self {
        Self {
            base_spread_ticks: 2,
            size: 5,
            max_inventory: 60,
            requote_distance_ticks: 6,
            vol_spread_scale: 400.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct LiveQuote {
    id: u64,
    side: Side,
    tick: i64,
}

/// Two-sided quoting agent with inventory limits.
pub struct MarketMaker {
    config: MarketMakerConfig,
    /// Net position: positive after buying, negative after selling
    inventory: i64,
    live: Vec<LiveQuote>,
}

impl MarketMaker {
    pub fn new(config: MarketMakerConfig) -> Self {
        Self {
            config,
            inventory: 0,
            live: Vec::new(),
        }
    }

    pub fn inventory(&self) -> i64 {
        self.inventory
    }

    /// Half-spread in ticks for the current volatility.
    fn half_spread(&self, volatility: f64) -> i64 {
        let vol_ticks = (volatility * self.config.vol_spread_scale).round() as i64;
        self.config.base_spread_ticks + vol_ticks.max(0)
    }

    /// Inventory skew in ticks: long inventory shifts both quotes down to
    /// encourage sells, short inventory shifts them up.
    fn skew(&self) -> i64 {
        if self.config.max_inventory == 0 {
            return 0;
        }
        (self.inventory * self.config.base_spread_ticks) / self.config.max_inventory
    }
}

impl Agent for MarketMaker {
    fn name(&self) -> &'static str {
        "market_maker"
    }

    fn propose(&mut self, view: &BookView, _rng: &mut ChaCha8Rng) -> Vec<Intent> {
        let mut intents = Vec::new();

        let half = self.half_spread(view.volatility);
        let skew = self.skew();
        let bid_target = (view.mid_tick - half - skew).max(1);
        let ask_target = (view.mid_tick + half - skew).max(bid_target + 1);

        // Pull quotes the mid has moved away from
        let requote = self.config.requote_distance_ticks;
        for quote in &self.live {
            let target = match quote.side {
                Side::Bid => bid_target,
                Side::Ask => ask_target,
            };
            if (quote.tick - target).abs() > requote {
                intents.push(Intent::Cancel(quote.id));
            }
        }

        let has_bid = self.live.iter().any(|q| q.side == Side::Bid);
        let has_ask = self.live.iter().any(|q| q.side == Side::Ask);

        if !has_bid && self.inventory < self.config.max_inventory {
            intents.push(Intent::Place(OrderSpec::limit(
                Side::Bid,
                bid_target,
                self.config.size,
            )));
        }
        if !has_ask && self.inventory > -self.config.max_inventory {
            intents.push(Intent::Place(OrderSpec::limit(
                Side::Ask,
                ask_target,
                self.config.size,
            )));
        }

        intents
    }

    fn on_order_placed(&mut self, order_id: u64, side: Side, price_tick: i64) {
        self.live.push(LiveQuote {
            id: order_id,
            side,
            tick: price_tick,
        });
    }

    fn on_order_removed(&mut self, order_id: u64) {
        self.live.retain(|q| q.id != order_id);
    }

    fn on_fill(&mut self, _order_id: u64, side: Side, quantity: u32) {
        match side {
            Side::Bid => self.inventory += i64::from(quantity),
            Side::Ask => self.inventory -= i64::from(quantity),
        }
    }
}
