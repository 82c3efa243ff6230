//! Market generator step loop
//!
//! Owns the book, the clock, the RNG, the regime state, and the agent
//! population. One `step()` advances simulated time, evolves the latent
//! mid, polls every agent, mixes in the background noise flow, and applies
//! all intents to the book, yielding the resulting L3 events in submission
//! order.
//!
//! The generator is an explicit state object rather than a coroutine: it is
//! restartable from a seed and allocation-light in the hot path.

use std::collections::HashMap;

use orderbook::{BookConfig, OrderBook, Submission};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Poisson};
use serde::Serialize;
use tracing::debug;
use types::clock::SimClock;
use types::events::{L3Event, Trade};
use types::order::{Order, OrderType, Side};
use types::tick::TickGrid;

use crate::agents::{
    Agent, BookView, Intent, MarketMaker, MarketMakerConfig, MeanReversion, Momentum, Noise,
    OrderSpec,
};
use crate::config::SimulationConfig;
use crate::flow;
use crate::regime::Regime;
use crate::stochastic::{self, MidParams, MidState};

/// One emitted L3 event; Execute records carry their trade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRecord {
    pub event: L3Event,
    pub trades: Vec<Trade>,
}

/// Regime-switching synthetic market driving a live order book.
pub struct MarketGenerator {
    cfg: SimulationConfig,
    grid: TickGrid,
    book: OrderBook,
    rng: ChaCha8Rng,
    clock: SimClock,
    regime: Regime,
    mid: MidState,
    agents: Vec<Box<dyn Agent>>,
    /// Resting order id → owning agent index
    owners: HashMap<u64, usize>,
    /// Resting noise-flow ids, sampled uniformly for cancels
    open_noise: Vec<u64>,
    next_id: u64,
    tick_count: u64,
    session_index: u64,
}

impl MarketGenerator {
    /// Build a generator over a fresh book, pre-seeded with resting
    /// liquidity around the starting price.
    pub fn new(cfg: SimulationConfig, agents: Vec<Box<dyn Agent>>) -> Self {
        let grid = cfg.grid();
        let book = OrderBook::new(BookConfig {
            grid,
            validate: cfg.validate_orders,
        });
        let mid = MidState::new(cfg.start_price);
        let rng = ChaCha8Rng::seed_from_u64(cfg.seed);

        let mut generator = Self {
            grid,
            book,
            rng,
            clock: SimClock::new(),
            regime: Regime::Normal,
            mid,
            agents,
            owners: HashMap::new(),
            open_noise: Vec::new(),
            next_id: 1,
            tick_count: 0,
            session_index: 0,
            cfg,
        };
        generator.seed_liquidity(None);
        generator
    }

    /// Generator with the standard agent population.
    pub fn with_standard_agents(cfg: SimulationConfig) -> Self {
        let agents: Vec<Box<dyn Agent>> = vec![
            Box::new(MarketMaker::new(MarketMakerConfig::default())),
            Box::new(Momentum::default()),
            Box::new(MeanReversion::new(cfg.start_price, 0.02, 5)),
            Box::new(Noise::default()),
        ];
        Self::new(cfg, agents)
    }

    /// Run one simulation tick and return the emitted events.
    pub fn step(&mut self) -> Vec<StepRecord> {
        let mut records = Vec::new();
        self.tick_count += 1;

        // Advance simulated time
        let dt_ns = self
            .rng
            .gen_range(self.cfg.step_ns_min..=self.cfg.step_ns_max.max(self.cfg.step_ns_min));
        self.clock.advance(dt_ns);
        let dt_s = dt_ns as f64 * 1e-9;

        let session_len_ns = u64::from(self.cfg.session_length_s).max(1) * 1_000_000_000;
        let session_index = self.clock.now() / session_len_ns;
        if session_index != self.session_index {
            self.session_index = session_index;
            self.roll_session(&mut records);
        }

        let tod_s = (self.clock.now() % session_len_ns) as f64 * 1e-9;
        let session_s = f64::from(self.cfg.session_length_s);
        let activity = stochastic::intraday_activity(tod_s, session_s);
        let vol_scale = stochastic::intraday_volatility(tod_s, session_s);

        // Evolve the latent mid under the current regime, then transition
        let params = self.regime.params();
        let mid_params = MidParams {
            sigma: params.sigma,
            jump_prob: params.jump_prob,
            jump_sigma: params.jump_sigma,
            mean_reversion: self.cfg.mean_reversion,
            min_price: self.cfg.min_price,
        };
        stochastic::evolve_mid(&mut self.rng, &mut self.mid, &mid_params, dt_s, vol_scale);

        let previous = self.regime;
        self.regime = self.cfg.regime_matrix.next(self.regime, &mut self.rng);
        if self.regime != previous {
            debug!(from = ?previous, to = ?self.regime, tick = self.tick_count, "regime transition");
        }
        let params = self.regime.params();

        // Arrival budget for this tick
        let budget = f64::from(self.cfg.orders_per_tick) * params.arrival * activity;

        // Poll the agent population
        let view = self.view(vol_scale);
        let mut proposals: Vec<(usize, Vec<Intent>)> = Vec::with_capacity(self.agents.len());
        for (i, agent) in self.agents.iter_mut().enumerate() {
            proposals.push((i, agent.propose(&view, &mut self.rng)));
        }
        for (owner, intents) in proposals {
            for intent in intents {
                match intent {
                    Intent::Place(spec) => self.apply_order(spec, Some(owner), &mut records),
                    Intent::Cancel(id) => self.apply_cancel(id, &mut records),
                }
            }
        }

        // Background noise flow: Poisson cancels, then adds
        let cancel_lambda = budget * self.cfg.cancel_ratio * params.cancel;
        let cancel_count = sample_poisson(&mut self.rng, cancel_lambda);
        let add_count = (budget.round() as i64 - i64::from(cancel_count)).max(0) as u32;

        for _ in 0..cancel_count {
            self.cancel_random_noise(&mut records);
        }
        for _ in 0..add_count {
            let side = flow::sample_side(&mut self.rng, params.imbalance, self.mid.momentum);
            let market_ratio =
                (self.cfg.market_ratio * params.market_ratio / 0.15).clamp(0.01, 0.9);
            let qty = flow::sample_order_size(&mut self.rng);
            let spec = if self.rng.gen::<f64>() < market_ratio {
                OrderSpec::market(side, qty)
            } else {
                let tick = flow::sample_limit_tick(
                    &mut self.rng,
                    side,
                    self.mid.mid,
                    self.cfg.spread,
                    params.spread,
                    self.grid,
                );
                OrderSpec::limit(side, tick, qty)
            };
            self.apply_order(spec, None, &mut records);
        }

        if self.cfg.replenish {
            self.replenish(&mut records);
        }

        if self.cfg.stale_purge_interval > 0 && self.tick_count % self.cfg.stale_purge_interval == 0
        {
            self.purge_stale(&mut records);
        }

        records
    }

    /// The live book (read-only).
    pub fn book(&self) -> &OrderBook {
        &self.book
    }

    pub fn mid_price(&self) -> f64 {
        self.mid.mid
    }

    pub fn current_regime(&self) -> Regime {
        self.regime
    }

    /// Current simulated time in nanoseconds.
    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    pub fn ticks_run(&self) -> u64 {
        self.tick_count
    }

    fn alloc_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn mid_tick(&self) -> i64 {
        self.grid.price_to_tick(self.mid.mid).unwrap_or(1).max(1)
    }

    fn view(&self, vol_scale: f64) -> BookView {
        let params = self.regime.params();
        BookView {
            t: self.clock.now(),
            mid_price: self.mid.mid,
            mid_tick: self.mid_tick(),
            best_bid: self.book.best_bid(),
            best_ask: self.book.best_ask(),
            momentum: self.mid.momentum,
            volatility: params.sigma * vol_scale,
            grid: self.grid,
        }
    }

    /// Submit one order and emit its Execute/Add events.
    fn apply_order(&mut self, spec: OrderSpec, owner: Option<usize>, records: &mut Vec<StepRecord>) {
        let id = self.alloc_id();
        let ts = self.clock.now();
        let order = match spec.kind {
            OrderType::Limit => {
                Order::limit(id, spec.side, spec.price_tick.unwrap_or(1), spec.quantity, ts)
            }
            OrderType::Market => Order::market(id, spec.side, spec.quantity, ts),
        };
        // Specs are clamped at construction; a rejected spec is dropped
        let Ok(order) = order else { return };
        let Ok(submission) = self.book.submit(order) else {
            return;
        };
        self.emit_submission(&order, &submission, owner, records);
    }

    fn emit_submission(
        &mut self,
        order: &Order,
        submission: &Submission,
        owner: Option<usize>,
        records: &mut Vec<StepRecord>,
    ) {
        let mut taker_filled: u32 = 0;

        for trade in &submission.trades {
            taker_filled += trade.quantity;
            let ts = self.clock.tick();
            records.push(StepRecord {
                event: L3Event::Execute {
                    maker_id: trade.maker_id,
                    aggressor_side: order.side,
                    price_tick: trade.price_tick,
                    quantity: trade.quantity,
                    ts,
                },
                trades: vec![*trade],
            });

            // Maker-side bookkeeping stays owner-initiated
            let maker_owner = self.owners.get(&trade.maker_id).copied();
            if let Some(maker_owner) = maker_owner {
                let maker_side = order.side.opposite();
                self.agents[maker_owner].on_fill(trade.maker_id, maker_side, trade.quantity);
                if !self.book.contains(trade.maker_id) {
                    self.agents[maker_owner].on_order_removed(trade.maker_id);
                    self.owners.remove(&trade.maker_id);
                }
            }
        }

        if taker_filled > 0 {
            if let Some(idx) = owner {
                self.agents[idx].on_fill(order.id, order.side, taker_filled);
            }
        }

        if let Some(resting) = submission.resting {
            let ts = self.clock.tick();
            records.push(StepRecord {
                event: L3Event::Add {
                    order_id: resting.order_id,
                    side: resting.side,
                    price_tick: resting.price_tick,
                    quantity: resting.quantity,
                    ts,
                },
                trades: Vec::new(),
            });
            match owner {
                Some(idx) => {
                    self.agents[idx].on_order_placed(
                        resting.order_id,
                        resting.side,
                        resting.price_tick,
                    );
                    self.owners.insert(resting.order_id, idx);
                }
                None => self.open_noise.push(resting.order_id),
            }
        }
    }

    /// Cancel by id, emitting the Cancel event when the order was live.
    fn apply_cancel(&mut self, order_id: u64, records: &mut Vec<StepRecord>) {
        if let Some(cancelled) = self.book.cancel(order_id) {
            let ts = self.clock.tick();
            records.push(StepRecord {
                event: L3Event::Cancel {
                    order_id: cancelled.order_id,
                    side: cancelled.side,
                    price_tick: cancelled.price_tick,
                    cancelled_quantity: cancelled.quantity,
                    ts,
                },
                trades: Vec::new(),
            });
        }
        // Either way the id is no longer live for its owner
        if let Some(owner) = self.owners.remove(&order_id) {
            self.agents[owner].on_order_removed(order_id);
        }
    }

    /// Cancel one uniformly drawn outstanding noise order.
    ///
    /// Ids that were filled since resting are skipped until a live one is
    /// found; the draw stays uniform over the survivors.
    fn cancel_random_noise(&mut self, records: &mut Vec<StepRecord>) {
        while !self.open_noise.is_empty() {
            let idx = self.rng.gen_range(0..self.open_noise.len());
            let id = self.open_noise.swap_remove(idx);
            if let Some(cancelled) = self.book.cancel(id) {
                let ts = self.clock.tick();
                records.push(StepRecord {
                    event: L3Event::Cancel {
                        order_id: cancelled.order_id,
                        side: cancelled.side,
                        price_tick: cancelled.price_tick,
                        cancelled_quantity: cancelled.quantity,
                        ts,
                    },
                    trades: Vec::new(),
                });
                return;
            }
        }
    }

    /// Post a fresh order near the mid when the touch has drifted away.
    fn replenish(&mut self, records: &mut Vec<StepRecord>) {
        let params = self.regime.params();
        let dynamic_spread = self.cfg.spread * params.spread;
        let tick_size = self.grid.tick_size();
        let mid_tick = self.mid_tick();
        let max_gap = ((dynamic_spread * 2.5) / tick_size).round().max(1.0) as i64;
        let half = (dynamic_spread / (2.0 * tick_size)).round().max(1.0) as i64;

        if let Some((best_bid, _)) = self.book.best_bid() {
            if (mid_tick - best_bid).abs() > max_gap {
                let qty = (flow::sample_replenish_size(&mut self.rng) / 2).max(1);
                self.apply_order(
                    OrderSpec::limit(Side::Bid, (mid_tick - half).max(1), qty),
                    None,
                    records,
                );
            }
        }
        if let Some((best_ask, _)) = self.book.best_ask() {
            if (best_ask - mid_tick).abs() > max_gap {
                let qty = (flow::sample_replenish_size(&mut self.rng) / 2).max(1);
                self.apply_order(
                    OrderSpec::limit(Side::Ask, mid_tick + half, qty),
                    None,
                    records,
                );
            }
        }
    }

    /// Cancel whole levels that drifted too far from the mid.
    fn purge_stale(&mut self, records: &mut Vec<StepRecord>) {
        let mid_tick = self.mid_tick();
        let distance = self.cfg.stale_purge_distance;
        let mut purged = 0usize;

        for tick in self.book.level_ticks(Side::Bid) {
            if mid_tick - tick > distance {
                purged += self.cancel_whole_level(Side::Bid, tick, records);
            }
        }
        for tick in self.book.level_ticks(Side::Ask) {
            if tick - mid_tick > distance {
                purged += self.cancel_whole_level(Side::Ask, tick, records);
            }
        }
        if purged > 0 {
            debug!(purged, tick = self.tick_count, "purged stale levels");
        }
    }

    fn cancel_whole_level(
        &mut self,
        side: Side,
        tick: i64,
        records: &mut Vec<StepRecord>,
    ) -> usize {
        let cancelled = self.book.cancel_level(side, tick, u32::MAX);
        let count = cancelled.len();
        for c in cancelled {
            let ts = self.clock.tick();
            records.push(StepRecord {
                event: L3Event::Cancel {
                    order_id: c.order_id,
                    side: c.side,
                    price_tick: c.price_tick,
                    cancelled_quantity: c.quantity,
                    ts,
                },
                trades: Vec::new(),
            });
            if let Some(owner) = self.owners.remove(&c.order_id) {
                self.agents[owner].on_order_removed(c.order_id);
            }
        }
        count
    }

    /// Session rollover: clear the book, gap the mid, drift the anchor,
    /// reseed opening liquidity.
    fn roll_session(&mut self, records: &mut Vec<StepRecord>) {
        debug!(session = self.session_index, "session rollover");

        for side in [Side::Bid, Side::Ask] {
            for tick in self.book.level_ticks(side) {
                self.cancel_whole_level(side, tick, records);
            }
        }
        self.open_noise.clear();

        self.mid.mid = stochastic::overnight_gap(
            &mut self.rng,
            self.mid.mid,
            self.cfg.overnight_gap_sigma,
        )
        .max(self.cfg.min_price);
        self.mid.anchor =
            stochastic::daily_drift(&mut self.rng, self.mid.anchor, self.cfg.daily_drift_sigma)
                .max(self.cfg.min_price);
        self.mid.momentum = 0.0;

        self.seed_liquidity(Some(records));
    }

    /// Pre-seed resting liquidity around the mid (opening auction).
    ///
    /// With `records` the seeds go through the normal submission path and
    /// emit Add events; without, they are placed silently before streaming
    /// starts.
    fn seed_liquidity(&mut self, records: Option<&mut Vec<StepRecord>>) {
        let plan = self.seed_plan();
        match records {
            Some(recs) => {
                for (side, tick, qty) in plan {
                    self.apply_order(OrderSpec::limit(side, tick, qty), None, recs);
                }
            }
            None => {
                for (side, tick, qty) in plan {
                    let id = self.alloc_id();
                    let ts = self.clock.now();
                    if let Ok(order) = Order::limit(id, side, tick, qty, ts) {
                        if let Ok(submission) = self.book.submit(order) {
                            if let Some(resting) = submission.resting {
                                self.open_noise.push(resting.order_id);
                            }
                        }
                    }
                }
            }
        }
    }

    /// Opening-auction shape: `seed_levels` levels per side, a few orders
    /// each, spaced one tick apart from the half-spread outwards.
    fn seed_plan(&mut self) -> Vec<(Side, i64, u32)> {
        let mid_tick = self.mid_tick();
        let tick_size = self.grid.tick_size();
        let half = ((self.cfg.spread / 2.0) / tick_size).round().max(1.0) as i64;

        let mut plan = Vec::new();
        for i in 0..self.cfg.seed_levels as i64 {
            let bid_tick = (mid_tick - half - i).max(1);
            let ask_tick = mid_tick + half + i;
            for _ in 0..self.cfg.seed_orders_per_level {
                plan.push((Side::Bid, bid_tick, flow::sample_replenish_size(&mut self.rng)));
                plan.push((Side::Ask, ask_tick, flow::sample_replenish_size(&mut self.rng)));
            }
        }
        plan
    }
}

fn sample_poisson<R: Rng>(rng: &mut R, lambda: f64) -> u32 {
    if lambda <= 0.0 {
        return 0;
    }
    match Poisson::new(lambda) {
        Ok(dist) => dist.sample(rng) as u32,
        Err(_) => 0,
    }
}
