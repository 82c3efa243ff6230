//! Simulation configuration — all tunables in one place
//!
//! Built once, passed at construction, never mutated afterwards.

use serde::{Deserialize, Serialize};
use types::tick::{TickGrid, DEFAULT_TICK_SIZE};

use crate::regime::RegimeMatrix;

/// All generator parameters grouped in one immutable object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    // Price
    pub tick_size: f64,
    pub start_price: f64,
    pub spread: f64,
    pub min_price: f64,
    pub mean_reversion: f64,

    // Order flow
    /// Base arrival budget per tick, before regime and intraday scaling
    pub orders_per_tick: u32,
    /// Share of noise-flow orders submitted as MARKET
    pub market_ratio: f64,
    /// Fraction of noise intents that are cancels, in [0, 1]
    pub cancel_ratio: f64,

    // Randomness
    pub seed: u64,

    // Simulated time: one tick advances the clock by a uniform draw from
    // this range (nanoseconds)
    pub step_ns_min: u64,
    pub step_ns_max: u64,

    // Book management
    pub replenish: bool,
    /// Levels farther than this many ticks from mid are purged
    pub stale_purge_distance: i64,
    /// Purge cadence, in generator ticks
    pub stale_purge_interval: u64,
    pub seed_levels: usize,
    pub seed_orders_per_level: usize,

    // Session
    /// Intraday curve period, in seconds
    pub session_length_s: u32,
    pub overnight_gap_sigma: f64,
    pub daily_drift_sigma: f64,

    // Regime switching
    pub regime_matrix: RegimeMatrix,

    // Debug invariant checks in the book
    pub validate_orders: bool,
}

impl SimulationConfig {
    /// The price grid implied by `tick_size`.
    pub fn grid(&self) -> TickGrid {
        TickGrid::try_new(self.tick_size).unwrap_or_default()
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_size: DEFAULT_TICK_SIZE,
            start_price: 10.0,
            spread: 0.10,
            min_price: 0.01,
            mean_reversion: 0.001,
            orders_per_tick: 5,
            market_ratio: 0.12,
            cancel_ratio: 0.2,
            seed: 42,
            step_ns_min: 500_000,
            step_ns_max: 1_500_000,
            replenish: true,
            stale_purge_distance: 120,
            stale_purge_interval: 20,
            seed_levels: 20,
            seed_orders_per_level: 4,
            session_length_s: 23_400,
            overnight_gap_sigma: 0.010,
            daily_drift_sigma: 0.006,
            regime_matrix: RegimeMatrix::default(),
            validate_orders: false,
        }
    }
}
