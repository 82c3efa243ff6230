//! Synthetic market generator
//!
//! Drives the matching engine with a statistically plausible stream of
//! order intents: a regime-switching stochastic mid-price, time-of-day
//! activity curves, a population of agent strategies, and a background
//! noise flow.
//!
//! Given a seed, a configuration, and a fixed agent population the emitted
//! event sequence is bit-reproducible: the generator owns its RNG and its
//! clock, and nothing consults global state.
//!
//! # Modules
//! - `config` — all tunables in one immutable object
//! - `regime` — CALM / NORMAL / STRESS state machine
//! - `stochastic` — mid-price evolution and intraday curves
//! - `agents` — market maker, momentum, mean reversion, noise strategies
//! - `flow` — random order factory for the background noise flow
//! - `generator` — the step loop applying everything to the book

pub mod agents;
pub mod config;
pub mod flow;
pub mod generator;
pub mod regime;
pub mod stochastic;

pub use config::SimulationConfig;
pub use generator::{MarketGenerator, StepRecord};
pub use regime::{Regime, RegimeMatrix, RegimeParams};
