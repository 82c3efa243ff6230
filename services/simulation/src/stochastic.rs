//! Stochastic mid-price evolution with intraday patterns
//!
//! The latent mid follows a discrete-time process: a drift term combining
//! momentum memory and mean reversion toward a slowly wandering anchor, a
//! regime- and time-of-day-scaled diffusion, and rare signed jumps. The mid
//! is clamped strictly positive at all times.

use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

/// Weight of the momentum memory in the drift term.
const MOMENTUM_FEEDBACK: f64 = 0.05;

/// Momentum EWMA decay per tick.
const MOMENTUM_DECAY: f64 = 0.95;

/// Latent price state carried across ticks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MidState {
    pub mid: f64,
    /// EWMA of recent relative shocks (the rolling-return signal)
    pub momentum: f64,
    /// Long-term fair value the mid reverts toward
    pub anchor: f64,
}

impl MidState {
    pub fn new(start_price: f64) -> Self {
        Self {
            mid: start_price,
            momentum: 0.0,
            anchor: start_price,
        }
    }
}

/// Per-tick evolution parameters, already regime-scaled.
#[derive(Debug, Clone, Copy)]
pub struct MidParams {
    /// Relative per-tick volatility
    pub sigma: f64,
    pub jump_prob: f64,
    pub jump_sigma: f64,
    pub mean_reversion: f64,
    pub min_price: f64,
}

/// Advance the mid by one tick.
///
/// `dt_s` is the simulated step length in seconds and `vol_scale` the
/// intraday volatility multiplier.
pub fn evolve_mid<R: Rng>(rng: &mut R, state: &mut MidState, params: &MidParams, dt_s: f64, vol_scale: f64) {
    let eps: f64 = StandardNormal.sample(rng);
    let sigma = params.sigma * vol_scale;
    // dt is normalized against the ~1 ms base step so default sigma keeps
    // its per-tick meaning
    let shock = sigma * (dt_s / 1.0e-3).sqrt() * eps;

    state.momentum = MOMENTUM_DECAY * state.momentum + shock;

    let mut jump = 0.0;
    if rng.gen::<f64>() < params.jump_prob {
        let jump_eps: f64 = StandardNormal.sample(rng);
        jump = params.jump_sigma * vol_scale * jump_eps;
    }

    let reversion = if state.anchor > 0.0 {
        params.mean_reversion * (state.anchor - state.mid) / state.anchor
    } else {
        0.0
    };
    let drift = reversion + MOMENTUM_FEEDBACK * state.momentum;

    state.mid *= (1.0 + drift + shock + jump).max(0.01);
    state.mid = state.mid.max(params.min_price);
}

/// U-shaped intraday activity curve (high at open/close, low midday).
///
/// Models the volume smile: an opening rush over roughly the first 20
/// minutes, a midday lull, and a closing rush over the last 15 minutes.
/// Returns a multiplier in [0.3, 2.5].
pub fn intraday_activity(seconds_into_session: f64, session_length_s: f64) -> f64 {
    let t = seconds_into_session / session_length_s.max(1.0);
    let u = 4.0 * (t - 0.5).powi(2);
    let open_boost = (1.0 - 5.0 * t).max(0.0) * 0.5;
    let close_rush = ((t - 0.85) / 0.15).max(0.0) * 0.3;
    (0.4 + 1.2 * u + open_boost + close_rush).clamp(0.3, 2.5)
}

/// Volatility U-shape: higher at open and close, lower midday.
///
/// Returns a multiplier in [0.4, 2.0].
pub fn intraday_volatility(seconds_into_session: f64, session_length_s: f64) -> f64 {
    let t = seconds_into_session / session_length_s.max(1.0);
    let u = 4.0 * (t - 0.5).powi(2);
    let mut factor = 0.6 + 0.6 * u;
    if t < 0.05 {
        factor += 0.4;
    }
    factor.clamp(0.4, 2.0)
}

/// Overnight price gap between sessions.
///
/// Models the jump between close and next open. The default gap sigma of
/// 0.012 keeps 95% of gaps within roughly ±2.4%.
pub fn overnight_gap<R: Rng>(rng: &mut R, mid: f64, gap_sigma: f64) -> f64 {
    let eps: f64 = StandardNormal.sample(rng);
    (mid * (1.0 + gap_sigma * eps)).max(0.01)
}

/// Shift the long-term anchor slightly each session (random walk of the
/// fair value) so the mid does not revert to the same level forever.
pub fn daily_drift<R: Rng>(rng: &mut R, anchor: f64, drift_sigma: f64) -> f64 {
    let eps: f64 = StandardNormal.sample(rng);
    (anchor * (1.0 + drift_sigma * eps)).max(0.01)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn params() -> MidParams {
        MidParams {
            sigma: 0.005,
            jump_prob: 0.002,
            jump_sigma: 0.03,
            mean_reversion: 0.001,
            min_price: 0.01,
        }
    }

    #[test]
    fn test_mid_stays_positive() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut state = MidState::new(0.05);
        let p = MidParams {
            sigma: 0.5,
            jump_prob: 0.2,
            jump_sigma: 1.0,
            ..params()
        };
        for _ in 0..10_000 {
            evolve_mid(&mut rng, &mut state, &p, 1.0e-3, 2.0);
            assert!(state.mid >= p.min_price);
        }
    }

    #[test]
    fn test_evolution_is_deterministic() {
        let run = |seed: u64| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut state = MidState::new(10.0);
            for _ in 0..500 {
                evolve_mid(&mut rng, &mut state, &params(), 1.0e-3, 1.0);
            }
            (state.mid, state.momentum)
        };
        assert_eq!(run(42), run(42));
        assert_ne!(run(42), run(43));
    }

    #[test]
    fn test_mean_reversion_pulls_toward_anchor() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let mut state = MidState::new(10.0);
        state.mid = 20.0; // far above anchor
        let p = MidParams {
            sigma: 0.0,
            jump_prob: 0.0,
            mean_reversion: 0.1,
            ..params()
        };
        evolve_mid(&mut rng, &mut state, &p, 1.0e-3, 1.0);
        assert!(state.mid < 20.0);
    }

    #[test]
    fn test_activity_curve_bounds_and_shape() {
        let session = 23_400.0;
        for &t in &[0.0, 0.1, 0.25, 0.5, 0.75, 0.9, 1.0] {
            let f = intraday_activity(t * session, session);
            assert!((0.3..=2.5).contains(&f));
        }
        // Open and close busier than midday
        let open = intraday_activity(0.0, session);
        let midday = intraday_activity(session / 2.0, session);
        let close = intraday_activity(session * 0.99, session);
        assert!(open > midday);
        assert!(close > midday);
    }

    #[test]
    fn test_volatility_curve_bounds() {
        let session = 23_400.0;
        for &t in &[0.0, 0.3, 0.5, 0.8, 1.0] {
            let f = intraday_volatility(t * session, session);
            assert!((0.4..=2.0).contains(&f));
        }
    }

    #[test]
    fn test_overnight_gap_and_drift_stay_positive() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        for _ in 0..1000 {
            assert!(overnight_gap(&mut rng, 0.02, 0.5) > 0.0);
            assert!(daily_drift(&mut rng, 0.02, 0.5) > 0.0);
        }
    }
}
