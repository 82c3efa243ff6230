//! Integer price-tick quantization
//!
//! All book-internal price comparisons use integer ticks; real prices only
//! appear at the edges (configuration input, snapshot output). The grid
//! converts between the two: `price = tick × tick_size`.

use serde::{Deserialize, Serialize};

/// Default price quantum.
pub const DEFAULT_TICK_SIZE: f64 = 0.01;

/// Conversion grid between real prices and integer price ticks.
///
/// Immutable once constructed; pass it by value where needed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TickGrid {
    tick_size: f64,
}

impl TickGrid {
    /// Create a grid with the given tick size.
    ///
    /// # Panics
    /// Panics if `tick_size` is not strictly positive.
    pub fn new(tick_size: f64) -> Self {
        assert!(
            tick_size > 0.0 && tick_size.is_finite(),
            "tick size must be positive and finite"
        );
        Self { tick_size }
    }

    /// Try to create a grid, returning None for an invalid tick size.
    pub fn try_new(tick_size: f64) -> Option<Self> {
        (tick_size > 0.0 && tick_size.is_finite()).then(|| Self { tick_size })
    }

    /// The price quantum.
    pub fn tick_size(&self) -> f64 {
        self.tick_size
    }

    /// Quantize a real price to the nearest tick.
    ///
    /// Returns None for non-positive or non-finite prices.
    pub fn price_to_tick(&self, price: f64) -> Option<i64> {
        if price <= 0.0 || !price.is_finite() {
            return None;
        }
        Some((price / self.tick_size).round() as i64)
    }

    /// Convert an integer tick back to a real price.
    pub fn tick_to_price(&self, tick: i64) -> f64 {
        tick as f64 * self.tick_size
    }
}

impl Default for TickGrid {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_round_trips_through_tick() {
        let grid = TickGrid::default();
        let tick = grid.price_to_tick(10.25).unwrap();
        assert_eq!(tick, 1025);
        assert!((grid.tick_to_price(tick) - 10.25).abs() < 1e-9);
    }

    #[test]
    fn test_rounding_to_nearest_tick() {
        let grid = TickGrid::default();
        assert_eq!(grid.price_to_tick(10.004), Some(1000));
        assert_eq!(grid.price_to_tick(10.006), Some(1001));
    }

    #[test]
    fn test_nonpositive_price_rejected() {
        let grid = TickGrid::default();
        assert_eq!(grid.price_to_tick(0.0), None);
        assert_eq!(grid.price_to_tick(-1.0), None);
        assert_eq!(grid.price_to_tick(f64::NAN), None);
    }

    #[test]
    fn test_try_new_rejects_bad_tick_size() {
        assert!(TickGrid::try_new(0.0).is_none());
        assert!(TickGrid::try_new(-0.01).is_none());
        assert!(TickGrid::try_new(0.05).is_some());
    }

    #[test]
    #[should_panic(expected = "tick size must be positive")]
    fn test_new_panics_on_zero() {
        TickGrid::new(0.0);
    }
}
