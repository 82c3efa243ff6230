//! Order sides, types, and the unit held in the book

use serde::{Deserialize, Serialize};

use crate::errors::OrderError;

/// Order side (resting on the bid or the ask)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// Buy side
    Bid,
    /// Sell side
    Ask,
}

impl Side {
    /// Get the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            Side::Bid => Side::Ask,
            Side::Ask => Side::Bid,
        }
    }
}

/// Order type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderType {
    /// Rests at a price tick after matching the marketable portion
    Limit,
    /// Consumes liquidity only; any remainder is dropped
    Market,
}

/// An order submitted to the book.
///
/// LIMIT orders carry a positive `price_tick`; MARKET orders carry none.
/// `quantity` is decremented in place on partial fills, and the order is
/// removed from the book when it reaches zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Unique, non-zero, monotonically increasing per process
    pub id: u64,
    pub side: Side,
    pub kind: OrderType,
    /// Present for LIMIT, absent for MARKET
    pub price_tick: Option<i64>,
    /// Remaining quantity; positive at creation
    pub quantity: u32,
    /// Monotonic nanoseconds at admission; defines time priority
    pub timestamp: u64,
}

impl Order {
    /// Create a validated LIMIT order.
    pub fn limit(
        id: u64,
        side: Side,
        price_tick: i64,
        quantity: u32,
        timestamp: u64,
    ) -> Result<Self, OrderError> {
        if id == 0 {
            return Err(OrderError::InvalidId);
        }
        if quantity == 0 {
            return Err(OrderError::InvalidQuantity);
        }
        if price_tick <= 0 {
            return Err(OrderError::MissingPrice);
        }
        Ok(Self {
            id,
            side,
            kind: OrderType::Limit,
            price_tick: Some(price_tick),
            quantity,
            timestamp,
        })
    }

    /// Create a validated MARKET order.
    pub fn market(id: u64, side: Side, quantity: u32, timestamp: u64) -> Result<Self, OrderError> {
        if id == 0 {
            return Err(OrderError::InvalidId);
        }
        if quantity == 0 {
            return Err(OrderError::InvalidQuantity);
        }
        Ok(Self {
            id,
            side,
            kind: OrderType::Market,
            price_tick: None,
            quantity,
            timestamp,
        })
    }

    /// Re-check the construction invariants.
    ///
    /// Used by the book when validation mode is enabled.
    pub fn validate(&self) -> Result<(), OrderError> {
        if self.id == 0 {
            return Err(OrderError::InvalidId);
        }
        if self.quantity == 0 {
            return Err(OrderError::InvalidQuantity);
        }
        match (self.kind, self.price_tick) {
            (OrderType::Limit, Some(tick)) if tick > 0 => Ok(()),
            (OrderType::Limit, _) => Err(OrderError::MissingPrice),
            (OrderType::Market, None) => Ok(()),
            (OrderType::Market, Some(_)) => Err(OrderError::UnexpectedPrice),
        }
    }
}
