//! Error taxonomy
//!
//! Book and generator errors are values, never exceptional control flow.
//! An unknown cancel target is not an error at all: `cancel` reports it as
//! an empty result. Invariant violations in validated mode are fatal by
//! design and abort the writer task.

use thiserror::Error;

/// Rejections produced when admitting an order to the book.
///
/// No book state changes when any of these is returned.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderError {
    #[error("order id must be non-zero")]
    InvalidId,

    #[error("quantity must be positive")]
    InvalidQuantity,

    #[error("limit order requires a positive price tick")]
    MissingPrice,

    #[error("market order must not carry a price tick")]
    UnexpectedPrice,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_error_display() {
        assert_eq!(
            OrderError::InvalidQuantity.to_string(),
            "quantity must be positive"
        );
        assert_eq!(
            OrderError::MissingPrice.to_string(),
            "limit order requires a positive price tick"
        );
    }
}
