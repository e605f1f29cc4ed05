//! Error types for exchange operations.

use std::fmt;
use types::{Side, TraderId};

/// Result type for exchange operations.
pub type Result<T> = std::result::Result<T, ExchangeError>;

/// Errors that can occur while mutating the order book.
#[derive(Debug, Clone, PartialEq)]
pub enum ExchangeError {
    /// An order was inserted into the half of the opposite side.
    SideMismatch { expected: Side, actual: Side },
    /// The order fails the basic validity predicate (non-positive price or
    /// zero quantity).
    InvalidOrder,
    /// No resident order for the given trader on the addressed side.
    NotFound(TraderId),
    /// A trade referenced an order that is no longer resident in the book.
    /// This signals an internal consistency violation: a trade must never
    /// outlive its constituent quotes.
    OrderNotResident { trader: TraderId, side: Side },
}

impl fmt::Display for ExchangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExchangeError::SideMismatch { expected, actual } => {
                write!(f, "side mismatch: {} order offered to the {} book", actual, expected)
            }
            ExchangeError::InvalidOrder => write!(f, "order price and quantity must be positive"),
            ExchangeError::NotFound(id) => write!(f, "no resident order for {}", id),
            ExchangeError::OrderNotResident { trader, side } => {
                write!(f, "trade references a non-resident {} order of {}", side, trader)
            }
        }
    }
}

impl std::error::Error for ExchangeError {}
