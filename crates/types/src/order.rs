//! Orders and pending jobs.
//!
//! An [`Order`] is a live shout: it exists only for the timestep in which it
//! was produced, after which it is either resident in the book, matched, or
//! discarded. A [`TraderOrder`] is the job a trader is working on — the
//! limit price and side handed down by the allocation schedule.

use crate::ids::{Timestep, TraderId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which side of the book a quote belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Bid,
    Ask,
}

impl Side {
    /// Returns the opposite side.
    pub fn opposite(self) -> Self {
        match self {
            Side::Bid => Side::Ask,
            Side::Ask => Side::Bid,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Bid => write!(f, "BID"),
            Side::Ask => write!(f, "ASK"),
        }
    }
}

/// A live quote submitted for one timestep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Trader who shouted the quote.
    pub trader_id: TraderId,
    /// Bid or ask.
    pub side: Side,
    /// Quoted price.
    pub price: f64,
    /// Units quoted (always 1 in the current single-unit market).
    pub quantity: u32,
    /// Timestep at which the quote was submitted.
    pub timestep: Timestep,
}

impl Order {
    /// Create a new quote.
    pub fn new(trader_id: TraderId, side: Side, price: f64, quantity: u32, timestep: Timestep) -> Self {
        Self {
            trader_id,
            side,
            price,
            quantity,
            timestep,
        }
    }

    /// Whether the quote carries a positive price and quantity.
    pub fn is_valid(&self) -> bool {
        self.price > 0.0 && self.price.is_finite() && self.quantity > 0
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} x{} @ {:.2} (t={})",
            self.trader_id, self.side, self.quantity, self.price, self.timestep
        )
    }
}

/// A pending job assigned to a trader by the allocation schedule.
///
/// The head of a trader's job queue is the job currently being worked;
/// quoting derives its price from the job's limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraderOrder {
    /// Side the job quotes on.
    pub side: Side,
    /// The trader's private limit price for this unit.
    pub limit_price: f64,
    /// Units to trade (always 1 in the current scope).
    pub quantity: u32,
}

impl TraderOrder {
    /// Create a new job.
    pub fn new(side: Side, limit_price: f64, quantity: u32) -> Self {
        Self {
            side,
            limit_price,
            quantity,
        }
    }

    /// A job is valid iff its limit price and quantity are positive.
    pub fn is_valid(&self) -> bool {
        self.limit_price > 0.0 && self.limit_price.is_finite() && self.quantity > 0
    }

    /// Whether this job quotes on the bid side.
    pub fn is_bid(&self) -> bool {
        self.side == Side::Bid
    }

    /// Whether this job quotes on the ask side.
    pub fn is_ask(&self) -> bool {
        self.side == Side::Ask
    }
}
