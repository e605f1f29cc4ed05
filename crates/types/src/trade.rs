//! Trades and ledger records.

use crate::ids::{Day, Timestep, TradeId, TraderId};
use crate::order::Order;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An immutable record of one match.
///
/// Created when the best bid crosses the best ask; once appended to the
/// ledger it is never mutated or removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Ledger position at creation time.
    pub id: TradeId,
    /// The matched buy-side quote.
    pub buy: Order,
    /// The matched sell-side quote.
    pub sell: Order,
    /// Formed trade price (k-pricing over the two quotes).
    pub price: f64,
    /// Timestep at which the match formed.
    pub timestep: Timestep,
}

impl Trade {
    /// The buying trader.
    pub fn buyer(&self) -> TraderId {
        self.buy.trader_id
    }

    /// The selling trader.
    pub fn seller(&self) -> TraderId {
        self.sell.trader_id
    }
}

impl fmt::Display for Trade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} @ {:.2} (buyer: {}, seller: {}, t={})",
            self.id,
            self.price,
            self.buyer(),
            self.seller(),
            self.timestep
        )
    }
}

/// One row of the per-day trade ledger handed to sinks and the fitness
/// evaluator.
///
/// The limit-price fields are reported by the two settling traders and are
/// significant for the allocative-efficiency computation: a trade's realized
/// surplus is `(price - seller_limit) + (buyer_limit - price)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub trade_id: TradeId,
    pub day: Day,
    pub timestep: Timestep,
    pub price: f64,
    pub seller: TraderId,
    pub buyer: TraderId,
    pub seller_limit: f64,
    pub buyer_limit: f64,
}

impl TradeRecord {
    /// Combined buyer and seller surplus realized by this trade.
    pub fn surplus(&self) -> f64 {
        (self.price - self.seller_limit) + (self.buyer_limit - self.price)
    }
}
