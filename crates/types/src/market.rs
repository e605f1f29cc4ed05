//! Market-wide constants, auction parameters, and the broadcast snapshot.

use crate::ids::{Day, Timestep};
use crate::order::Order;
use crate::trade::Trade;
use serde::{Deserialize, Serialize};

/// Global bounds and calendar of the simulated market.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketInfo {
    /// Lowest admissible quote price.
    pub min_price: f64,
    /// Highest admissible quote price.
    pub max_price: f64,
    /// Number of trading days in a run.
    pub trading_days: Day,
    /// Timesteps per trading day.
    pub timesteps_per_day: Timestep,
}

impl Default for MarketInfo {
    fn default() -> Self {
        Self {
            min_price: 1.0,
            max_price: 100.0,
            trading_days: 3,
            timesteps_per_day: 100,
        }
    }
}

/// The auction-microstructure rule set under study.
///
/// These are the genes the outer evolutionary search mutates; the matching
/// engine treats them as read-only for the length of a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AuctionParameters {
    /// k coefficient of the pricing rule `p = k*bid + (1-k)*ask`, in [0, 1].
    pub k_pricing: f64,
    /// Target proportion of bids to asks solicited per day.
    pub bid_ask_ratio: f64,
    /// Number of recent trade prices in the equilibrium-estimate window.
    pub window_size_ee: usize,
    /// Slack around the equilibrium estimate within which shouts are
    /// admitted once the window is full.
    pub delta_ee: f64,
    /// Maximum fractional move from the last trade price a quote may carry.
    pub max_shift: f64,
    /// Per-trader, per-side cooldown in timesteps between admitted shouts.
    /// Zero disables the rule.
    pub dominance: u32,
}

impl Default for AuctionParameters {
    fn default() -> Self {
        Self {
            k_pricing: 0.5,
            bid_ask_ratio: 1.0,
            window_size_ee: 3,
            delta_ee: 5.0,
            max_shift: 2.0,
            dominance: 0,
        }
    }
}

/// Read-only market snapshot broadcast to every trader each timestep.
///
/// The quote lists are copies sorted by submission timestep (most recent
/// last); the ledger is borrowed for the duration of the callback, so
/// traders cannot retain references into exchange state.
#[derive(Debug, Clone)]
pub struct MarketUpdate<'a> {
    /// Current trading day.
    pub day: Day,
    /// Current timestep within the day.
    pub timestep: Timestep,
    /// Best (highest) resident bid price, if any.
    pub best_bid: Option<f64>,
    /// Best (lowest) resident ask price, if any.
    pub best_ask: Option<f64>,
    /// Resident bids, sorted by submission timestep ascending.
    pub bids: Vec<Order>,
    /// Resident asks, sorted by submission timestep ascending.
    pub asks: Vec<Order>,
    /// Most recent trade of the day, if any.
    pub last_trade: Option<Trade>,
    /// The day's trade ledger.
    pub ledger: &'a [Trade],
}

impl MarketUpdate<'_> {
    /// Whether a trade formed at the snapshot's own timestep.
    pub fn traded_this_step(&self) -> bool {
        self.last_trade
            .as_ref()
            .is_some_and(|t| t.timestep == self.timestep)
    }
}
