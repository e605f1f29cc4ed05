//! Core types for the auction gym.
//!
//! This crate provides all shared data types used across the simulation:
//! trader and trade identifiers, orders and pending jobs, trades and ledger
//! records, market-wide constants, and the per-timestep market snapshot
//! handed to every trader.

mod ids;
mod market;
mod order;
mod trade;

pub use ids::{Algorithm, Day, ParseAlgorithmError, Role, Timestep, TradeId, TraderId};
pub use market::{AuctionParameters, MarketInfo, MarketUpdate};
pub use order::{Order, Side, TraderOrder};
pub use trade::{Trade, TradeRecord};
