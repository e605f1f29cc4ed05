//! Exchange: market mechanics for the auction gym.
//!
//! This crate provides the matching core of the continuous double auction:
//! - Order book halves with a single resident order per trader
//! - The order book proper with its append-only trade ledger
//! - The shout-admission rule pipeline (price bounds, equilibrium band,
//!   max-shift, dominance cooldown)
//! - Trade formation under the k-pricing rule
//! - Error handling for book operations

mod error;
mod matching;
mod order_book;
mod rules;

pub use error::{ExchangeError, Result};
pub use matching::{k_price, try_match};
pub use order_book::{BestQuotes, OrderBook, OrderBookHalf};
pub use rules::{Rejection, ShoutRules};
