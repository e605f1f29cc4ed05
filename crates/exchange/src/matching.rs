//! Trade formation under the k-pricing rule.

use tracing::error;
use types::{Timestep, Trade};

use crate::error::Result;
use crate::order_book::OrderBook;

/// The k-pricing rule: `p = k * bid + (1 - k) * ask`.
///
/// For k in [0, 1] the formed price always lies in `[ask, bid]` whenever
/// the quotes cross.
pub fn k_price(k: f64, bid_price: f64, ask_price: f64) -> f64 {
    k * bid_price + (1.0 - k) * ask_price
}

/// Attempt one match against the book.
///
/// If the best quotes cross, forms the trade at the k-price, records it in
/// the ledger (removing both constituent quotes), and returns it. A book
/// that refuses to record the trade indicates an internal consistency
/// violation; the match is aborted and the error propagated.
pub fn try_match(book: &mut OrderBook, k: f64, timestep: Timestep) -> Result<Option<Trade>> {
    let Some((buy, sell)) = book.find_crossable() else {
        return Ok(None);
    };

    let trade = Trade {
        id: book.next_trade_id(),
        price: k_price(k, buy.price, sell.price),
        buy,
        sell,
        timestep,
    };

    if let Err(err) = book.record_trade(trade.clone()) {
        error!(%err, %trade, "match aborted: constituent quote missing from book");
        debug_assert!(false, "record_trade failed for a freshly crossed pair: {err}");
        return Err(err);
    }

    Ok(Some(trade))
}
