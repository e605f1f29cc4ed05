//! Order book with one resident order per trader per side.
//!
//! Unlike a depth book keyed by price level, residency here is keyed by
//! trader: shouting again overwrites the trader's previous quote on that
//! side. Best prices are computed on demand by scanning the residents,
//! which stays cheap at the trader counts these markets run with.

use std::collections::HashMap;

use types::{Order, Side, Timestep, Trade, TradeId, TraderId};

use crate::error::{ExchangeError, Result};

/// The best price on one side together with every order tied at it.
///
/// Ties are real: several traders may legally quote the same boundary
/// price. `order` is the single quote chosen among the tied set — the most
/// recently submitted one (highest timestep). That choice favours recency
/// over arrival order and is preserved deliberately; see DESIGN.md.
#[derive(Debug, Clone, PartialEq)]
pub struct BestQuotes {
    /// Best price on the side (max for bids, min for asks).
    pub price: f64,
    /// The chosen best order.
    pub order: Order,
    /// All orders tied at the best price, including the chosen one.
    pub tied: Vec<Order>,
}

/// One side of the order book.
#[derive(Debug, Clone)]
pub struct OrderBookHalf {
    side: Side,
    orders: HashMap<TraderId, Order>,
}

impl OrderBookHalf {
    /// Create an empty half for the given side.
    pub fn new(side: Side) -> Self {
        Self {
            side,
            orders: HashMap::new(),
        }
    }

    /// The side this half holds.
    pub fn side(&self) -> Side {
        self.side
    }

    /// Store or overwrite the trader's resident order.
    pub fn insert(&mut self, order: Order) -> Result<()> {
        if order.side != self.side {
            return Err(ExchangeError::SideMismatch {
                expected: self.side,
                actual: order.side,
            });
        }
        if !order.is_valid() {
            return Err(ExchangeError::InvalidOrder);
        }
        self.orders.insert(order.trader_id, order);
        Ok(())
    }

    /// Remove and return the trader's resident order.
    pub fn remove(&mut self, trader_id: TraderId) -> Result<Order> {
        self.orders
            .remove(&trader_id)
            .ok_or(ExchangeError::NotFound(trader_id))
    }

    /// Whether the trader has a resident order on this side.
    pub fn contains(&self, trader_id: TraderId) -> bool {
        self.orders.contains_key(&trader_id)
    }

    /// Number of resident orders.
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    /// Whether the half is empty.
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Copy out all resident orders sorted by submission timestep ascending.
    pub fn to_sorted_vec(&self) -> Vec<Order> {
        let mut orders: Vec<Order> = self.orders.values().cloned().collect();
        orders.sort_by_key(|o| o.timestep);
        orders
    }

    /// Compute the best price and the orders tied at it.
    ///
    /// Returns `None` with no error when the half holds no orders.
    pub fn best(&self) -> Option<BestQuotes> {
        let mut iter = self.orders.values();
        let first = iter.next()?;

        let better = |candidate: f64, incumbent: f64| match self.side {
            Side::Bid => candidate > incumbent,
            Side::Ask => candidate < incumbent,
        };

        let mut price = first.price;
        for order in iter {
            if better(order.price, price) {
                price = order.price;
            }
        }

        let mut tied: Vec<Order> = self
            .orders
            .values()
            .filter(|o| o.price == price)
            .cloned()
            .collect();
        tied.sort_by_key(|o| std::cmp::Reverse(o.timestep));
        let order = tied[0].clone();

        Some(BestQuotes { price, order, tied })
    }

    /// Clear all resident orders.
    pub fn clear(&mut self) {
        self.orders.clear();
    }
}

/// The full book: both halves plus the day's trade ledger.
#[derive(Debug, Clone)]
pub struct OrderBook {
    bids: OrderBookHalf,
    asks: OrderBookHalf,
    trades: Vec<Trade>,
}

impl Default for OrderBook {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderBook {
    /// Create an empty book.
    pub fn new() -> Self {
        Self {
            bids: OrderBookHalf::new(Side::Bid),
            asks: OrderBookHalf::new(Side::Ask),
            trades: Vec::new(),
        }
    }

    /// The bid half.
    pub fn bids(&self) -> &OrderBookHalf {
        &self.bids
    }

    /// The ask half.
    pub fn asks(&self) -> &OrderBookHalf {
        &self.asks
    }

    fn half_mut(&mut self, side: Side) -> &mut OrderBookHalf {
        match side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
        }
    }

    /// Admit an order into the half matching its side.
    pub fn insert(&mut self, order: Order) -> Result<()> {
        self.half_mut(order.side).insert(order)
    }

    /// Remove a trader's resident order from the given side.
    pub fn remove(&mut self, trader_id: TraderId, side: Side) -> Result<Order> {
        self.half_mut(side).remove(trader_id)
    }

    /// Best resident bid, if any.
    pub fn best_bid(&self) -> Option<BestQuotes> {
        self.bids.best()
    }

    /// Best resident ask, if any.
    pub fn best_ask(&self) -> Option<BestQuotes> {
        self.asks.best()
    }

    /// The crossing pair `(best bid, best ask)` when `bid.price >= ask.price`.
    ///
    /// Returns `None` when either side is empty or the spread is positive.
    pub fn find_crossable(&self) -> Option<(Order, Order)> {
        let bid = self.bids.best()?;
        let ask = self.asks.best()?;
        (bid.price >= ask.price).then(|| (bid.order, ask.order))
    }

    /// Record a formed trade: remove both constituent quotes and append to
    /// the ledger.
    ///
    /// Failing to remove either constituent is an internal consistency
    /// violation; the book is left untouched and the trade is not recorded.
    pub fn record_trade(&mut self, trade: Trade) -> Result<()> {
        if !self.bids.contains(trade.buyer()) {
            return Err(ExchangeError::OrderNotResident {
                trader: trade.buyer(),
                side: Side::Bid,
            });
        }
        if !self.asks.contains(trade.seller()) {
            return Err(ExchangeError::OrderNotResident {
                trader: trade.seller(),
                side: Side::Ask,
            });
        }
        self.bids.remove(trade.buyer())?;
        self.asks.remove(trade.seller())?;
        self.trades.push(trade);
        Ok(())
    }

    /// The next trade id: the ledger length at this moment.
    pub fn next_trade_id(&self) -> TradeId {
        TradeId(self.trades.len() as u64)
    }

    /// The day's ledger so far.
    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    /// The most recent trade of the day, if any.
    pub fn last_trade(&self) -> Option<&Trade> {
        self.trades.last()
    }

    /// Timestep of the most recent trade, if any.
    pub fn last_trade_timestep(&self) -> Option<Timestep> {
        self.trades.last().map(|t| t.timestep)
    }

    /// Clear both halves and the ledger at a day boundary.
    pub fn reset_for_new_day(&mut self) {
        self.bids.clear();
        self.asks.clear();
        self.trades.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bid(trader: u32, price: f64, timestep: Timestep) -> Order {
        Order::new(TraderId(trader), Side::Bid, price, 1, timestep)
    }

    fn ask(trader: u32, price: f64, timestep: Timestep) -> Order {
        Order::new(TraderId(trader), Side::Ask, price, 1, timestep)
    }

    #[test]
    fn test_empty_half_has_no_best() {
        let half = OrderBookHalf::new(Side::Bid);
        assert!(half.best().is_none());
        assert!(half.is_empty());
    }

    #[test]
    fn test_side_mismatch_rejected() {
        let mut half = OrderBookHalf::new(Side::Bid);
        let result = half.insert(ask(1, 10.0, 0));
        assert!(matches!(result, Err(ExchangeError::SideMismatch { .. })));
    }

    #[test]
    fn test_invalid_order_rejected() {
        let mut half = OrderBookHalf::new(Side::Ask);
        assert_eq!(half.insert(ask(1, 0.0, 0)), Err(ExchangeError::InvalidOrder));
        assert_eq!(
            half.insert(Order::new(TraderId(1), Side::Ask, 10.0, 0, 0)),
            Err(ExchangeError::InvalidOrder)
        );
    }

    #[test]
    fn test_single_residency_overwrites() {
        let mut half = OrderBookHalf::new(Side::Bid);
        half.insert(bid(1, 10.0, 0)).unwrap();
        half.insert(bid(1, 12.0, 1)).unwrap();

        assert_eq!(half.len(), 1);
        assert_eq!(half.best().unwrap().price, 12.0);
    }

    #[test]
    fn test_remove_missing_fails() {
        let mut half = OrderBookHalf::new(Side::Bid);
        assert_eq!(half.remove(TraderId(9)), Err(ExchangeError::NotFound(TraderId(9))));
    }

    #[test]
    fn test_best_bid_is_max_best_ask_is_min() {
        let mut book = OrderBook::new();
        book.insert(bid(1, 10.0, 0)).unwrap();
        book.insert(bid(2, 12.0, 1)).unwrap();
        book.insert(ask(3, 15.0, 2)).unwrap();
        book.insert(ask(4, 14.0, 3)).unwrap();

        assert_eq!(book.best_bid().unwrap().price, 12.0);
        assert_eq!(book.best_ask().unwrap().price, 14.0);
    }

    #[test]
    fn test_tied_best_collects_all_and_picks_most_recent() {
        let mut half = OrderBookHalf::new(Side::Ask);
        half.insert(ask(1, 9.0, 2)).unwrap();
        half.insert(ask(2, 9.0, 7)).unwrap();
        half.insert(ask(3, 9.0, 5)).unwrap();
        half.insert(ask(4, 11.0, 8)).unwrap();

        let best = half.best().unwrap();
        assert_eq!(best.price, 9.0);
        assert_eq!(best.tied.len(), 3);
        // Recency wins among tied quotes, not arrival order.
        assert_eq!(best.order.trader_id, TraderId(2));
        assert_eq!(best.order.timestep, 7);
    }

    #[test]
    fn test_find_crossable() {
        let mut book = OrderBook::new();
        assert!(book.find_crossable().is_none());

        book.insert(bid(1, 10.0, 0)).unwrap();
        assert!(book.find_crossable().is_none());

        book.insert(ask(2, 11.0, 1)).unwrap();
        assert!(book.find_crossable().is_none());

        book.insert(ask(3, 9.5, 2)).unwrap();
        let (best_bid, best_ask) = book.find_crossable().unwrap();
        assert_eq!(best_bid.trader_id, TraderId(1));
        assert_eq!(best_ask.trader_id, TraderId(3));
    }

    #[test]
    fn test_record_trade_removes_both_sides() {
        let mut book = OrderBook::new();
        book.insert(bid(1, 12.0, 0)).unwrap();
        book.insert(ask(2, 8.0, 1)).unwrap();

        let (buy, sell) = book.find_crossable().unwrap();
        let trade = Trade {
            id: book.next_trade_id(),
            buy,
            sell,
            price: 10.0,
            timestep: 1,
        };
        book.record_trade(trade).unwrap();

        assert!(!book.bids().contains(TraderId(1)));
        assert!(!book.asks().contains(TraderId(2)));
        assert_eq!(book.trades().len(), 1);
        assert_eq!(book.last_trade().unwrap().id, TradeId(0));
    }

    #[test]
    fn test_record_trade_missing_constituent_leaves_book() {
        let mut book = OrderBook::new();
        book.insert(bid(1, 12.0, 0)).unwrap();

        let trade = Trade {
            id: book.next_trade_id(),
            buy: bid(1, 12.0, 0),
            sell: ask(2, 8.0, 1),
            price: 10.0,
            timestep: 1,
        };
        let result = book.record_trade(trade);
        assert!(matches!(result, Err(ExchangeError::OrderNotResident { .. })));
        // The bid must still be resident and nothing was appended.
        assert!(book.bids().contains(TraderId(1)));
        assert!(book.trades().is_empty());
    }

    #[test]
    fn test_reset_for_new_day() {
        let mut book = OrderBook::new();
        book.insert(bid(1, 12.0, 0)).unwrap();
        book.insert(ask(2, 8.0, 1)).unwrap();
        let (buy, sell) = book.find_crossable().unwrap();
        book.record_trade(Trade {
            id: book.next_trade_id(),
            buy,
            sell,
            price: 10.0,
            timestep: 1,
        })
        .unwrap();
        book.insert(bid(3, 11.0, 2)).unwrap();

        book.reset_for_new_day();
        assert!(book.bids().is_empty());
        assert!(book.asks().is_empty());
        assert!(book.trades().is_empty());
        assert_eq!(book.next_trade_id(), TradeId(0));
    }

    #[test]
    fn test_sorted_copy_out() {
        let mut half = OrderBookHalf::new(Side::Bid);
        half.insert(bid(1, 10.0, 5)).unwrap();
        half.insert(bid(2, 11.0, 2)).unwrap();
        half.insert(bid(3, 9.0, 8)).unwrap();

        let sorted = half.to_sorted_vec();
        let steps: Vec<Timestep> = sorted.iter().map(|o| o.timestep).collect();
        assert_eq!(steps, vec![2, 5, 8]);
    }
}
