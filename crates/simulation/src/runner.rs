//! The market runner: day loop, quote solicitation, matching, broadcast.

use std::collections::HashMap;

use exchange::{OrderBook, ShoutRules, try_match};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, error, info, warn};
use traders::{Trader, TraderAgent};
use types::{
    Algorithm, AuctionParameters, Day, MarketInfo, MarketUpdate, Order, Role, Side, Timestep,
    Trade, TradeRecord, TraderId, TraderOrder,
};

use crate::schedule::{AllocationSchedule, Assignment};
use crate::sink::{MemorySink, TradeSink};

/// Retry budget for soliciting one admissible quote per timestep.
const QUOTE_ATTEMPTS: u32 = 5;

/// Declarative description of one trader in a run.
#[derive(Debug, Clone, PartialEq)]
pub struct TraderSpec {
    pub id: TraderId,
    pub role: Role,
    pub algorithm: Algorithm,
    pub limit_price: f64,
}

impl TraderSpec {
    pub fn new(id: u32, role: Role, algorithm: Algorithm, limit_price: f64) -> Self {
        Self {
            id: TraderId(id),
            role,
            algorithm,
            limit_price,
        }
    }
}

/// Counters accumulated over a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStats {
    /// Trades formed.
    pub trades: u64,
    /// Quotes admitted into the book.
    pub orders_admitted: u64,
    /// Quotes refused by the rule pipeline (counted per attempt).
    pub rejections: u64,
    /// Timesteps on which the retry budget produced no admissible quote.
    pub idle_timesteps: u64,
}

/// The exchange driver for one simulation run.
///
/// Owns the book, the rule pipeline, the trader registry, and the run's
/// master generator. Traders only ever see read-only [`MarketUpdate`]
/// snapshots; the book is mutated exclusively here.
pub struct MarketRunner {
    params: AuctionParameters,
    info: MarketInfo,
    book: OrderBook,
    rules: ShoutRules,
    agents: HashMap<TraderId, TraderAgent>,
    buyers: Vec<TraderId>,
    sellers: Vec<TraderId>,
    schedule: AllocationSchedule,
    rng: StdRng,
    bids_submitted: u64,
    asks_submitted: u64,
    day_records: Vec<TradeRecord>,
    stats: RunStats,
}

impl MarketRunner {
    /// Create a runner with its own seeded generator.
    pub fn new(params: AuctionParameters, info: MarketInfo, seed: u64) -> Self {
        Self {
            params,
            info,
            book: OrderBook::new(),
            rules: ShoutRules::new(params, info),
            agents: HashMap::new(),
            buyers: Vec::new(),
            sellers: Vec::new(),
            schedule: AllocationSchedule::new(),
            rng: StdRng::seed_from_u64(seed),
            bids_submitted: 0,
            asks_submitted: 0,
            day_records: Vec::new(),
            stats: RunStats::default(),
        }
    }

    /// Register a trader and give it the uniform every-morning allocation
    /// of one unit at its limit price.
    pub fn add_trader(&mut self, spec: &TraderSpec) {
        let agent = TraderAgent::build(spec.algorithm, spec.id, spec.role, self.info, &mut self.rng);
        let side = match spec.role {
            Role::Buyer => {
                self.buyers.push(spec.id);
                Side::Bid
            }
            Role::Seller => {
                self.sellers.push(spec.id);
                Side::Ask
            }
        };
        self.agents.insert(spec.id, agent);
        self.schedule.add_every_day(
            0,
            Assignment {
                trader: spec.id,
                jobs: vec![TraderOrder::new(side, spec.limit_price, 1)],
            },
        );
    }

    /// Replace the allocation schedule entirely.
    pub fn set_schedule(&mut self, schedule: AllocationSchedule) {
        self.schedule = schedule;
    }

    /// Number of registered traders.
    pub fn trader_count(&self) -> usize {
        self.agents.len()
    }

    /// The order book (read-only).
    pub fn book(&self) -> &OrderBook {
        &self.book
    }

    /// Run counters so far.
    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// Profit balances of all traders, sorted by id.
    pub fn balances(&self) -> Vec<(TraderId, f64)> {
        let mut balances: Vec<(TraderId, f64)> = self
            .agents
            .iter()
            .map(|(id, agent)| (*id, agent.balance()))
            .collect();
        balances.sort_by_key(|(id, _)| *id);
        balances
    }

    /// Run all trading days, handing each completed day to the sink.
    pub fn run(&mut self, sink: &mut dyn TradeSink) -> RunStats {
        for day in 0..self.info.trading_days {
            self.begin_day();
            for timestep in 0..self.info.timesteps_per_day {
                self.step(day, timestep);
            }
            sink.on_day_complete(day, &self.day_records);
            info!(day, trades = self.day_records.len(), "trading day complete");
        }
        self.stats.clone()
    }

    /// Run to completion and return every trade record in execution order.
    pub fn run_collect(&mut self) -> Vec<TradeRecord> {
        let mut sink = MemorySink::new();
        self.run(&mut sink);
        sink.all()
    }

    fn begin_day(&mut self) {
        self.book.reset_for_new_day();
        self.rules.reset_for_new_day();
        self.bids_submitted = 0;
        self.asks_submitted = 0;
        self.day_records.clear();
    }

    /// One timestep of the auction protocol.
    pub fn step(&mut self, day: Day, timestep: Timestep) {
        self.renew_jobs(day, timestep);

        match self.solicit(timestep) {
            Some(order) => {
                // Validation precedes admission, so a refusal here is an
                // internal error, not a rule rejection.
                if let Err(err) = self.book.insert(order) {
                    error!(%err, "validated quote refused by the book");
                    debug_assert!(false, "validated quote refused by the book: {err}");
                }
            }
            None => {
                self.stats.idle_timesteps += 1;
                debug!(day, timestep, "no admissible quote this timestep");
            }
        }

        if let Ok(Some(trade)) = try_match(&mut self.book, self.params.k_pricing, timestep) {
            self.rules.record_trade_price(trade.price);
            let seller_limit = self.settle(trade.seller(), &trade);
            let buyer_limit = self.settle(trade.buyer(), &trade);
            self.day_records.push(TradeRecord {
                trade_id: trade.id,
                day,
                timestep,
                price: trade.price,
                seller: trade.seller(),
                buyer: trade.buyer(),
                seller_limit,
                buyer_limit,
            });
            self.stats.trades += 1;
        }

        self.broadcast(day, timestep);
    }

    fn renew_jobs(&mut self, day: Day, timestep: Timestep) {
        let due: Vec<Assignment> = self.schedule.assignments_for(day, timestep).cloned().collect();
        for assignment in due {
            match self.agents.get_mut(&assignment.trader) {
                Some(agent) => agent.assign_jobs(assignment.jobs),
                None => warn!(trader = %assignment.trader, "schedule addresses unknown trader"),
            }
        }
    }

    /// Pick the side to solicit from: corrective toward the target
    /// bid:ask ratio when the day's counters diverge from it, uniform
    /// random otherwise.
    fn pick_side(&mut self) -> Side {
        if self.bids_submitted == 0 && self.asks_submitted == 0 {
            return self.random_side();
        }
        let target_bids = self.params.bid_ask_ratio * self.asks_submitted as f64;
        let bids = self.bids_submitted as f64;
        if bids < target_bids {
            Side::Bid
        } else if bids > target_bids {
            Side::Ask
        } else {
            self.random_side()
        }
    }

    fn random_side(&mut self) -> Side {
        if self.rng.gen_bool(0.5) { Side::Bid } else { Side::Ask }
    }

    /// Solicit one admissible quote within the retry budget.
    fn solicit(&mut self, timestep: Timestep) -> Option<Order> {
        for attempt in 0..QUOTE_ATTEMPTS {
            let side = self.pick_side();
            let trader_id = {
                let pool = match side {
                    Side::Bid => &self.buyers,
                    Side::Ask => &self.sellers,
                };
                if pool.is_empty() {
                    continue;
                }
                pool[self.rng.gen_range(0..pool.len())]
            };

            let quote = self
                .agents
                .get_mut(&trader_id)
                .and_then(|agent| agent.quote(timestep));
            let Some(order) = quote else {
                debug!(attempt, trader = %trader_id, "trader inactive");
                continue;
            };

            match self.rules.complies(&order, self.book.last_trade()) {
                Ok(()) => {
                    self.rules.record_admitted(&order);
                    match order.side {
                        Side::Bid => self.bids_submitted += 1,
                        Side::Ask => self.asks_submitted += 1,
                    }
                    self.stats.orders_admitted += 1;
                    return Some(order);
                }
                Err(rejection) => {
                    self.stats.rejections += 1;
                    debug!(attempt, trader = %trader_id, %rejection, "quote rejected");
                }
            }
        }
        None
    }

    fn settle(&mut self, trader_id: TraderId, trade: &Trade) -> f64 {
        match self.agents.get_mut(&trader_id) {
            Some(agent) => agent.trade_settled(trade),
            None => {
                error!(trader = %trader_id, "settlement addressed unknown trader");
                0.0
            }
        }
    }

    /// Hand every trader the timestep's snapshot. Iteration order is
    /// unspecified; traders only consume their own generator streams, so
    /// determinism is unaffected.
    fn broadcast(&mut self, day: Day, timestep: Timestep) {
        let update = MarketUpdate {
            day,
            timestep,
            best_bid: self.book.best_bid().map(|b| b.price),
            best_ask: self.book.best_ask().map(|b| b.price),
            bids: self.book.bids().to_sorted_vec(),
            asks: self.book.asks().to_sorted_vec(),
            last_trade: self.book.last_trade().cloned(),
            ledger: self.book.trades(),
        };
        for agent in self.agents.values_mut() {
            agent.on_market_update(&update);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zic_market(seed: u64) -> MarketRunner {
        let info = MarketInfo {
            min_price: 1.0,
            max_price: 100.0,
            trading_days: 2,
            timesteps_per_day: 200,
        };
        let mut runner = MarketRunner::new(AuctionParameters::default(), info, seed);
        // Sellers with limits 5..14, buyers with limits 25..34: plenty of
        // crossable surplus.
        for i in 0..10 {
            runner.add_trader(&TraderSpec::new(i, Role::Seller, Algorithm::Zic, 5.0 + i as f64));
            runner.add_trader(&TraderSpec::new(
                100 + i,
                Role::Buyer,
                Algorithm::Zic,
                25.0 + i as f64,
            ));
        }
        runner
    }

    #[test]
    fn test_zic_market_trades() {
        let mut runner = zic_market(42);
        let records = runner.run_collect();

        assert!(!records.is_empty(), "crossable ZIC market produced no trades");
        for record in &records {
            // Prices within the market bounds and the traders' limits.
            assert!(record.price >= 1.0 && record.price <= 100.0);
            assert!(record.seller_limit <= record.price + 1e-9);
            assert!(record.buyer_limit >= record.price - 1e-9);
        }
    }

    #[test]
    fn test_trade_ids_restart_each_day() {
        let mut runner = zic_market(7);
        let mut sink = MemorySink::new();
        runner.run(&mut sink);

        for day in 0..sink.day_count() {
            let records = sink.day(day as u32).unwrap();
            for (i, record) in records.iter().enumerate() {
                assert_eq!(record.trade_id.0, i as u64);
                assert_eq!(record.day as usize, day);
            }
        }
    }

    #[test]
    fn test_same_seed_same_ledger() {
        let records_a = zic_market(1234).run_collect();
        let records_b = zic_market(1234).run_collect();
        assert_eq!(records_a, records_b);
    }

    #[test]
    fn test_different_seed_different_ledger() {
        let records_a = zic_market(1).run_collect();
        let records_b = zic_market(2).run_collect();
        assert_ne!(records_a, records_b);
    }

    #[test]
    fn test_stats_accumulate() {
        let mut runner = zic_market(9);
        let stats = runner.run(&mut crate::sink::NullSink);
        assert!(stats.orders_admitted > 0);
        // Every trade consumes two previously admitted quotes, and an
        // admitted quote trades at most once.
        assert!(stats.orders_admitted >= stats.trades * 2);
        // Each timestep either admits a quote or counts as idle.
        let timesteps = 2 * 200;
        assert_eq!(stats.orders_admitted + stats.idle_timesteps, timesteps);
    }

    #[test]
    fn test_seller_balances_nonnegative_in_zic_market() {
        // ZIC never quotes at a loss, so realized profit per trade is
        // nonnegative on both sides.
        let mut runner = zic_market(11);
        runner.run(&mut crate::sink::NullSink);
        for (_, balance) in runner.balances() {
            assert!(balance >= -1e-9, "loss-making balance {balance}");
        }
    }

    #[test]
    fn test_empty_market_is_idle() {
        let mut runner = MarketRunner::new(
            AuctionParameters::default(),
            MarketInfo {
                trading_days: 1,
                timesteps_per_day: 10,
                ..Default::default()
            },
            3,
        );
        let stats = runner.run(&mut crate::sink::NullSink);
        assert_eq!(stats.trades, 0);
        assert_eq!(stats.idle_timesteps, 10);
    }
}
