//! ZIP - zero-intelligence-plus margin adaptation, after Cliff (1997).
//!
//! The policy keeps a signed profit margin per side (`margin_buy <= 0`,
//! `margin_sell >= 0`) and quotes `round2(limit * (1 + margin))`. Each
//! market update is classified — a deal at some shout price, or a best-quote
//! improvement — and the margin is nudged toward a randomly perturbed target
//! with a momentum-smoothed step. The decision logic follows the
//! BristolStockExchange formulation of the original paper.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::warn;
use types::{Algorithm, MarketInfo, MarketUpdate, Order, Role, Side, Timestep, Trade, TraderId, TraderOrder};

use crate::traits::{Trader, TraderCore};

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// A ZIP trader.
pub struct ZipTrader {
    core: TraderCore,
    rng: StdRng,

    // Learning parameters, drawn once per trader.
    beta: f64,
    momentum: f64,
    /// Absolute perturbation coefficient for target generation.
    ca: f64,
    /// Relative perturbation coefficient for target generation.
    cr: f64,

    // Adapted state.
    last_delta: f64,
    margin_buy: f64,
    margin_sell: f64,
    margin: f64,

    // Current job.
    active: bool,
    working_side: Option<Side>,
    limit_price: f64,
    price: f64,
}

impl ZipTrader {
    /// Create a ZIP trader, drawing its learning parameters from the seed.
    pub fn new(id: TraderId, role: Role, info: MarketInfo, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let beta = 0.1 + 0.4 * rng.gen_range(0.0..1.0);
        let momentum = 0.2 + 0.6 * rng.gen_range(0.0..1.0);
        let margin_buy = -(0.05 + 0.3 * rng.gen_range(0.0..1.0));
        let margin_sell = 0.05 + 0.3 * rng.gen_range(0.0..1.0);

        Self {
            core: TraderCore::new(id, role, info),
            rng,
            beta,
            momentum,
            ca: 0.05,
            cr: 0.05,
            last_delta: 0.0,
            margin_buy,
            margin_sell,
            margin: 0.0,
            active: false,
            working_side: None,
            limit_price: 0.0,
            price: 0.0,
        }
    }

    /// Current buy-side margin (always <= 0).
    pub fn margin_buy(&self) -> f64 {
        self.margin_buy
    }

    /// Current sell-side margin (always >= 0).
    pub fn margin_sell(&self) -> f64 {
        self.margin_sell
    }

    /// Quote price implied by the committed margin.
    pub fn price(&self) -> f64 {
        self.price
    }

    fn set_price(&mut self) {
        self.price = round2(self.limit_price * (1.0 + self.margin));
    }

    fn adopt_head_job(&mut self) -> Option<TraderOrder> {
        let job = self.core.head_job()?.clone();
        self.active = true;
        self.working_side = Some(job.side);
        self.limit_price = job.limit_price;
        self.margin = if job.is_bid() { self.margin_buy } else { self.margin_sell };
        self.set_price();
        Some(job)
    }

    /// Generate a target that raises profit relative to the given price:
    /// higher for sellers, lower for buyers.
    fn target_up(&mut self, price: f64) -> f64 {
        let absolute = self.ca * self.rng.gen_range(0.0..1.0);
        match self.core.role {
            Role::Seller => price * (1.0 + self.cr * self.rng.gen_range(0.0..1.0)) + absolute,
            Role::Buyer => price * (1.0 - self.cr * self.rng.gen_range(0.0..1.0)) - absolute,
        }
    }

    /// Generate a target that concedes profit relative to the given price.
    fn target_down(&mut self, price: f64) -> f64 {
        let absolute = self.ca * self.rng.gen_range(0.0..1.0);
        match self.core.role {
            Role::Seller => price * (1.0 - self.cr * self.rng.gen_range(0.0..1.0)) - absolute,
            Role::Buyer => price * (1.0 + self.cr * self.rng.gen_range(0.0..1.0)) + absolute,
        }
    }

    /// Momentum step toward the target; the new margin is committed only if
    /// it preserves the side's sign invariant.
    fn profit_alter(&mut self, target: f64) {
        let diff = target - self.price;
        let change = (1.0 - self.momentum) * (self.beta * diff) + self.momentum * self.last_delta;
        self.last_delta = change;

        if self.limit_price <= 0.0 {
            return;
        }
        let new_margin = ((self.price + change) / self.limit_price) - 1.0;

        match self.working_side {
            Some(Side::Bid) => {
                if new_margin < 0.0 {
                    self.margin_buy = new_margin;
                    self.margin = new_margin;
                }
            }
            Some(Side::Ask) => {
                if new_margin > 0.0 {
                    self.margin_sell = new_margin;
                    self.margin = new_margin;
                }
            }
            None => {}
        }
        self.set_price();
    }

    fn seller_update(&mut self, update: &MarketUpdate<'_>) {
        if update.traded_this_step() {
            let Some(last) = update.last_trade.clone() else { return };
            // The accepted shout's own price, not the formed trade price.
            let mut shout_price = last.sell.price;
            if last.buy.timestep == update.timestep {
                shout_price = last.buy.price;
            }

            // A deal at q: sellers quoting below q can raise profit.
            if self.price <= shout_price {
                let target = self.target_up(shout_price);
                self.profit_alter(target);
            }
            // The accepted shout was a bid: active sellers priced above it
            // must concede.
            if last.buy.timestep == update.timestep && self.active && self.price >= shout_price {
                let target = self.target_down(shout_price);
                self.profit_alter(target);
            }
        } else if update.best_ask.is_some() {
            // No deal: the newest ask out-quoting us forces a concession.
            if let Some(last_ask) = update.asks.last() {
                if self.active && self.price >= last_ask.price {
                    let target = self.target_down(last_ask.price);
                    self.profit_alter(target);
                }
            }
        }
    }

    fn buyer_update(&mut self, update: &MarketUpdate<'_>) {
        if update.traded_this_step() {
            let Some(last) = update.last_trade.clone() else { return };
            let mut shout_price = last.sell.price;
            if last.buy.timestep == update.timestep {
                shout_price = last.buy.price;
            }

            // A deal at q: buyers quoting above q can raise profit.
            if self.price >= shout_price {
                let target = self.target_up(shout_price);
                self.profit_alter(target);
            }
            // The accepted shout was an offer: active buyers priced below it
            // must concede.
            if last.sell.timestep == update.timestep && self.active && self.price <= shout_price {
                let target = self.target_down(shout_price);
                self.profit_alter(target);
            }
        } else if update.best_bid.is_some() {
            if let Some(last_bid) = update.bids.last() {
                if self.active && self.price <= last_bid.price {
                    let target = self.target_down(last_bid.price);
                    self.profit_alter(target);
                }
            }
        }
    }
}

impl Trader for ZipTrader {
    fn id(&self) -> TraderId {
        self.core.id
    }

    fn role(&self) -> Role {
        self.core.role
    }

    fn algorithm(&self) -> Algorithm {
        Algorithm::Zip
    }

    fn assign_jobs(&mut self, jobs: Vec<TraderOrder>) {
        self.core.assign(jobs);
        self.adopt_head_job();
    }

    fn push_job(&mut self, job: TraderOrder) {
        self.core.push(job);
    }

    fn quote(&mut self, timestep: Timestep) -> Option<Order> {
        if self.core.head_job().is_none() {
            self.active = false;
            return None;
        }
        if !self.core.head_job().is_some_and(TraderOrder::is_valid) {
            warn!(trader = %self.core.id, "dropping invalid job");
            self.core.drop_head_job();
            return None;
        }

        let job = self.adopt_head_job()?;
        Some(Order::new(self.core.id, job.side, self.price, job.quantity, timestep))
    }

    fn on_market_update(&mut self, update: &MarketUpdate<'_>) {
        match self.core.role {
            Role::Seller => self.seller_update(update),
            Role::Buyer => self.buyer_update(update),
        }
    }

    fn trade_settled(&mut self, trade: &Trade) -> f64 {
        let limit = self.core.settle(trade);
        if !self.core.has_jobs() {
            self.active = false;
        }
        limit
    }

    fn pending_jobs(&self) -> &[TraderOrder] {
        self.core.jobs()
    }

    fn balance(&self) -> f64 {
        self.core.balance()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::TradeId;

    fn seller(seed: u64, limit: f64) -> ZipTrader {
        let mut trader = ZipTrader::new(TraderId(1), Role::Seller, MarketInfo::default(), seed);
        trader.assign_jobs(vec![TraderOrder::new(Side::Ask, limit, 1)]);
        trader
    }

    fn buyer(seed: u64, limit: f64) -> ZipTrader {
        let mut trader = ZipTrader::new(TraderId(2), Role::Buyer, MarketInfo::default(), seed);
        trader.assign_jobs(vec![TraderOrder::new(Side::Bid, limit, 1)]);
        trader
    }

    #[test]
    fn test_initial_margins_respect_signs() {
        for seed in 0..50 {
            let trader = ZipTrader::new(TraderId(1), Role::Seller, MarketInfo::default(), seed);
            assert!(trader.margin_buy() <= 0.0);
            assert!(trader.margin_sell() >= 0.0);
        }
    }

    #[test]
    fn test_quote_derives_from_margin() {
        let mut trader = seller(3, 20.0);
        let order = trader.quote(1).unwrap();
        let expected = round2(20.0 * (1.0 + trader.margin_sell()));
        assert_eq!(order.price, expected);
        // Sellers never quote below their limit.
        assert!(order.price >= 20.0);
    }

    #[test]
    fn test_sign_invariant_survives_profit_alter() {
        let mut s = seller(5, 20.0);
        s.quote(0);
        let mut b = buyer(6, 20.0);
        b.quote(0);

        for i in 0..500 {
            let target = 1.0 + (i % 40) as f64;
            s.profit_alter(target);
            b.profit_alter(target);
            assert!(s.margin_sell() >= 0.0, "sell margin went negative at step {i}");
            assert!(b.margin_buy() <= 0.0, "buy margin went positive at step {i}");
        }
    }

    #[test]
    fn test_inactive_without_jobs() {
        let mut trader = ZipTrader::new(TraderId(9), Role::Buyer, MarketInfo::default(), 1);
        assert!(trader.quote(0).is_none());
        assert!(trader.pending_jobs().is_empty());
    }

    #[test]
    fn test_settlement_deactivates_when_queue_empties() {
        let mut trader = seller(4, 10.0);
        trader.quote(0).unwrap();

        let trade = Trade {
            id: TradeId(0),
            buy: Order::new(TraderId(7), Side::Bid, 12.0, 1, 0),
            sell: Order::new(TraderId(1), Side::Ask, 10.0, 1, 0),
            price: 11.0,
            timestep: 0,
        };
        let limit = trader.trade_settled(&trade);
        assert_eq!(limit, 10.0);
        assert!((trader.balance() - 1.0).abs() < 1e-12);
        assert!(trader.quote(1).is_none());
    }

    #[test]
    fn test_seller_concedes_when_outquoted() {
        let mut trader = seller(8, 10.0);
        trader.quote(0).unwrap();
        let initial_price = trader.price();

        // A fresher, cheaper ask is resident; no deal this step.
        let competing = Order::new(TraderId(5), Side::Ask, initial_price - 2.0, 1, 1);
        let update = MarketUpdate {
            day: 0,
            timestep: 1,
            best_bid: None,
            best_ask: Some(competing.price),
            bids: vec![],
            asks: vec![competing],
            last_trade: None,
            ledger: &[],
        };
        trader.on_market_update(&update);

        assert!(trader.price() <= initial_price);
        assert!(trader.margin_sell() >= 0.0);
    }
}
