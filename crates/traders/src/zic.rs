//! ZIC - the zero-intelligence-constrained trader (Gode & Sunder).
//!
//! Quotes are drawn uniformly at random from the feasible non-loss range:
//! an ask with limit L draws from `[L, max_price]`, a bid from
//! `[min_price, L]`. The policy is blind to market data; its constraint
//! alone prevents loss-making quotes.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::warn;
use types::{Algorithm, MarketInfo, MarketUpdate, Order, Role, Side, Timestep, Trade, TraderId, TraderOrder};

use crate::traits::{Trader, TraderCore};

/// A zero-intelligence-constrained trader.
pub struct ZicTrader {
    core: TraderCore,
    rng: StdRng,
}

impl ZicTrader {
    /// Create a ZIC trader with its own seeded generator.
    pub fn new(id: TraderId, role: Role, info: MarketInfo, seed: u64) -> Self {
        Self {
            core: TraderCore::new(id, role, info),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn draw_price(&mut self, job: &TraderOrder) -> f64 {
        let info = &self.core.info;
        match job.side {
            // Bid in [min_price, limit]; a limit at or below the floor just
            // quotes the limit itself.
            Side::Bid => {
                if job.limit_price > info.min_price {
                    self.rng.gen_range(info.min_price..=job.limit_price)
                } else {
                    job.limit_price
                }
            }
            // Ask in [limit, max_price].
            Side::Ask => {
                if info.max_price > job.limit_price {
                    self.rng.gen_range(job.limit_price..=info.max_price)
                } else {
                    job.limit_price
                }
            }
        }
    }
}

impl Trader for ZicTrader {
    fn id(&self) -> TraderId {
        self.core.id
    }

    fn role(&self) -> Role {
        self.core.role
    }

    fn algorithm(&self) -> Algorithm {
        Algorithm::Zic
    }

    fn assign_jobs(&mut self, jobs: Vec<TraderOrder>) {
        self.core.assign(jobs);
    }

    fn push_job(&mut self, job: TraderOrder) {
        self.core.push(job);
    }

    fn quote(&mut self, timestep: Timestep) -> Option<Order> {
        let job = self.core.head_job()?.clone();
        if !job.is_valid() {
            warn!(trader = %self.core.id, ?job, "dropping invalid job");
            self.core.drop_head_job();
            return None;
        }
        let price = self.draw_price(&job);
        Some(Order::new(self.core.id, job.side, price, job.quantity, timestep))
    }

    fn on_market_update(&mut self, _update: &MarketUpdate<'_>) {
        // ZIC ignores market data.
    }

    fn trade_settled(&mut self, trade: &Trade) -> f64 {
        self.core.settle(trade)
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

    fn seller(seed: u64, limit: f64) -> ZicTrader {
        let mut trader = ZicTrader::new(TraderId(1), Role::Seller, MarketInfo::default(), seed);
        trader.assign_jobs(vec![TraderOrder::new(Side::Ask, limit, 1)]);
        trader
    }

    fn buyer(seed: u64, limit: f64) -> ZicTrader {
        let mut trader = ZicTrader::new(TraderId(2), Role::Buyer, MarketInfo::default(), seed);
        trader.assign_jobs(vec![TraderOrder::new(Side::Bid, limit, 1)]);
        trader
    }

    #[test]
    fn test_ask_quotes_never_loss_making() {
        let mut trader = seller(7, 40.0);
        for ts in 0..200 {
            let order = trader.quote(ts).unwrap();
            assert!(order.price >= 40.0 && order.price <= 100.0);
            assert_eq!(order.side, Side::Ask);
        }
    }

    #[test]
    fn test_bid_quotes_never_loss_making() {
        let mut trader = buyer(11, 60.0);
        for ts in 0..200 {
            let order = trader.quote(ts).unwrap();
            assert!(order.price >= 1.0 && order.price <= 60.0);
        }
    }

    #[test]
    fn test_no_job_is_inactive() {
        let mut trader = ZicTrader::new(TraderId(3), Role::Buyer, MarketInfo::default(), 1);
        assert!(trader.quote(0).is_none());
    }

    #[test]
    fn test_invalid_job_dropped() {
        let mut trader = ZicTrader::new(TraderId(3), Role::Buyer, MarketInfo::default(), 1);
        trader.assign_jobs(vec![
            TraderOrder::new(Side::Bid, 0.0, 1),
            TraderOrder::new(Side::Bid, 20.0, 1),
        ]);

        // First request discards the bad head and stays silent.
        assert!(trader.quote(0).is_none());
        // Next request works the queued valid job.
        let order = trader.quote(1).unwrap();
        assert!(order.price <= 20.0);
    }

    #[test]
    fn test_degenerate_band_quotes_the_limit() {
        let mut trader = buyer(5, 1.0);
        let order = trader.quote(0).unwrap();
        assert_eq!(order.price, 1.0);
    }

    #[test]
    fn test_same_seed_same_draws() {
        let mut a = seller(99, 30.0);
        let mut b = seller(99, 30.0);
        for ts in 0..20 {
            assert_eq!(a.quote(ts).unwrap().price, b.quote(ts).unwrap().price);
        }
    }
}
