//! The trader capability trait and the state every policy shares.

use tracing::warn;
use types::{Algorithm, MarketInfo, MarketUpdate, Order, Role, Timestep, Trade, TraderId, TraderOrder};

/// The capability set every trading policy implements.
///
/// Traders are passive responders: the exchange invokes them synchronously,
/// one call at a time. A quote request with an empty or invalid head job
/// returns `None` (the trader is inactive this timestep).
pub trait Trader {
    /// Unique identifier.
    fn id(&self) -> TraderId;

    /// Buyer or seller; fixed for the length of a run.
    fn role(&self) -> Role;

    /// The policy driving this trader.
    fn algorithm(&self) -> Algorithm;

    /// Replace the pending-job queue with a fresh allocation.
    fn assign_jobs(&mut self, jobs: Vec<TraderOrder>);

    /// Append one job to the back of the queue.
    fn push_job(&mut self, job: TraderOrder);

    /// Produce a quote for the head job, or `None` when inactive.
    fn quote(&mut self, timestep: Timestep) -> Option<Order>;

    /// Absorb the per-timestep market snapshot.
    fn on_market_update(&mut self, update: &MarketUpdate<'_>);

    /// Settle a trade this trader participated in.
    ///
    /// Returns the limit price the trader actually worked against, for the
    /// exchange's efficiency accounting.
    fn trade_settled(&mut self, trade: &Trade) -> f64;

    /// The queue of pending jobs; the head is the job being worked.
    fn pending_jobs(&self) -> &[TraderOrder];

    /// Cumulative profit across settled trades.
    fn balance(&self) -> f64;
}

/// State common to every policy: identity, market constants, the job
/// queue, and the running profit balance.
#[derive(Debug, Clone)]
pub struct TraderCore {
    pub id: TraderId,
    pub role: Role,
    pub info: MarketInfo,
    jobs: Vec<TraderOrder>,
    balance: f64,
}

impl TraderCore {
    /// Create a fresh core with an empty job queue.
    pub fn new(id: TraderId, role: Role, info: MarketInfo) -> Self {
        Self {
            id,
            role,
            info,
            jobs: Vec::new(),
            balance: 0.0,
        }
    }

    /// The job currently being worked, if any.
    pub fn head_job(&self) -> Option<&TraderOrder> {
        self.jobs.first()
    }

    /// Drop the head job (used when the head turns out invalid).
    pub fn drop_head_job(&mut self) -> Option<TraderOrder> {
        if self.jobs.is_empty() {
            None
        } else {
            Some(self.jobs.remove(0))
        }
    }

    /// Replace the queue.
    pub fn assign(&mut self, jobs: Vec<TraderOrder>) {
        self.jobs = jobs;
    }

    /// Append a job.
    pub fn push(&mut self, job: TraderOrder) {
        self.jobs.push(job);
    }

    /// The pending queue.
    pub fn jobs(&self) -> &[TraderOrder] {
        &self.jobs
    }

    /// Whether any job is pending.
    pub fn has_jobs(&self) -> bool {
        !self.jobs.is_empty()
    }

    /// Cumulative profit.
    pub fn balance(&self) -> f64 {
        self.balance
    }

    /// Book the profit of a settled trade against the head job and consume
    /// the job. Returns the limit price that was worked.
    pub fn settle(&mut self, trade: &Trade) -> f64 {
        let Some(job) = self.head_job() else {
            warn!(trader = %self.id, trade = %trade.id, "settlement with no pending job");
            return 0.0;
        };
        let limit = job.limit_price;
        if trade.seller() == self.id {
            self.balance += trade.price - limit;
        } else {
            self.balance += limit - trade.price;
        }
        self.jobs.remove(0);
        limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::{Side, TradeId};

    fn trade(buyer: u32, seller: u32, price: f64) -> Trade {
        Trade {
            id: TradeId(0),
            buy: Order::new(TraderId(buyer), Side::Bid, price, 1, 0),
            sell: Order::new(TraderId(seller), Side::Ask, price, 1, 0),
            price,
            timestep: 0,
        }
    }

    #[test]
    fn test_settle_books_seller_profit() {
        let mut core = TraderCore::new(TraderId(2), Role::Seller, MarketInfo::default());
        core.assign(vec![TraderOrder::new(Side::Ask, 7.0, 1)]);

        let limit = core.settle(&trade(1, 2, 10.0));
        assert_eq!(limit, 7.0);
        assert!((core.balance() - 3.0).abs() < 1e-12);
        assert!(!core.has_jobs());
    }

    #[test]
    fn test_settle_books_buyer_profit() {
        let mut core = TraderCore::new(TraderId(1), Role::Buyer, MarketInfo::default());
        core.assign(vec![TraderOrder::new(Side::Bid, 14.0, 1)]);

        let limit = core.settle(&trade(1, 2, 10.0));
        assert_eq!(limit, 14.0);
        assert!((core.balance() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_settle_without_job_is_harmless() {
        let mut core = TraderCore::new(TraderId(1), Role::Buyer, MarketInfo::default());
        assert_eq!(core.settle(&trade(1, 2, 10.0)), 0.0);
        assert_eq!(core.balance(), 0.0);
    }
}
