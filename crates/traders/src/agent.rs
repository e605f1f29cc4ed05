//! The closed set of trading policies and the factory over it.

use rand::Rng;
use rand::rngs::StdRng;
use types::{Algorithm, MarketInfo, MarketUpdate, Order, Role, Timestep, Trade, TraderId, TraderOrder};

use crate::aa::AaTrader;
use crate::traits::Trader;
use crate::zic::ZicTrader;
use crate::zip::ZipTrader;

/// A trader of any supported policy.
///
/// Construction goes through [`TraderAgent::build`], keyed on the closed
/// [`Algorithm`] enum; each variant draws its private generator seed from
/// the simulation's master generator, so one run seed governs every
/// trader's stream.
pub enum TraderAgent {
    Zic(ZicTrader),
    Zip(ZipTrader),
    Aa(AaTrader),
}

impl TraderAgent {
    /// Build a trader for the given policy.
    pub fn build(
        algorithm: Algorithm,
        id: TraderId,
        role: Role,
        info: MarketInfo,
        master: &mut StdRng,
    ) -> Self {
        let seed: u64 = master.r#gen();
        match algorithm {
            Algorithm::Zic => TraderAgent::Zic(ZicTrader::new(id, role, info, seed)),
            Algorithm::Zip => TraderAgent::Zip(ZipTrader::new(id, role, info, seed)),
            Algorithm::Aa => TraderAgent::Aa(AaTrader::new(id, role, info, seed)),
        }
    }

    fn inner(&self) -> &dyn Trader {
        match self {
            TraderAgent::Zic(t) => t,
            TraderAgent::Zip(t) => t,
            TraderAgent::Aa(t) => t,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Trader {
        match self {
            TraderAgent::Zic(t) => t,
            TraderAgent::Zip(t) => t,
            TraderAgent::Aa(t) => t,
        }
    }
}

impl Trader for TraderAgent {
    fn id(&self) -> TraderId {
        self.inner().id()
    }

    fn role(&self) -> Role {
        self.inner().role()
    }

    fn algorithm(&self) -> Algorithm {
        self.inner().algorithm()
    }

    fn assign_jobs(&mut self, jobs: Vec<TraderOrder>) {
        self.inner_mut().assign_jobs(jobs);
    }

    fn push_job(&mut self, job: TraderOrder) {
        self.inner_mut().push_job(job);
    }

    fn quote(&mut self, timestep: Timestep) -> Option<Order> {
        self.inner_mut().quote(timestep)
    }

    fn on_market_update(&mut self, update: &MarketUpdate<'_>) {
        self.inner_mut().on_market_update(update);
    }

    fn trade_settled(&mut self, trade: &Trade) -> f64 {
        self.inner_mut().trade_settled(trade)
    }

    fn pending_jobs(&self) -> &[TraderOrder] {
        self.inner().pending_jobs()
    }

    fn balance(&self) -> f64 {
        self.inner().balance()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use types::Side;

    #[test]
    fn test_factory_builds_each_variant() {
        let mut rng = StdRng::seed_from_u64(1);
        let info = MarketInfo::default();

        let zic = TraderAgent::build(Algorithm::Zic, TraderId(1), Role::Buyer, info, &mut rng);
        let zip = TraderAgent::build(Algorithm::Zip, TraderId(2), Role::Seller, info, &mut rng);
        let aa = TraderAgent::build(Algorithm::Aa, TraderId(3), Role::Buyer, info, &mut rng);

        assert_eq!(zic.algorithm(), Algorithm::Zic);
        assert_eq!(zip.algorithm(), Algorithm::Zip);
        assert_eq!(aa.algorithm(), Algorithm::Aa);
        assert_eq!(zip.id(), TraderId(2));
        assert_eq!(aa.role(), Role::Buyer);
    }

    #[test]
    fn test_delegation_reaches_policy() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut agent = TraderAgent::build(
            Algorithm::Zic,
            TraderId(4),
            Role::Seller,
            MarketInfo::default(),
            &mut rng,
        );
        assert!(agent.quote(0).is_none());

        agent.assign_jobs(vec![TraderOrder::new(Side::Ask, 30.0, 1)]);
        let order = agent.quote(0).unwrap();
        assert!(order.price >= 30.0);
        assert_eq!(agent.pending_jobs().len(), 1);
    }
}
