//! Fitness evaluation over completed runs.
//!
//! The evaluator consumes the in-memory [`TradeRecord`]s a run produced and
//! scores them against the theoretical market: Smith's alpha measures
//! convergence of trade prices to the supply/demand equilibrium (lower is
//! better), allocative efficiency measures how much of the theoretical
//! surplus the auction extracted (higher is better).

use std::fmt;

use types::TradeRecord;

/// Configuration errors detected before any simulation runs.
#[derive(Debug, Clone, PartialEq)]
pub enum FitnessError {
    /// Supply and demand curves never intersect, so no equilibrium price
    /// exists for the requested fitness function.
    NoIntersection,
}

impl fmt::Display for FitnessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FitnessError::NoIntersection => {
                write!(f, "supply and demand curves do not intersect")
            }
        }
    }
}

impl std::error::Error for FitnessError {}

/// Intersect the supply and demand curves built from the traders' limit
/// prices.
///
/// Returns the equilibrium price and quantity (the number of units that
/// trade at equilibrium). Sellers are sorted cheapest-first and buyers
/// dearest-first; the curves cross at the first index where the bid no
/// longer exceeds the ask.
pub fn equilibrium(
    seller_limits: &[f64],
    buyer_limits: &[f64],
) -> Result<(f64, usize), FitnessError> {
    let mut asks = seller_limits.to_vec();
    let mut bids = buyer_limits.to_vec();
    asks.sort_by(|a, b| a.total_cmp(b));
    bids.sort_by(|a, b| b.total_cmp(a));

    for (ix, (ask, bid)) in asks.iter().zip(bids.iter()).enumerate() {
        if bid == ask {
            return Ok((*ask, ix));
        }
        if bid < ask {
            // The dearest bid under the cheapest ask means the curves never
            // meet at all; that is a configuration error, not an equilibrium
            // of quantity zero.
            if ix == 0 {
                break;
            }
            return Ok(((bid + ask) / 2.0, ix));
        }
    }
    Err(FitnessError::NoIntersection)
}

/// Maximum theoretical surplus at the equilibrium price: the seller side
/// collects `pe - limit` over every ask below `pe`, the buyer side
/// `limit - pe` over every bid above it.
pub fn max_surplus(seller_limits: &[f64], buyer_limits: &[f64], pe: f64) -> (f64, f64) {
    let seller: f64 = seller_limits
        .iter()
        .filter(|limit| **limit < pe)
        .map(|limit| pe - limit)
        .sum();
    let buyer: f64 = buyer_limits
        .iter()
        .filter(|limit| **limit > pe)
        .map(|limit| limit - pe)
        .sum();
    (seller, buyer)
}

/// Smith's alpha over a run: `100 / pe * sqrt(mean((price - pe)^2))`.
///
/// Zero when no trades occurred. Lower is better: a smooth market trades
/// tightly around the equilibrium.
pub fn alpha(records: &[TradeRecord], pe: f64) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    let mean_sq = records
        .iter()
        .map(|r| (r.price - pe).powi(2))
        .sum::<f64>()
        / records.len() as f64;
    100.0 / pe * mean_sq.sqrt()
}

/// Allocative efficiency: realized surplus over the theoretical maximum.
///
/// `max_total_surplus` should already cover all trading days of the run.
pub fn efficiency(records: &[TradeRecord], max_total_surplus: f64) -> f64 {
    if records.is_empty() || max_total_surplus <= 0.0 {
        return 0.0;
    }
    records.iter().map(TradeRecord::surplus).sum::<f64>() / max_total_surplus
}
