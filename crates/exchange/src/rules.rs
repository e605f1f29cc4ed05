//! Shout-admission rule pipeline.
//!
//! Every solicited quote passes through four rules before it may enter the
//! book. The pipeline short-circuits: the first failing rule wins and the
//! quote is rejected for that reason alone.
//!
//! 1. Price bounds — the quote must lie in `[min_price, max_price]`.
//! 2. Equilibrium band — once `window_size_ee` trades have been seen, a bid
//!    must quote at least `Pe - delta_ee` and an ask at most `Pe + delta_ee`,
//!    where `Pe` is the mean of the trade-price window.
//! 3. Max-shift — once any trade exists, the quote may not move more than
//!    `last_price * max_shift` away from the last trade price.
//! 4. Dominance — a trader whose previous same-side shout was admitted
//!    fewer than `dominance` timesteps ago is rejected.

use std::collections::{HashMap, VecDeque};

use tracing::debug;
use types::{AuctionParameters, MarketInfo, Order, Side, Timestep, Trade, TraderId};

/// Why a quote was refused admission. Non-fatal: the engine simply retries.
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    /// Price outside the market's global bounds.
    OutOfBounds { price: f64 },
    /// Price outside the equilibrium-estimate band.
    OutsideEquilibriumBand { price: f64, estimate: f64 },
    /// Price moved too far from the last trade price.
    ExcessiveShift { price: f64, last_price: f64 },
    /// Same-side shout within the trader's cooldown window.
    Dominance { trader: TraderId, last_timestep: Timestep },
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::OutOfBounds { price } => write!(f, "price {:.2} outside market bounds", price),
            Rejection::OutsideEquilibriumBand { price, estimate } => {
                write!(f, "price {:.2} outside band around estimate {:.2}", price, estimate)
            }
            Rejection::ExcessiveShift { price, last_price } => {
                write!(f, "price {:.2} shifts too far from last trade {:.2}", price, last_price)
            }
            Rejection::Dominance { trader, last_timestep } => {
                write!(f, "{} still cooling down since t={}", trader, last_timestep)
            }
        }
    }
}

/// Rule state: the trade-price window for the equilibrium estimate and the
/// per-trader, per-side timestamps of the last admitted shout.
#[derive(Debug, Clone)]
pub struct ShoutRules {
    params: AuctionParameters,
    info: MarketInfo,
    recent_prices: VecDeque<f64>,
    last_bid: HashMap<TraderId, Timestep>,
    last_ask: HashMap<TraderId, Timestep>,
}

impl ShoutRules {
    /// Create the pipeline for a run.
    pub fn new(params: AuctionParameters, info: MarketInfo) -> Self {
        Self {
            params,
            info,
            recent_prices: VecDeque::with_capacity(params.window_size_ee),
            last_bid: HashMap::new(),
            last_ask: HashMap::new(),
        }
    }

    /// Mean of the trade-price window once it is full.
    pub fn equilibrium_estimate(&self) -> Option<f64> {
        let window = self.params.window_size_ee;
        (window > 0 && self.recent_prices.len() >= window)
            .then(|| self.recent_prices.iter().sum::<f64>() / self.recent_prices.len() as f64)
    }

    /// Run the pipeline. `Ok(())` admits the quote; the first failing rule
    /// is returned otherwise.
    pub fn complies(&self, order: &Order, last_trade: Option<&Trade>) -> Result<(), Rejection> {
        self.check_bounds(order)?;
        self.check_equilibrium_band(order)?;
        self.check_max_shift(order, last_trade)?;
        self.check_dominance(order)?;
        Ok(())
    }

    fn check_bounds(&self, order: &Order) -> Result<(), Rejection> {
        let in_bounds = order.price >= self.info.min_price && order.price <= self.info.max_price;
        if in_bounds {
            Ok(())
        } else {
            Err(Rejection::OutOfBounds { price: order.price })
        }
    }

    fn check_equilibrium_band(&self, order: &Order) -> Result<(), Rejection> {
        // Passes unconditionally until the window has filled.
        let Some(estimate) = self.equilibrium_estimate() else {
            return Ok(());
        };
        let admitted = match order.side {
            Side::Bid => order.price >= estimate - self.params.delta_ee,
            Side::Ask => order.price <= estimate + self.params.delta_ee,
        };
        if admitted {
            Ok(())
        } else {
            Err(Rejection::OutsideEquilibriumBand {
                price: order.price,
                estimate,
            })
        }
    }

    fn check_max_shift(&self, order: &Order, last_trade: Option<&Trade>) -> Result<(), Rejection> {
        let Some(last) = last_trade else {
            return Ok(());
        };
        if (last.price - order.price).abs() < last.price * self.params.max_shift {
            Ok(())
        } else {
            Err(Rejection::ExcessiveShift {
                price: order.price,
                last_price: last.price,
            })
        }
    }

    fn check_dominance(&self, order: &Order) -> Result<(), Rejection> {
        if self.params.dominance == 0 {
            return Ok(());
        }
        let last = match order.side {
            Side::Bid => self.last_bid.get(&order.trader_id),
            Side::Ask => self.last_ask.get(&order.trader_id),
        };
        match last {
            Some(&ts) if order.timestep.saturating_sub(ts) < self.params.dominance => {
                Err(Rejection::Dominance {
                    trader: order.trader_id,
                    last_timestep: ts,
                })
            }
            _ => Ok(()),
        }
    }

    /// Note an admitted shout for the dominance cooldown.
    pub fn record_admitted(&mut self, order: &Order) {
        let map = match order.side {
            Side::Bid => &mut self.last_bid,
            Side::Ask => &mut self.last_ask,
        };
        map.insert(order.trader_id, order.timestep);
    }

    /// Push a formed trade price into the equilibrium-estimate window.
    pub fn record_trade_price(&mut self, price: f64) {
        if self.params.window_size_ee == 0 {
            return;
        }
        if self.recent_prices.len() == self.params.window_size_ee {
            let dropped = self.recent_prices.pop_front();
            debug!(?dropped, price, "equilibrium window rolled");
        }
        self.recent_prices.push_back(price);
    }

    /// Clear all per-day rule state.
    pub fn reset_for_new_day(&mut self) {
        self.recent_prices.clear();
        self.last_bid.clear();
        self.last_ask.clear();
    }
}
