//! AA - the adaptive-aggressive trader, after Vytelingum & Cliff.
//!
//! The policy estimates the market equilibrium with an exponential moving
//! average of trade prices, tracks market smoothness through Smith's alpha
//! over a short window, and adapts a responsiveness parameter `theta` plus a
//! per-side aggressiveness toward targets derived from the r-shout mapping.
//! Target prices come from closed-form exponential curves where possible and
//! from a Newton-Raphson estimate of an effective theta otherwise.
//!
//! The mathematics follows the BristolStockExchange formulation. Several
//! internal fields keep the reference implementation's negative-sentinel
//! convention for "not yet seeded"; they never cross the public interface.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::warn;
use types::{Algorithm, MarketInfo, MarketUpdate, Order, Role, Side, Timestep, Trade, TraderId, TraderOrder};

use crate::traits::{Trader, TraderCore};

/// An adaptive-aggressive trader.
pub struct AaTrader {
    core: TraderCore,

    // Fixed behavioural constants.
    spin_up_time: u32,
    eta: f64,
    theta_max: f64,
    theta_min: f64,
    lambda_a: f64,
    lambda_r: f64,
    beta1: f64,
    beta2: f64,
    gamma: f64,
    n_last_trades: usize,
    ema: f64,
    max_newton_iter: u32,
    max_newton_error: f64,

    // Adapted state; negative values mean "not yet seeded".
    theta: f64,
    equilibrium: f64,
    smiths_alpha: f64,
    smiths_alpha_min: f64,
    smiths_alpha_max: f64,
    agres_buy: f64,
    agres_sell: f64,
    target_buy: f64,
    target_sell: f64,

    // Current job.
    active: bool,
    limit_price: f64,

    // Market view; -1.0 means no best quote seen yet.
    prev_best_bid: f64,
    prev_best_ask: f64,
    last_trades: Vec<f64>,
}

impl AaTrader {
    /// Create an AA trader, drawing theta and the initial aggressiveness
    /// from the seed.
    pub fn new(id: TraderId, role: Role, info: MarketInfo, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let n_last_trades = 5usize;

        Self {
            core: TraderCore::new(id, role, info),
            spin_up_time: 20,
            eta: 3.0,
            theta_max: 2.0,
            theta_min: 8.0,
            lambda_a: 0.01,
            lambda_r: 0.02,
            beta1: 0.4,
            beta2: 0.4,
            gamma: 2.0,
            n_last_trades,
            ema: 2.0 / (n_last_trades as f64 + 1.0),
            max_newton_iter: 10,
            max_newton_error: 1e-4,
            theta: -(5.0 * rng.gen_range(0.0..1.0)),
            equilibrium: -1.0,
            smiths_alpha: -1.0,
            smiths_alpha_min: -1.0,
            smiths_alpha_max: -1.0,
            agres_buy: -0.3 * rng.gen_range(0.0..1.0),
            agres_sell: -0.3 * rng.gen_range(0.0..1.0),
            target_buy: -1.0,
            target_sell: -1.0,
            active: false,
            limit_price: 0.0,
            prev_best_bid: -1.0,
            prev_best_ask: -1.0,
            last_trades: Vec::new(),
        }
    }

    /// Current responsiveness parameter.
    pub fn theta(&self) -> f64 {
        self.theta
    }

    /// Equilibrium estimate, once seeded by the first observed trade.
    pub fn equilibrium(&self) -> Option<f64> {
        (self.equilibrium > 0.0).then_some(self.equilibrium)
    }

    fn update_equilibrium(&mut self, price: f64) {
        if self.equilibrium < 0.0 {
            self.equilibrium = price;
        } else {
            self.equilibrium = self.ema * price + (1.0 - self.ema) * self.equilibrium;
        }
    }

    fn update_smiths_alpha(&mut self, price: f64) {
        self.last_trades.push(price);
        if self.last_trades.len() > self.n_last_trades {
            self.last_trades.remove(0);
        }
        let sum: f64 = self
            .last_trades
            .iter()
            .map(|v| (v - self.equilibrium).powi(2))
            .sum();
        self.smiths_alpha = (sum / self.last_trades.len() as f64).sqrt() / self.equilibrium;

        if self.smiths_alpha_min < 0.0 {
            self.smiths_alpha_min = self.smiths_alpha;
            self.smiths_alpha_max = self.smiths_alpha;
        } else {
            self.smiths_alpha_min = self.smiths_alpha_min.min(self.smiths_alpha);
            self.smiths_alpha_max = self.smiths_alpha_max.max(self.smiths_alpha);
        }
    }

    fn update_theta(&mut self) {
        // Degenerate range (single alpha observation): treat as fully calm.
        let spread = self.smiths_alpha_max - self.smiths_alpha_min;
        let alpha_bar = if spread > 0.0 {
            (self.smiths_alpha - self.smiths_alpha_min) / spread
        } else {
            0.0
        };
        let desired = (self.theta_max - self.theta_min)
            * (1.0 - alpha_bar * (self.gamma * (alpha_bar - 1.0)).exp())
            + self.theta_min;
        let mut theta = self.theta + self.beta2 * (desired - self.theta);
        if theta == 0.0 {
            theta += 1e-7;
        }
        self.theta = theta;
    }

    /// Newton-Raphson estimate of an effective theta for the intramarginal
    /// buyer's target curve. Never returns exactly zero.
    fn newton_for_buying(&self) -> f64 {
        let mut theta_est = self.theta;
        let rhs = (self.theta * (self.limit_price - self.equilibrium)) / (self.theta.exp() - 1.0);

        for _ in 0..=self.max_newton_iter {
            let e_x = theta_est.exp();
            let ex_min_one = e_x - 1.0;
            let f_of_x = (theta_est * self.equilibrium) / ex_min_one - rhs;
            if f_of_x.abs() <= self.max_newton_error {
                break;
            }
            let df_of_x = self.equilibrium / ex_min_one
                - (e_x * self.equilibrium * theta_est) / (ex_min_one * ex_min_one);
            theta_est -= f_of_x / df_of_x;
        }

        if theta_est == 0.0 { 1e-6 } else { theta_est }
    }

    /// Newton-Raphson estimate for the intramarginal seller's curve.
    ///
    /// The residual divides by `exp(e^theta - 1)` where the buying solver
    /// divides by `e^theta - 1`.
    /// TODO: that asymmetry reads like a transcription slip against the
    /// published AA formulation; verify before changing the arithmetic.
    fn newton_for_selling(&self) -> f64 {
        let max_price = self.core.info.max_price;
        let mut theta_est = self.theta;
        let rhs = (self.theta * (self.equilibrium - self.limit_price)) / (self.theta.exp() - 1.0);

        for _ in 0..=self.max_newton_iter {
            let e_x = theta_est.exp();
            let ex_min_one = e_x - 1.0;
            let f_of_x = (theta_est * (max_price - self.equilibrium)) / ex_min_one.exp() - rhs;
            if f_of_x.abs() <= self.max_newton_error {
                break;
            }
            let df_of_x = (max_price - self.equilibrium) / ex_min_one
                - (e_x * (max_price - self.equilibrium) * theta_est) / (ex_min_one * ex_min_one);
            theta_est -= f_of_x / df_of_x;
        }

        if theta_est == 0.0 { 1e-6 } else { theta_est }
    }

    /// The r-shout value a given target corresponds to on this trader's
    /// aggressiveness curve.
    fn calc_r_shout(&self, target: f64, buying: bool) -> f64 {
        if buying {
            // Extramarginal buyer: flat at zero.
            if self.equilibrium >= self.limit_price {
                return 0.0;
            }
            if target > self.equilibrium {
                let capped = target.min(self.limit_price);
                return (((capped - self.equilibrium) * (self.theta.exp() - 1.0))
                    / (self.limit_price - self.equilibrium)
                    + 1.0)
                    .ln()
                    / self.theta;
            }
            let theta_est = self.newton_for_buying();
            return ((1.0 - target / self.equilibrium) * (theta_est.exp() - 1.0) + 1.0).ln()
                / -theta_est;
        }

        // Selling.
        if self.limit_price >= self.equilibrium {
            return 0.0;
        }
        if target > self.equilibrium {
            let theta_est = self.newton_for_selling();
            return (((target - self.equilibrium) * (theta_est.exp() - 1.0))
                / (self.core.info.max_price - self.equilibrium)
                + 1.0)
                .ln()
                / -theta_est;
        }
        let floored = target.max(self.limit_price);
        ((1.0 - (floored - self.limit_price) / (self.equilibrium - self.limit_price))
            * (self.theta.exp() - 1.0)
            + 1.0)
            .ln()
            / self.theta
    }

    /// Blend the aggressiveness toward the r-shout implied by `target`,
    /// clamped the way the reference formulation clamps it.
    fn updated_aggressiveness(&self, up: bool, buying: bool, target: f64) -> f64 {
        let old = if buying { self.agres_buy } else { self.agres_sell };
        let r_shout = self.calc_r_shout(target, buying);
        let delta = if up {
            (1.0 + self.lambda_r) * r_shout + self.lambda_a
        } else {
            (1.0 - self.lambda_r) * r_shout - self.lambda_a
        };

        let new = old + self.beta1 * (delta - old);
        if new > 1.0 {
            0.0
        } else if new < 0.0 {
            1e-6
        } else {
            new
        }
    }

    /// Recompute both target prices from the current aggressiveness and
    /// theta. A no-op until the equilibrium estimate is seeded.
    fn update_target(&mut self) {
        if self.equilibrium < 0.0 {
            return;
        }
        let eq = self.equilibrium;
        let limit = self.limit_price;
        let max_price = self.core.info.max_price;

        // Buying.
        if limit < eq {
            // Extramarginal buyer.
            if self.agres_buy >= 0.0 {
                self.target_buy = limit;
            } else {
                self.target_buy = limit * (1.0 - ((-self.agres_buy * self.theta).exp() - 1.0))
                    / (self.theta.exp() - 1.0);
            }
        } else {
            // Intramarginal buyer.
            if self.agres_buy >= 0.0 {
                self.target_buy = eq
                    + (limit - eq) * (((self.agres_buy * self.theta).exp() - 1.0)
                        / (self.theta.exp() - 1.0));
            } else {
                let theta_est = self.newton_for_buying();
                self.target_buy = eq
                    * (1.0 - ((-self.agres_buy * theta_est).exp() - 1.0) / (theta_est.exp() - 1.0));
            }
        }

        // Selling.
        if limit > eq {
            // Extramarginal seller.
            if self.agres_sell >= 0.0 {
                self.target_sell = limit;
            } else {
                self.target_sell = limit
                    + (max_price - eq) * (((-self.agres_sell * self.theta).exp() - 1.0)
                        / (self.theta.exp() - 1.0));
            }
        } else {
            // Intramarginal seller.
            if self.agres_sell >= 0.0 {
                self.target_sell = limit
                    + (eq - limit) * (1.0 - ((self.agres_sell * self.theta).exp() - 1.0)
                        / (self.theta.exp() - 1.0));
            } else {
                let theta_est = self.newton_for_selling();
                self.target_sell = eq
                    + (max_price - eq) * (((-self.agres_sell * theta_est).exp() - 1.0)
                        / (theta_est.exp() - 1.0));
            }
        }
    }
}

impl Trader for AaTrader {
    fn id(&self) -> TraderId {
        self.core.id
    }

    fn role(&self) -> Role {
        self.core.role
    }

    fn algorithm(&self) -> Algorithm {
        Algorithm::Aa
    }

    fn assign_jobs(&mut self, jobs: Vec<TraderOrder>) {
        self.core.assign(jobs);
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

        let job = self.core.head_job()?.clone();
        self.active = true;
        self.limit_price = job.limit_price;
        self.update_target();

        let quote_price = match job.side {
            Side::Bid => {
                if self.spin_up_time > 0 || self.target_buy < 0.0 {
                    let ask_plus = (1.0 + self.lambda_r) * self.prev_best_ask + self.lambda_a;
                    self.prev_best_bid
                        + (self.limit_price.min(ask_plus) - self.prev_best_bid) / self.eta
                } else {
                    self.prev_best_bid + (self.target_buy - self.prev_best_bid) / self.eta
                }
            }
            Side::Ask => {
                if self.spin_up_time > 0 || self.target_sell < 0.0 {
                    let bid_minus = (1.0 - self.lambda_r) * self.prev_best_bid - self.lambda_a;
                    self.prev_best_ask
                        - (self.prev_best_ask - self.limit_price.max(bid_minus)) / self.eta
                } else {
                    self.prev_best_ask - (self.prev_best_ask - self.target_sell) / self.eta
                }
            }
        };

        Some(Order::new(self.core.id, job.side, quote_price, job.quantity, timestep))
    }

    fn on_market_update(&mut self, update: &MarketUpdate<'_>) {
        let best_bid = update.best_bid.unwrap_or(-1.0);
        let best_ask = update.best_ask.unwrap_or(-1.0);

        // Classify what happened on the bid side of the book.
        let mut bid_improved = false;
        let mut bid_hit = false;
        if best_bid >= 0.0 {
            if self.prev_best_bid < best_bid || self.prev_best_bid < 0.0 {
                bid_improved = true;
            } else if update.traded_this_step() && self.prev_best_bid >= best_bid {
                bid_hit = true;
            }
        } else if self.prev_best_bid >= 0.0 {
            bid_hit = true;
        }

        // And on the ask side.
        let mut ask_improved = false;
        let mut ask_lifted = false;
        if best_ask >= 0.0 {
            if self.prev_best_ask > best_ask || self.prev_best_ask < 0.0 {
                ask_improved = true;
            } else if update.traded_this_step() && self.prev_best_ask <= best_ask {
                ask_lifted = true;
            }
        } else if self.prev_best_ask >= 0.0 {
            ask_lifted = true;
        }

        let deal = bid_hit || ask_lifted;
        self.prev_best_bid = best_bid;
        self.prev_best_ask = best_ask;

        if self.spin_up_time > 0 {
            self.spin_up_time -= 1;
        }

        if deal {
            let Some(price) = update.last_trade.as_ref().map(|t| t.price) else {
                return;
            };
            self.update_equilibrium(price);
            self.update_smiths_alpha(price);
            self.update_theta();

            self.agres_buy = if self.target_buy >= price {
                self.updated_aggressiveness(false, true, price)
            } else {
                self.updated_aggressiveness(true, true, price)
            };
            self.agres_sell = if self.target_sell <= price {
                self.updated_aggressiveness(false, false, price)
            } else {
                self.updated_aggressiveness(true, false, price)
            };
        } else if self.equilibrium > 0.0 {
            if bid_improved && self.target_buy <= self.prev_best_bid {
                self.agres_buy = self.updated_aggressiveness(true, true, self.prev_best_bid);
            }
            if ask_improved && self.target_sell >= self.prev_best_ask {
                self.agres_sell = self.updated_aggressiveness(true, false, self.prev_best_ask);
            }
        }

        self.update_target();
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
