//! Trading policies for the auction gym.
//!
//! Three adaptive policies quote into the double auction:
//! - [`ZicTrader`] — zero-intelligence constrained, uniform draws in the
//!   non-loss band
//! - [`ZipTrader`] — margin adaptation with momentum, after Cliff (1997)
//! - [`AaTrader`] — adaptive-aggressive, after Vytelingum & Cliff
//!
//! All three implement the [`Trader`] capability set and are constructed
//! through [`TraderAgent::build`], a factory keyed on the closed
//! [`types::Algorithm`] enum.

mod aa;
mod agent;
mod traits;
mod zic;
mod zip;

pub use aa::AaTrader;
pub use agent::TraderAgent;
pub use traits::{Trader, TraderCore};
pub use zic::ZicTrader;
pub use zip::ZipTrader;
