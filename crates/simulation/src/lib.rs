//! Simulation: the day/timestep event loop of the auction gym.
//!
//! The [`MarketRunner`] drives a strict per-timestep sequence:
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │            MarketRunner.step()               │
//! │                                              │
//! │  1. Renew jobs from the allocation schedule  │
//! │  2. Solicit one quote (5-attempt budget,     │
//! │     ratio-corrective side selection)         │
//! │  3. Validate through the rule pipeline       │
//! │  4. Admit the quote into the book            │
//! │  5. Attempt one match (k-pricing)            │
//! │  6. Broadcast a MarketUpdate to all traders  │
//! │                                              │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! Each run owns a seeded master generator; same seed, same ledger. Days
//! end by handing the day's [`types::TradeRecord`]s to a [`TradeSink`].
//!
//! The [`fitness`] module scores completed runs (Smith's alpha, allocative
//! efficiency) from the in-memory records; nothing here touches a
//! filesystem.

pub mod fitness;
mod runner;
mod schedule;
mod sink;

pub use runner::{MarketRunner, RunStats, TraderSpec};
pub use schedule::{Assignment, AllocationSchedule};
pub use sink::{MemorySink, NullSink, TradeSink};
