//! Chromosome initialisation and breeding.
//!
//! A chromosome is exactly one [`AuctionParameters`] value. Breeding works
//! per gene: the child inherits each gene from one of two parents (the
//! fitter "mom" with a per-gene probability) and, at the configured
//! mutation rate, adds a bounded perturbation drawn on a decimal lattice.
//! Every gene is clamped into its legal range afterwards.

use rand::Rng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use types::AuctionParameters;

/// Profile used to seed generation zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChromosomeInit {
    /// Every rule at the permissive end of its range.
    Low,
    /// The baseline rule set.
    Normal,
    /// Every rule at the restrictive end of its range.
    High,
    /// Independent draws within plausible ranges.
    Random,
}

/// Error returned when parsing an unknown init profile name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseInitError(pub String);

impl fmt::Display for ParseInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown chromosome init: {} (expected LOW, NORMAL, HIGH or RANDOM)",
            self.0
        )
    }
}

impl std::error::Error for ParseInitError {}

impl FromStr for ChromosomeInit {
    type Err = ParseInitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOW" => Ok(ChromosomeInit::Low),
            "NORMAL" => Ok(ChromosomeInit::Normal),
            "HIGH" => Ok(ChromosomeInit::High),
            "RANDOM" => Ok(ChromosomeInit::Random),
            _ => Err(ParseInitError(s.to_string())),
        }
    }
}

/// Build one generation-zero chromosome.
pub fn initial_chromosome(init: ChromosomeInit, rng: &mut StdRng) -> AuctionParameters {
    match init {
        ChromosomeInit::Low => AuctionParameters {
            bid_ask_ratio: 0.1,
            k_pricing: 0.0,
            max_shift: 0.1,
            window_size_ee: 1,
            delta_ee: 0.0,
            dominance: 0,
        },
        ChromosomeInit::Normal => AuctionParameters {
            bid_ask_ratio: 1.0,
            k_pricing: 0.5,
            max_shift: 2.0,
            window_size_ee: 3,
            delta_ee: 5.0,
            dominance: 0,
        },
        ChromosomeInit::High => AuctionParameters {
            bid_ask_ratio: 5.0,
            k_pricing: 1.0,
            max_shift: 10.0,
            window_size_ee: 10,
            delta_ee: 20.0,
            dominance: 10,
        },
        ChromosomeInit::Random => AuctionParameters {
            bid_ask_ratio: rng.gen_range(7..13) as f64 / 10.0,
            k_pricing: rng.gen_range(0.0..1.0),
            max_shift: rng.gen_range(0.0..1.0) + 0.5,
            window_size_ee: rng.gen_range(1..6),
            delta_ee: 2.0 + 5.0 * rng.gen_range(0.0..1.0),
            dominance: rng.gen_range(0..5),
        },
    }
}

/// At `rate`, an integer draw in `[lo, hi) * 10^draw_exp` scaled down by
/// `10^div_exp`; zero otherwise.
fn perturbation(rng: &mut StdRng, rate: f64, lo: i64, hi: i64, draw_exp: u32, div_exp: u32) -> f64 {
    if rng.gen_range(0.0..1.0) >= rate {
        return 0.0;
    }
    let scale = 10i64.pow(draw_exp);
    rng.gen_range(lo * scale..hi * scale) as f64 / 10f64.powi(div_exp as i32)
}

/// Integer-gene counterpart: a step in `[lo, hi)` at `rate`, zero otherwise.
fn int_perturbation(rng: &mut StdRng, rate: f64, lo: i64, hi: i64) -> i64 {
    if rng.gen_range(0.0..1.0) >= rate {
        return 0;
    }
    rng.gen_range(lo..hi)
}

fn pick(rng: &mut StdRng, mom: f64, dad: f64, mom_percent: u32) -> f64 {
    if rng.gen_range(0..100) < mom_percent { mom } else { dad }
}

/// Breed one child from two parents.
///
/// The bid:ask ratio gene always comes from the mom and drifts in a wider
/// band than the others; everything else picks a parent at even odds.
pub fn crossover(
    rng: &mut StdRng,
    rate: f64,
    mom: &AuctionParameters,
    dad: &AuctionParameters,
) -> AuctionParameters {
    let k_pricing = (pick(rng, mom.k_pricing, dad.k_pricing, 50)
        + perturbation(rng, rate, -1, 2, 3, 5))
    .clamp(0.0, 1.0);

    let window_size_ee = (pick(rng, mom.window_size_ee as f64, dad.window_size_ee as f64, 50)
        as i64
        + int_perturbation(rng, rate, -1, 2))
    .clamp(1, 20) as usize;

    let delta_ee = (pick(rng, mom.delta_ee, dad.delta_ee, 50)
        + perturbation(rng, rate, -1, 2, 3, 3))
    .clamp(0.0, 100.0);

    let max_shift = (pick(rng, mom.max_shift, dad.max_shift, 50)
        + perturbation(rng, rate, -1, 2, 3, 5))
    .clamp(0.05, 10.0);

    let dominance = (pick(rng, mom.dominance as f64, dad.dominance as f64, 50) as i64
        + int_perturbation(rng, rate, -1, 2))
    .clamp(0, 10) as u32;

    let bid_ask_ratio =
        (mom.bid_ask_ratio + perturbation(rng, rate, -5, 6, 3, 5)).clamp(0.2, 5.0);

    AuctionParameters {
        k_pricing,
        bid_ask_ratio,
        window_size_ee,
        delta_ee,
        max_shift,
        dominance,
    }
}
