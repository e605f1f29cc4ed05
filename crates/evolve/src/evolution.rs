//! The generation loop: evaluate, select, breed.

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use simulation::fitness::{alpha, efficiency, equilibrium, max_surplus};
use simulation::{MarketRunner, TraderSpec};
use std::fmt;
use std::str::FromStr;
use tracing::info;
use types::{AuctionParameters, MarketInfo, Role};

use crate::chromosome::{ChromosomeInit, crossover, initial_chromosome};
use crate::error::{EvolveError, Result};

/// How a completed run is scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FitnessFn {
    /// Smith's alpha against the theoretical equilibrium; minimised.
    #[serde(rename = "ALPHA")]
    Alpha,
    /// Allocative efficiency against the theoretical surplus; maximised.
    #[serde(rename = "ALOC-EFF")]
    AllocEfficiency,
}

impl FitnessFn {
    /// Whether smaller scores are fitter.
    pub fn lower_is_better(self) -> bool {
        matches!(self, FitnessFn::Alpha)
    }
}

/// Error returned when parsing an unknown fitness-function name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFitnessError(pub String);

impl fmt::Display for ParseFitnessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown fitness function: {} (expected ALPHA or ALOC-EFF)",
            self.0
        )
    }
}

impl std::error::Error for ParseFitnessError {}

impl FromStr for FitnessFn {
    type Err = ParseFitnessError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ALPHA" => Ok(FitnessFn::Alpha),
            "ALOC-EFF" | "EFFICIENCY" => Ok(FitnessFn::AllocEfficiency),
            _ => Err(ParseFitnessError(s.to_string())),
        }
    }
}

/// Search configuration: the population, the market every individual is
/// scored on, and the master seed everything derives from.
#[derive(Debug, Clone)]
pub struct EvolutionConfig {
    pub individuals: usize,
    pub generations: u32,
    /// Probability of perturbing each gene during breeding, in [0, 1].
    pub mutation_rate: f64,
    pub init: ChromosomeInit,
    pub fitness: FitnessFn,
    pub info: MarketInfo,
    pub traders: Vec<TraderSpec>,
    pub seed: u64,
}

/// What one generation produced.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSummary {
    pub generation: u32,
    pub best: AuctionParameters,
    pub best_score: f64,
    pub mean_score: f64,
}

/// The evolutionary search over auction parameters.
pub struct Evolution {
    config: EvolutionConfig,
    genes: Vec<AuctionParameters>,
    rng: StdRng,
    equilibrium_price: f64,
    surplus_all_days: f64,
}

impl Evolution {
    /// Validate the configuration and seed generation zero.
    ///
    /// The theoretical equilibrium is computed here, before any simulation
    /// runs: supply and demand curves that never intersect are a fatal
    /// configuration error for both fitness functions.
    pub fn new(config: EvolutionConfig) -> Result<Self> {
        if config.individuals == 0 {
            return Err(EvolveError::EmptyPopulation);
        }
        let seller_limits: Vec<f64> = limits_of(&config.traders, Role::Seller);
        let buyer_limits: Vec<f64> = limits_of(&config.traders, Role::Buyer);
        if seller_limits.is_empty() || buyer_limits.is_empty() {
            return Err(EvolveError::MissingSide);
        }

        let (pe, _) = equilibrium(&seller_limits, &buyer_limits)?;
        let (seller_surplus, buyer_surplus) = max_surplus(&seller_limits, &buyer_limits, pe);
        let surplus_all_days =
            (seller_surplus + buyer_surplus) * config.info.trading_days as f64;

        let mut rng = StdRng::seed_from_u64(config.seed);
        let genes = (0..config.individuals)
            .map(|_| initial_chromosome(config.init, &mut rng))
            .collect();

        Ok(Self {
            config,
            genes,
            rng,
            equilibrium_price: pe,
            surplus_all_days,
        })
    }

    /// The current population.
    pub fn population(&self) -> &[AuctionParameters] {
        &self.genes
    }

    /// Run every generation and return the per-generation summaries.
    pub fn run(&mut self) -> Vec<GenerationSummary> {
        let mut summaries = Vec::with_capacity(self.config.generations as usize);
        for generation in 0..self.config.generations {
            let scores = self.evaluate(generation);
            let (best_ix, best_score) = self.elite(&scores);
            let mean_score = scores.iter().sum::<f64>() / scores.len() as f64;
            info!(
                generation,
                best_score, mean_score, "generation evaluated"
            );
            summaries.push(GenerationSummary {
                generation,
                best: self.genes[best_ix],
                best_score,
                mean_score,
            });

            let elite_genes = self.genes[best_ix];
            let lower = self.config.fitness.lower_is_better();
            self.genes = (0..self.config.individuals)
                .map(|_| self.breed(&scores, lower))
                .collect();
            // Elitism: the best individual passes unchanged.
            self.genes[best_ix] = elite_genes;
        }
        summaries
    }

    /// Score every individual of the generation, in parallel.
    ///
    /// Each individual derives its own seed from (master seed, generation,
    /// index), so evaluation shares no mutable state and a rerun of the
    /// same search reproduces every ledger.
    fn evaluate(&self, generation: u32) -> Vec<f64> {
        let info = self.config.info;
        let traders = &self.config.traders;
        let fitness = self.config.fitness;
        let pe = self.equilibrium_price;
        let surplus = self.surplus_all_days;
        let base = self.config.seed;

        self.genes
            .par_iter()
            .enumerate()
            .map(|(ix, params)| {
                let seed = derive_seed(base, generation, ix as u64);
                let mut runner = MarketRunner::new(*params, info, seed);
                for spec in traders {
                    runner.add_trader(spec);
                }
                let records = runner.run_collect();
                match fitness {
                    FitnessFn::Alpha => alpha(&records, pe),
                    FitnessFn::AllocEfficiency => efficiency(&records, surplus),
                }
            })
            .collect()
    }

    /// Index and score of the fittest individual.
    fn elite(&self, scores: &[f64]) -> (usize, f64) {
        let lower = self.config.fitness.lower_is_better();
        let mut best_ix = 0;
        for ix in 1..scores.len() {
            let better = if lower {
                scores[ix] < scores[best_ix]
            } else {
                scores[ix] > scores[best_ix]
            };
            if better {
                best_ix = ix;
            }
        }
        (best_ix, scores[best_ix])
    }

    /// Three-way tournament: the fittest contender moms, the runner-up
    /// dads, and the child is bred from the pair.
    fn breed(&mut self, scores: &[f64], lower: bool) -> AuctionParameters {
        let n = self.config.individuals;
        let mut contenders = [
            self.rng.gen_range(0..n),
            self.rng.gen_range(0..n),
            self.rng.gen_range(0..n),
        ];
        contenders.sort_by(|a, b| {
            if lower {
                scores[*a].total_cmp(&scores[*b])
            } else {
                scores[*b].total_cmp(&scores[*a])
            }
        });

        let mom = self.genes[contenders[0]];
        let dad = self.genes[contenders[1]];
        crossover(&mut self.rng, self.config.mutation_rate, &mom, &dad)
    }
}

fn limits_of(traders: &[TraderSpec], role: Role) -> Vec<f64> {
    traders
        .iter()
        .filter(|spec| spec.role == role)
        .map(|spec| spec.limit_price)
        .collect()
}

/// Splitmix-style mix of (master seed, generation, individual) into one
/// per-run seed.
fn derive_seed(base: u64, generation: u32, individual: u64) -> u64 {
    let mut z = base
        ^ (generation as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ individual.wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
