//! Evolutionary search over auction-rule parameters.
//!
//! The search treats a full [`types::AuctionParameters`] value as one
//! chromosome. Each generation every individual is scored by running an
//! independent, seeded market simulation; children are bred by a three-way
//! tournament with per-gene mutation, and the best individual of each
//! generation passes unchanged into the next.
//!
//! Generation members share no mutable state, so a generation is evaluated
//! in parallel with rayon.

mod chromosome;
mod error;
mod evolution;

pub use chromosome::{ChromosomeInit, crossover, initial_chromosome};
pub use error::{EvolveError, Result};
pub use evolution::{Evolution, EvolutionConfig, FitnessFn, GenerationSummary};
