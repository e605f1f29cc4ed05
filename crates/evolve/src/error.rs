//! Error types for the evolutionary search.

use simulation::fitness::FitnessError;
use std::fmt;

/// Result type for search setup and execution.
pub type Result<T> = std::result::Result<T, EvolveError>;

/// Errors detected before any simulation runs.
#[derive(Debug, Clone, PartialEq)]
pub enum EvolveError {
    /// A generation needs at least one individual.
    EmptyPopulation,
    /// The market needs at least one seller and one buyer.
    MissingSide,
    /// The configured supply and demand curves cannot support the
    /// requested fitness function.
    Fitness(FitnessError),
}

impl fmt::Display for EvolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvolveError::EmptyPopulation => write!(f, "population size must be positive"),
            EvolveError::MissingSide => {
                write!(f, "the trader set needs at least one seller and one buyer")
            }
            EvolveError::Fitness(err) => write!(f, "fitness setup failed: {}", err),
        }
    }
}

impl std::error::Error for EvolveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EvolveError::Fitness(err) => Some(err),
            _ => None,
        }
    }
}

impl From<FitnessError> for EvolveError {
    fn from(err: FitnessError) -> Self {
        EvolveError::Fitness(err)
    }
}
