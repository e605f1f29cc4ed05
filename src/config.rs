//! Experiment configuration: JSON files, limit-price generation, trader
//! roster construction.

use std::fmt;
use std::fs;
use std::path::Path;

use evolve::{ChromosomeInit, FitnessFn};
use rand::Rng;
use rand::rngs::StdRng;
use serde::Deserialize;
use simulation::TraderSpec;
use types::{Algorithm, AuctionParameters, MarketInfo, Role, TraderId};

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors raised while assembling an experiment.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    /// An algorithm list does not match its limit-price list.
    AlgorithmCount {
        role: &'static str,
        algorithms: usize,
        limits: usize,
    },
    /// The roster needs at least one seller and one buyer.
    NoTraders,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "could not read config file: {}", err),
            ConfigError::Parse(err) => write!(f, "could not parse config file: {}", err),
            ConfigError::AlgorithmCount {
                role,
                algorithms,
                limits,
            } => write!(
                f,
                "{} algorithms ({}) do not match limit prices ({})",
                role, algorithms, limits
            ),
            ConfigError::NoTraders => {
                write!(f, "the roster needs at least one seller and one buyer")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(err) => Some(err),
            ConfigError::Parse(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err)
    }
}

/// On-disk experiment description.
///
/// Sellers and buyers are listed by limit price with one algorithm per
/// trader; auction parameters and the market calendar fall back to their
/// defaults when omitted.
#[derive(Debug, Clone, Deserialize)]
pub struct ExperimentFile {
    #[serde(default)]
    pub auction: AuctionParameters,
    #[serde(default)]
    pub market: MarketInfo,
    pub seller_limits: Vec<f64>,
    pub buyer_limits: Vec<f64>,
    pub seller_algos: Vec<Algorithm>,
    pub buyer_algos: Vec<Algorithm>,
    #[serde(default)]
    pub seed: Option<u64>,
    /// Evolutionary-search section, used by the `evolve` subcommand.
    #[serde(default)]
    pub search: Option<SearchFile>,
}

/// Search parameters within an [`ExperimentFile`].
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SearchFile {
    pub generations: u32,
    pub individuals: usize,
    #[serde(default = "default_mutation_rate")]
    pub mutation_rate: f64,
    pub fitness: FitnessFn,
    pub chromosome_init: ChromosomeInit,
}

fn default_mutation_rate() -> f64 {
    0.5
}

impl ExperimentFile {
    /// Load and parse a JSON experiment description.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Build the trader roster the file describes.
    pub fn traders(&self) -> Result<Vec<TraderSpec>> {
        build_traders(
            &self.seller_limits,
            &self.seller_algos,
            &self.buyer_limits,
            &self.buyer_algos,
        )
    }
}

/// Evenly stepped limit prices, lowest first, with optional integer noise
/// added to each price.
pub fn stepped_prices(min: f64, step: f64, noise: u32, n: usize, rng: &mut StdRng) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let base = min + i as f64 * step;
            if noise == 0 {
                base
            } else {
                base + rng.gen_range(-(noise as i64)..noise as i64) as f64
            }
        })
        .collect()
}

/// Assemble the roster: sellers take the low trader ids, buyers follow.
pub fn build_traders(
    seller_limits: &[f64],
    seller_algos: &[Algorithm],
    buyer_limits: &[f64],
    buyer_algos: &[Algorithm],
) -> Result<Vec<TraderSpec>> {
    if seller_algos.len() != seller_limits.len() {
        return Err(ConfigError::AlgorithmCount {
            role: "seller",
            algorithms: seller_algos.len(),
            limits: seller_limits.len(),
        });
    }
    if buyer_algos.len() != buyer_limits.len() {
        return Err(ConfigError::AlgorithmCount {
            role: "buyer",
            algorithms: buyer_algos.len(),
            limits: buyer_limits.len(),
        });
    }
    if seller_limits.is_empty() || buyer_limits.is_empty() {
        return Err(ConfigError::NoTraders);
    }

    let mut specs = Vec::with_capacity(seller_limits.len() + buyer_limits.len());
    for (i, (limit, algo)) in seller_limits.iter().zip(seller_algos).enumerate() {
        specs.push(TraderSpec {
            id: TraderId(i as u32),
            role: Role::Seller,
            algorithm: *algo,
            limit_price: *limit,
        });
    }
    let offset = seller_limits.len() as u32;
    for (i, (limit, algo)) in buyer_limits.iter().zip(buyer_algos).enumerate() {
        specs.push(TraderSpec {
            id: TraderId(offset + i as u32),
            role: Role::Buyer,
            algorithm: *algo,
            limit_price: *limit,
        });
    }
    Ok(specs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_stepped_prices_without_noise() {
        let mut rng = StdRng::seed_from_u64(0);
        let prices = stepped_prices(5.0, 1.5, 0, 4, &mut rng);
        assert_eq!(prices, vec![5.0, 6.5, 8.0, 9.5]);
    }

    #[test]
    fn test_stepped_prices_noise_stays_in_band() {
        let mut rng = StdRng::seed_from_u64(1);
        let prices = stepped_prices(10.0, 1.0, 3, 50, &mut rng);
        for (i, price) in prices.iter().enumerate() {
            let base = 10.0 + i as f64;
            assert!((price - base).abs() <= 3.0);
        }
    }

    #[test]
    fn test_roster_ids_and_roles() {
        let specs = build_traders(
            &[5.0, 6.0],
            &[Algorithm::Zic, Algorithm::Zip],
            &[9.0],
            &[Algorithm::Aa],
        )
        .unwrap();

        assert_eq!(specs.len(), 3);
        assert_eq!(specs[0].id, TraderId(0));
        assert_eq!(specs[1].algorithm, Algorithm::Zip);
        assert_eq!(specs[2].id, TraderId(2));
        assert_eq!(specs[2].role, Role::Buyer);
    }

    #[test]
    fn test_mismatched_algorithms_rejected() {
        let result = build_traders(&[5.0, 6.0], &[Algorithm::Zic], &[9.0], &[Algorithm::Zic]);
        assert!(matches!(result, Err(ConfigError::AlgorithmCount { .. })));
    }

    #[test]
    fn test_empty_side_rejected() {
        let result = build_traders(&[], &[], &[9.0], &[Algorithm::Zic]);
        assert!(matches!(result, Err(ConfigError::NoTraders)));
    }

    #[test]
    fn test_experiment_file_parses() {
        let json = r#"{
            "market": {
                "min_price": 1.0,
                "max_price": 100.0,
                "trading_days": 2,
                "timesteps_per_day": 50
            },
            "seller_limits": [5.0, 6.0],
            "buyer_limits": [9.0, 10.0],
            "seller_algos": ["ZIC", "ZIP"],
            "buyer_algos": ["AA", "ZIC"],
            "seed": 7,
            "search": {
                "generations": 3,
                "individuals": 8,
                "fitness": "ALOC-EFF",
                "chromosome_init": "RANDOM"
            }
        }"#;
        let file: ExperimentFile = serde_json::from_str(json).unwrap();

        assert_eq!(file.market.trading_days, 2);
        assert_eq!(file.auction, AuctionParameters::default());
        assert_eq!(file.seller_algos, vec![Algorithm::Zic, Algorithm::Zip]);
        assert_eq!(file.seed, Some(7));
        let search = file.search.unwrap();
        assert_eq!(search.individuals, 8);
        assert_eq!(search.mutation_rate, 0.5);
        assert_eq!(search.fitness, FitnessFn::AllocEfficiency);
        assert_eq!(file.traders().unwrap().len(), 4);
    }
}
