//! Identifier newtypes and small enums shared across the workspace.

use derive_more::{From, Into};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unique identifier for traders.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default, From,
    Into,
)]
pub struct TraderId(pub u32);

impl fmt::Display for TraderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Trader({})", self.0)
    }
}

/// Unique identifier for trades.
///
/// Assigned monotonically: a trade's id equals the ledger length at the
/// moment it is recorded.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default, From,
    Into,
)]
pub struct TradeId(pub u64);

impl fmt::Display for TradeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Trade({})", self.0)
    }
}

/// Trading day index (zero-based).
pub type Day = u32;

/// Timestep index within a trading day (zero-based).
pub type Timestep = u32;

/// Whether a trader is on the buying or selling side of the market.
///
/// A trader never changes role within a run; the role determines which id
/// pool the exchange draws from when soliciting quotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Buyer,
    Seller,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Buyer => write!(f, "BUYER"),
            Role::Seller => write!(f, "SELLER"),
        }
    }
}

/// Trading policy assigned to a trader.
///
/// A closed set: construction always goes through the factory keyed on this
/// enum, never through runtime string inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Algorithm {
    /// Zero-Intelligence Constrained (Gode & Sunder).
    Zic,
    /// Zero-Intelligence Plus (Cliff 1997).
    Zip,
    /// Adaptive-Aggressive (Vytelingum & Cliff).
    Aa,
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Algorithm::Zic => write!(f, "ZIC"),
            Algorithm::Zip => write!(f, "ZIP"),
            Algorithm::Aa => write!(f, "AA"),
        }
    }
}

/// Error returned when parsing an unknown algorithm name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseAlgorithmError(pub String);

impl fmt::Display for ParseAlgorithmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown algorithm: {} (expected ZIC, ZIP or AA)", self.0)
    }
}

impl std::error::Error for ParseAlgorithmError {}

impl FromStr for Algorithm {
    type Err = ParseAlgorithmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ZIC" => Ok(Algorithm::Zic),
            "ZIP" => Ok(Algorithm::Zip),
            "AA" => Ok(Algorithm::Aa),
            _ => Err(ParseAlgorithmError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_formats() {
        assert_eq!(TraderId(3).to_string(), "Trader(3)");
        assert_eq!(TradeId(7).to_string(), "Trade(7)");
        assert_eq!(Algorithm::Aa.to_string(), "AA");
    }

    #[test]
    fn test_algorithm_parsing() {
        assert_eq!("zip".parse::<Algorithm>().unwrap(), Algorithm::Zip);
        assert_eq!(" ZIC ".parse::<Algorithm>().unwrap(), Algorithm::Zic);
        assert!("GDX".parse::<Algorithm>().is_err());
    }
}
