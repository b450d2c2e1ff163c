//! Universe configuration: a named list of tickers in Yahoo format.
//!
//! Stored as TOML:
//!
//! ```toml
//! name = "banks"
//! symbols = ["HDFCBANK.NS", "ICICIBANK.NS", "KOTAKBANK.NS"]
//! ```

use super::provider::DataError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Constituents of the NIFTY 50 index.
const NIFTY50: [&str; 50] = [
    "ADANIENT.NS",
    "ADANIPORTS.NS",
    "APOLLOHOSP.NS",
    "ASIANPAINT.NS",
    "AXISBANK.NS",
    "BAJAJ-AUTO.NS",
    "BAJFINANCE.NS",
    "BAJAJFINSV.NS",
    "BHARTIARTL.NS",
    "BPCL.NS",
    "BRITANNIA.NS",
    "CIPLA.NS",
    "COALINDIA.NS",
    "DIVISLAB.NS",
    "DRREDDY.NS",
    "EICHERMOT.NS",
    "GRASIM.NS",
    "HCLTECH.NS",
    "HDFCBANK.NS",
    "HDFCLIFE.NS",
    "HEROMOTOCO.NS",
    "HINDALCO.NS",
    "HINDUNILVR.NS",
    "ICICIBANK.NS",
    "INDUSINDBK.NS",
    "INFY.NS",
    "ITC.NS",
    "JSWSTEEL.NS",
    "KOTAKBANK.NS",
    "LT.NS",
    "M&M.NS",
    "MARUTI.NS",
    "NESTLEIND.NS",
    "NTPC.NS",
    "ONGC.NS",
    "POWERGRID.NS",
    "RELIANCE.NS",
    "SBILIFE.NS",
    "SBIN.NS",
    "SHRIRAMFIN.NS",
    "SUNPHARMA.NS",
    "TATACONSUM.NS",
    "TMPV.NS",
    "TATASTEEL.NS",
    "TCS.NS",
    "TECHM.NS",
    "TITAN.NS",
    "ULTRACEMCO.NS",
    "UPL.NS",
    "WIPRO.NS",
];

/// A named set of tickers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Universe {
    pub name: String,
    pub symbols: Vec<String>,
}

impl Universe {
    /// Build a universe, rejecting empty or duplicated symbol lists.
    pub fn new(name: impl Into<String>, symbols: Vec<String>) -> Result<Self, DataError> {
        let universe = Self {
            name: name.into(),
            symbols,
        };
        universe.validate()?;
        Ok(universe)
    }

    /// The NIFTY 50 constituents.
    pub fn nifty50() -> Self {
        Self {
            name: "nifty50".into(),
            symbols: NIFTY50.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Load a universe from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, DataError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DataError::InvalidUniverse(format!("read {}: {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parse a universe from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, DataError> {
        let universe: Self = toml::from_str(content)
            .map_err(|e| DataError::InvalidUniverse(format!("parse universe TOML: {e}")))?;
        universe.validate()?;
        Ok(universe)
    }

    /// Serialize the universe to TOML.
    pub fn to_toml(&self) -> Result<String, DataError> {
        toml::to_string_pretty(self)
            .map_err(|e| DataError::InvalidUniverse(format!("serialize universe: {e}")))
    }

    pub fn symbols(&self) -> Vec<&str> {
        self.symbols.iter().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    fn validate(&self) -> Result<(), DataError> {
        if self.symbols.is_empty() {
            return Err(DataError::InvalidUniverse(format!(
                "universe '{}' has no symbols",
                self.name
            )));
        }
        let mut seen = HashSet::new();
        for s in &self.symbols {
            if s.trim().is_empty() {
                return Err(DataError::InvalidUniverse("blank symbol".into()));
            }
            if !seen.insert(s.as_str()) {
                return Err(DataError::InvalidUniverse(format!("duplicate symbol '{s}'")));
            }
        }
        Ok(())
    }
}

impl Default for Universe {
    fn default() -> Self {
        Self::nifty50()
    }
}
