//! Serializable run configuration.
//!
//! Loaded from TOML with four sections, every field optional:
//!
//! ```toml
//! [data]
//! symbols = ["HDFCBANK.NS", "ICICIBANK.NS"]
//! period = "2y"
//!
//! [screen]
//! significance_level = 0.05
//! top_pairs = 5
//!
//! [strategy]
//! entry_threshold = 2.0
//! exit_threshold = 0.5
//! stop_loss = 4.0
//! lookback = 60
//!
//! [backtest]
//! initial_capital = 100000.0
//! ```

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};
use statarb_core::data::{Universe, DEFAULT_MIN_COVERAGE};
use statarb_core::backtest::TRADING_DAYS_PER_YEAR;
use statarb_core::{AnalyzerConfig, Backtester, StrategyParams};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Unique identifier for a run (content-addressable hash).
pub type RunId = String;

/// Errors from loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid period '{0}' (expected e.g. 30d, 6mo, 2y)")]
    InvalidPeriod(String),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("universe: {0}")]
    Universe(#[from] statarb_core::data::DataError),
}

/// A lookback window for price history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Days(u32),
    Months(u32),
    Years(u32),
}

impl Period {
    /// First date of the window ending at `end`.
    pub fn start_from(&self, end: NaiveDate) -> Option<NaiveDate> {
        match *self {
            Period::Days(n) => end.checked_sub_days(chrono::Days::new(n as u64)),
            Period::Months(n) => end.checked_sub_months(Months::new(n)),
            Period::Years(n) => end.checked_sub_months(Months::new(n.checked_mul(12)?)),
        }
    }
}

impl FromStr for Period {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        let split = s
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| ConfigError::InvalidPeriod(s.clone()))?;
        let (num, unit) = s.split_at(split);
        let n: u32 = num
            .parse()
            .map_err(|_| ConfigError::InvalidPeriod(s.clone()))?;
        if n == 0 {
            return Err(ConfigError::InvalidPeriod(s.clone()));
        }
        match unit {
            "d" => Ok(Period::Days(n)),
            "mo" => Ok(Period::Months(n)),
            "y" => Ok(Period::Years(n)),
            _ => Err(ConfigError::InvalidPeriod(s.clone())),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Days(n) => write!(f, "{n}d"),
            Period::Months(n) => write!(f, "{n}mo"),
            Period::Years(n) => write!(f, "{n}y"),
        }
    }
}

/// Which prices to load and how.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Explicit symbol list. Takes precedence over `universe`.
    pub symbols: Vec<String>,
    /// Universe TOML file. Without either, the NIFTY 50 is used.
    pub universe: Option<PathBuf>,
    /// History length ending at `end` (or today). Ignored when `start` is set.
    pub period: String,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub cache_dir: PathBuf,
    /// Never touch the network.
    pub offline: bool,
    /// Generate synthetic prices for symbols that cannot be loaded.
    pub synthetic: bool,
    /// Re-download even when the cache covers the range.
    pub force: bool,
    /// Fraction of symbols that must trade on a date for it to be kept.
    pub min_coverage: f64,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            symbols: Vec::new(),
            universe: None,
            period: "2y".into(),
            start: None,
            end: None,
            cache_dir: PathBuf::from("data/cache"),
            offline: false,
            synthetic: false,
            force: false,
            min_coverage: DEFAULT_MIN_COVERAGE,
        }
    }
}

impl DataConfig {
    /// Resolve `[start, end]`, using `today` when no end date is set.
    pub fn date_range(&self, today: NaiveDate) -> Result<(NaiveDate, NaiveDate), ConfigError> {
        let end = self.end.unwrap_or(today);
        let start = match self.start {
            Some(start) => start,
            None => {
                let period: Period = self.period.parse()?;
                period
                    .start_from(end)
                    .ok_or_else(|| ConfigError::InvalidPeriod(self.period.clone()))?
            }
        };
        if start >= end {
            return Err(ConfigError::Invalid(format!(
                "start date {start} must be before end date {end}"
            )));
        }
        Ok((start, end))
    }

    /// The symbols to load.
    pub fn resolve_symbols(&self) -> Result<Vec<String>, ConfigError> {
        if !self.symbols.is_empty() {
            return Ok(Universe::new("custom", self.symbols.clone())?.symbols);
        }
        match &self.universe {
            Some(path) => Ok(Universe::from_file(path)?.symbols),
            None => Ok(Universe::nifty50().symbols),
        }
    }
}

/// Pair screen settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    pub significance_level: f64,
    pub min_observations: usize,
    pub max_lag: Option<usize>,
    /// How many of the best-ranked pairs to trade.
    pub top_pairs: usize,
    pub parallel: bool,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        let analyzer = AnalyzerConfig::default();
        Self {
            significance_level: analyzer.significance_level,
            min_observations: analyzer.min_observations,
            max_lag: analyzer.max_lag,
            top_pairs: 5,
            parallel: analyzer.parallel,
        }
    }
}

/// z-score thresholds and rolling window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub entry_threshold: f64,
    pub exit_threshold: f64,
    pub stop_loss: f64,
    pub lookback: usize,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        let p = StrategyParams::default();
        Self {
            entry_threshold: p.entry_threshold,
            exit_threshold: p.exit_threshold,
            stop_loss: p.stop_loss,
            lookback: p.lookback,
        }
    }
}

/// Backtest settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    pub initial_capital: f64,
    pub periods_per_year: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_capital: 100_000.0,
            periods_per_year: TRADING_DAYS_PER_YEAR,
        }
    }
}

/// Everything needed to reproduce a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub data: DataConfig,
    pub screen: ScreenConfig,
    pub strategy: StrategyConfig,
    pub backtest: BacktestConfig,
}

impl RunConfig {
    /// Load and validate a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.screen;
        if !(s.significance_level > 0.0 && s.significance_level < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "significance_level must be in (0, 1), got {}",
                s.significance_level
            )));
        }
        if s.top_pairs == 0 {
            return Err(ConfigError::Invalid("top_pairs must be at least 1".into()));
        }
        self.strategy_params()
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        let b = &self.backtest;
        if !(b.initial_capital.is_finite() && b.initial_capital > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "initial_capital must be positive, got {}",
                b.initial_capital
            )));
        }
        if !(b.periods_per_year.is_finite() && b.periods_per_year > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "periods_per_year must be positive, got {}",
                b.periods_per_year
            )));
        }

        let d = &self.data;
        if !(d.min_coverage > 0.0 && d.min_coverage <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "min_coverage must be in (0, 1], got {}",
                d.min_coverage
            )));
        }
        if d.offline && d.force {
            return Err(ConfigError::Invalid(
                "force re-download conflicts with offline mode".into(),
            ));
        }
        if d.start.is_none() {
            d.period.parse::<Period>()?;
        }
        Ok(())
    }

    /// Computes a deterministic hash ID for this configuration.
    pub fn run_id(&self) -> RunId {
        let json = serde_json::to_vec(self).unwrap_or_default();
        blake3::hash(&json).to_hex().to_string()
    }

    /// Screen settings. Pairs shorter than the z-score lookback are skipped.
    pub fn analyzer_config(&self) -> AnalyzerConfig {
        AnalyzerConfig {
            significance_level: self.screen.significance_level,
            min_observations: self.screen.min_observations.max(self.strategy.lookback),
            max_lag: self.screen.max_lag,
            parallel: self.screen.parallel,
        }
    }

    pub fn strategy_params(&self) -> StrategyParams {
        StrategyParams {
            entry_threshold: self.strategy.entry_threshold,
            exit_threshold: self.strategy.exit_threshold,
            stop_loss: self.strategy.stop_loss,
            lookback: self.strategy.lookback,
        }
    }

    pub fn backtester(&self) -> Backtester {
        Backtester::new(self.backtest.initial_capital)
            .with_periods_per_year(self.backtest.periods_per_year)
    }
}
