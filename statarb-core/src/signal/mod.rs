//! SignalEngine: spread, rolling z-score and position sequence for a pair.

pub mod state;

pub use state::{evaluate_positions, transition, Observation, Transition};

use crate::domain::{pair_label, PositionState, PriceMatrix};
use crate::stats::rolling_mean_std;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Relative floor below which a rolling std counts as zero.
const STD_EPSILON: f64 = 1e-12;

/// z-score thresholds and rolling window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrategyParams {
    /// Open a position when |z| exceeds this.
    pub entry_threshold: f64,
    /// Close when |z| falls to this.
    pub exit_threshold: f64,
    /// Close when |z| reaches this.
    pub stop_loss: f64,
    /// Trailing window for the rolling mean and std.
    pub lookback: usize,
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self {
            entry_threshold: 2.0,
            exit_threshold: 0.5,
            stop_loss: 4.0,
            lookback: 60,
        }
    }
}

impl StrategyParams {
    /// Require `lookback >= 2` and `0 <= exit < entry < stop_loss`.
    pub fn validate(&self) -> Result<(), StrategyError> {
        if self.lookback < 2 {
            return Err(StrategyError::InvalidParams(format!(
                "lookback must be at least 2, got {}",
                self.lookback
            )));
        }
        let ordered = 0.0 <= self.exit_threshold
            && self.exit_threshold < self.entry_threshold
            && self.entry_threshold < self.stop_loss;
        if !ordered || !self.stop_loss.is_finite() {
            return Err(StrategyError::InvalidParams(format!(
                "thresholds must satisfy 0 <= exit ({}) < entry ({}) < stop_loss ({})",
                self.exit_threshold, self.entry_threshold, self.stop_loss
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StrategyError {
    #[error("invalid strategy parameters: {0}")]
    InvalidParams(String),

    #[error("unknown instrument '{0}'")]
    UnknownInstrument(String),

    #[error("degenerate hedge ratio ({0})")]
    DegenerateHedgeRatio(f64),
}

/// One date of the spread series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpreadPoint {
    pub date: NaiveDate,
    pub spread: f64,
    pub rolling_mean: Option<f64>,
    pub rolling_std: Option<f64>,
    /// Absent during warm-up and when the rolling std is zero.
    pub z_score: Option<f64>,
}

/// Everything the backtester needs for one pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyOutput {
    pub instrument_a: String,
    pub instrument_b: String,
    pub hedge_ratio: f64,
    pub params: StrategyParams,
    pub prices_a: Vec<f64>,
    pub prices_b: Vec<f64>,
    pub spread: Vec<SpreadPoint>,
    /// Position held at the close of each date.
    pub positions: Vec<PositionState>,
    pub transitions: Vec<Transition>,
}

impl StrategyOutput {
    pub fn label(&self) -> String {
        pair_label(&self.instrument_a, &self.instrument_b)
    }

    pub fn len(&self) -> usize {
        self.spread.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spread.is_empty()
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.spread.iter().map(|p| p.date)
    }

    /// Number of positions opened.
    pub fn entry_count(&self) -> usize {
        self.transitions
            .iter()
            .filter(|t| matches!(t, Transition::Enter(_)))
            .count()
    }
}

/// Builds the spread series and position sequence for a pair.
#[derive(Debug, Clone)]
pub struct SignalEngine {
    params: StrategyParams,
}

impl SignalEngine {
    pub fn new(params: StrategyParams) -> Result<Self, StrategyError> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &StrategyParams {
        &self.params
    }

    /// Spread `a - hedge_ratio * b`, its rolling z-score, and the resulting
    /// positions.
    ///
    /// A series shorter than the lookback is valid: every z-score is
    /// undefined and the pair stays flat.
    pub fn run_strategy(
        &self,
        prices: &PriceMatrix,
        a: &str,
        b: &str,
        hedge_ratio: f64,
    ) -> Result<StrategyOutput, StrategyError> {
        if !hedge_ratio.is_finite() || hedge_ratio == 0.0 {
            return Err(StrategyError::DegenerateHedgeRatio(hedge_ratio));
        }
        let pa = prices
            .prices(a)
            .ok_or_else(|| StrategyError::UnknownInstrument(a.to_string()))?;
        let pb = prices
            .prices(b)
            .ok_or_else(|| StrategyError::UnknownInstrument(b.to_string()))?;

        let spread = spread_series(prices.dates(), pa, pb, hedge_ratio, self.params.lookback);
        let z: Vec<Option<f64>> = spread.iter().map(|p| p.z_score).collect();
        let (positions, transitions) =
            evaluate_positions(prices.dates(), &z, hedge_ratio, &self.params);

        Ok(StrategyOutput {
            instrument_a: a.to_string(),
            instrument_b: b.to_string(),
            hedge_ratio,
            params: self.params,
            prices_a: pa.to_vec(),
            prices_b: pb.to_vec(),
            spread,
            positions,
            transitions,
        })
    }
}

/// Spread with trailing-window statistics and z-scores.
pub fn spread_series(
    dates: &[NaiveDate],
    prices_a: &[f64],
    prices_b: &[f64],
    hedge_ratio: f64,
    lookback: usize,
) -> Vec<SpreadPoint> {
    let spread: Vec<f64> = prices_a
        .iter()
        .zip(prices_b)
        .map(|(a, b)| a - hedge_ratio * b)
        .collect();
    let rolling = rolling_mean_std(&spread, lookback);

    dates
        .iter()
        .zip(&spread)
        .zip(rolling)
        .map(|((&date, &value), stats)| {
            let z_score = stats.and_then(|(m, s)| {
                if s <= STD_EPSILON * m.abs().max(1.0) {
                    None
                } else {
                    Some((value - m) / s)
                }
            });
            SpreadPoint {
                date,
                spread: value,
                rolling_mean: stats.map(|(m, _)| m),
                rolling_std: stats.map(|(_, s)| s),
                z_score,
            }
        })
        .collect()
}
