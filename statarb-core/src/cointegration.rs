//! Cointegration screen: Engle-Granger tests over every instrument pair.
//!
//! For each unordered pair `(a, b)` the analyzer regresses `a` on `b` to get
//! the hedge ratio, runs an ADF test (no constant, AIC lag choice) on the
//! residuals, and converts the statistic to a MacKinnon p-value for a
//! two-variable system. The test runs in both regression directions and the
//! larger (less significant) statistic is kept, so `test_pair(a, b)` and
//! `test_pair(b, a)` agree on the statistic and p-value.
//!
//! Pairs are selected on the full history supplied. There is no
//! out-of-sample split.

use crate::domain::{PairCandidate, PriceMatrix};
use crate::stats::{
    adf_test, cointegration_p_value, linear_fit, mean, pearson, sample_std, Deterministic,
    LinearFit,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Residual regressions need at least this many points regardless of config.
const MIN_TEST_OBSERVATIONS: usize = 20;

/// `1 - R²` below this means the pair is numerically collinear and the
/// residual test degenerates.
const COLLINEARITY_TOLERANCE: f64 = 100.0 * 1.490_116_119_384_765_6e-8;

/// Statistic reported for collinear series. Finite and exactly
/// representable in JSON so reports read back unchanged.
pub const COLLINEAR_STATISTIC: f64 = -1.0e300;

/// Screen configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Pairs with `p_value <= significance_level` are retained.
    pub significance_level: f64,
    /// Pairs with fewer shared observations are skipped.
    pub min_observations: usize,
    /// Upper bound on ADF augmenting lags. `None` uses Schwert's rule.
    pub max_lag: Option<usize>,
    /// Evaluate pairs on the rayon pool.
    pub parallel: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            significance_level: 0.05,
            min_observations: 60,
            max_lag: None,
            parallel: true,
        }
    }
}

/// Why a pair was not evaluated.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    #[error("insufficient data: {actual} observations, need {required}")]
    InsufficientData { required: usize, actual: usize },

    #[error("degenerate hedge ratio ({hedge_ratio})")]
    DegenerateHedgeRatio { hedge_ratio: f64 },

    #[error("unknown instrument '{symbol}'")]
    UnknownInstrument { symbol: String },
}

/// A pair that was skipped, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedPair {
    pub instrument_a: String,
    pub instrument_b: String,
    pub reason: SkipReason,
}

/// Everything a screen produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenReport {
    /// Pairs with `p_value <= significance_level`, ranked.
    pub candidates: Vec<PairCandidate>,
    pub skipped: Vec<SkippedPair>,
    /// Number of unordered pairs considered.
    pub tested: usize,
    pub significance_level: f64,
}

impl ScreenReport {
    /// The first `n` ranked candidates.
    pub fn top(&self, n: usize) -> &[PairCandidate] {
        &self.candidates[..n.min(self.candidates.len())]
    }
}

/// Outcome of one Engle-Granger regression direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngleGranger {
    pub fit: LinearFit,
    /// `COLLINEAR_STATISTIC` when the two series are collinear. Never infinite.
    pub statistic: f64,
    pub used_lag: usize,
}

/// Engle-Granger test of `y` on `x`: OLS with intercept, then ADF without
/// deterministic terms on the residuals.
///
/// `None` when `x` is constant or the residual regression cannot be fit.
pub fn engle_granger(y: &[f64], x: &[f64], max_lag: Option<usize>) -> Option<EngleGranger> {
    let fit = linear_fit(y, x)?;
    if 1.0 - fit.r_squared < COLLINEARITY_TOLERANCE {
        return Some(EngleGranger {
            fit,
            statistic: COLLINEAR_STATISTIC,
            used_lag: 0,
        });
    }
    let residuals: Vec<f64> = y
        .iter()
        .zip(x)
        .map(|(yi, xi)| yi - fit.slope * xi - fit.intercept)
        .collect();
    let adf = adf_test(&residuals, Deterministic::None, max_lag)?;
    Some(EngleGranger {
        fit,
        statistic: adf.statistic.clamp(COLLINEAR_STATISTIC, -COLLINEAR_STATISTIC),
        used_lag: adf.used_lag,
    })
}

/// Tests instrument pairs for cointegration and ranks the ones that pass.
#[derive(Debug, Clone, Default)]
pub struct CointegrationAnalyzer {
    config: AnalyzerConfig,
}

impl CointegrationAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Test one pair. The result carries the p-value whether or not it
    /// clears the significance level.
    pub fn test_pair(
        &self,
        prices: &PriceMatrix,
        a: &str,
        b: &str,
    ) -> Result<PairCandidate, SkipReason> {
        let i = prices
            .position(a)
            .ok_or_else(|| SkipReason::UnknownInstrument { symbol: a.into() })?;
        let j = prices
            .position(b)
            .ok_or_else(|| SkipReason::UnknownInstrument { symbol: b.into() })?;
        self.test_columns(prices, i, j)
    }

    /// Screen every unordered pair in column order.
    pub fn screen(&self, prices: &PriceMatrix) -> ScreenReport {
        let k = prices.instrument_count();
        let pairs: Vec<(usize, usize)> = (0..k)
            .flat_map(|i| ((i + 1)..k).map(move |j| (i, j)))
            .collect();

        info!(
            instruments = k,
            pairs = pairs.len(),
            observations = prices.len(),
            significance = self.config.significance_level,
            "Screening pairs for cointegration"
        );

        let outcomes: Vec<Result<PairCandidate, SkipReason>> = if self.config.parallel {
            pairs
                .par_iter()
                .map(|&(i, j)| self.test_columns(prices, i, j))
                .collect()
        } else {
            pairs
                .iter()
                .map(|&(i, j)| self.test_columns(prices, i, j))
                .collect()
        };

        let symbols = prices.symbols();
        let mut candidates = Vec::new();
        let mut skipped = Vec::new();
        for (&(i, j), outcome) in pairs.iter().zip(outcomes) {
            match outcome {
                Ok(c) if c.p_value <= self.config.significance_level => candidates.push(c),
                Ok(_) => {}
                Err(reason) => {
                    debug!(a = %symbols[i], b = %symbols[j], %reason, "Skipping pair");
                    skipped.push(SkippedPair {
                        instrument_a: symbols[i].clone(),
                        instrument_b: symbols[j].clone(),
                        reason,
                    });
                }
            }
        }
        rank(&mut candidates);

        info!(
            tested = pairs.len(),
            cointegrated = candidates.len(),
            skipped = skipped.len(),
            "Cointegration screen complete"
        );

        ScreenReport {
            candidates,
            skipped,
            tested: pairs.len(),
            significance_level: self.config.significance_level,
        }
    }

    /// Ranked pairs with `p_value <= significance_level`.
    pub fn test_cointegration(
        &self,
        prices: &PriceMatrix,
        significance_level: f64,
    ) -> Vec<PairCandidate> {
        let analyzer = Self::new(AnalyzerConfig {
            significance_level,
            ..self.config.clone()
        });
        analyzer.screen(prices).candidates
    }

    /// The `n_pairs` best-ranked pairs at the configured significance level.
    pub fn get_top_pairs(&self, prices: &PriceMatrix, n_pairs: usize) -> Vec<PairCandidate> {
        let mut candidates = self.screen(prices).candidates;
        candidates.truncate(n_pairs);
        candidates
    }

    fn test_columns(
        &self,
        prices: &PriceMatrix,
        i: usize,
        j: usize,
    ) -> Result<PairCandidate, SkipReason> {
        let n = prices.len();
        let required = self.config.min_observations.max(MIN_TEST_OBSERVATIONS);
        if n < required {
            return Err(SkipReason::InsufficientData {
                required,
                actual: n,
            });
        }

        let pa = prices.column(i);
        let pb = prices.column(j);
        let max_lag = self.config.max_lag;

        let hedge_ratio = linear_fit(pa, pb).map_or(f64::NAN, |f| f.slope);
        if !hedge_ratio.is_finite() || hedge_ratio == 0.0 {
            return Err(SkipReason::DegenerateHedgeRatio { hedge_ratio });
        }

        let insufficient = SkipReason::InsufficientData {
            required,
            actual: n,
        };
        let forward = engle_granger(pa, pb, max_lag).ok_or_else(|| insufficient.clone())?;
        let reverse = engle_granger(pb, pa, max_lag).ok_or(insufficient)?;

        let (statistic, used_lag) = if reverse.statistic > forward.statistic {
            (reverse.statistic, reverse.used_lag)
        } else {
            (forward.statistic, forward.used_lag)
        };

        let spread: Vec<f64> = pa
            .iter()
            .zip(pb)
            .map(|(a, b)| a - hedge_ratio * b)
            .collect();

        let symbols = prices.symbols();
        Ok(PairCandidate {
            instrument_a: symbols[i].clone(),
            instrument_b: symbols[j].clone(),
            p_value: cointegration_p_value(statistic),
            test_statistic: statistic,
            hedge_ratio,
            intercept: forward.fit.intercept,
            correlation: pearson(pa, pb),
            spread_mean: mean(&spread),
            spread_std: sample_std(&spread),
            used_lag,
            n_obs: n,
        })
    }
}

/// Sort by ascending p-value, then descending |correlation|, then by
/// instrument names.
pub fn rank(candidates: &mut [PairCandidate]) {
    candidates.sort_by(|x, y| {
        x.p_value
            .total_cmp(&y.p_value)
            .then_with(|| y.correlation.abs().total_cmp(&x.correlation.abs()))
            .then_with(|| x.instrument_a.cmp(&y.instrument_a))
            .then_with(|| x.instrument_b.cmp(&y.instrument_b))
    });
}
