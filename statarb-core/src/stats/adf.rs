//! Augmented Dickey-Fuller unit-root test with AIC lag selection.
//!
//! Auxiliary regression for lag `p`:
//!
//! ```text
//! Δy[t] = (c) + γ·y[t-1] + Σ_{i=1..p} φ_i·Δy[t-i] + ε[t]
//! ```
//!
//! The statistic is the t-value of `γ`. Candidate lags `0..=max_lag` are
//! compared on a common sample (the one implied by `max_lag`); the winner is
//! then refit on the longest sample it allows.

use super::ols::Ols;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// Deterministic terms in the auxiliary regression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Deterministic {
    /// No constant. Used on Engle-Granger residuals, which are already
    /// demeaned by the cointegrating regression.
    None,
    Constant,
}

impl Deterministic {
    fn n_terms(self) -> usize {
        match self {
            Deterministic::None => 0,
            Deterministic::Constant => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdfResult {
    pub statistic: f64,
    pub used_lag: usize,
    /// Observations in the final auxiliary regression.
    pub nobs: usize,
}

/// Schwert's rule `ceil(12 · (n/100)^¼)`, capped so the lag search leaves
/// enough observations: at most `n/2 - terms - 1`.
pub fn schwert_max_lag(n: usize, deterministic: Deterministic) -> usize {
    let rule = (12.0 * (n as f64 / 100.0).powf(0.25)).ceil() as usize;
    rule.min((n / 2).saturating_sub(deterministic.n_terms() + 1))
}

/// Run the ADF test on `series`.
///
/// `max_lag` overrides Schwert's rule (still subject to the cap). `None` when
/// the series is too short or every candidate regression is singular.
pub fn adf_test(
    series: &[f64],
    deterministic: Deterministic,
    max_lag: Option<usize>,
) -> Option<AdfResult> {
    let n = series.len();
    if n < 4 {
        return None;
    }
    let cap = schwert_max_lag(n, deterministic);
    let max_lag = max_lag.map_or(cap, |l| l.min(cap));
    let diffs: Vec<f64> = series.windows(2).map(|w| w[1] - w[0]).collect();

    // Lag search on the common sample starting at `max_lag`.
    let mut best: Option<(usize, f64)> = None;
    for lag in 0..=max_lag {
        let (x, y) = design(series, &diffs, lag, max_lag, deterministic);
        let Some(fit) = Ols::fit(&x, &y) else {
            continue;
        };
        let aic = fit.aic();
        if best.map_or(true, |(_, best_aic)| aic < best_aic) {
            best = Some((lag, aic));
        }
    }
    let (lag, _) = best?;

    let (x, y) = design(series, &diffs, lag, lag, deterministic);
    let fit = Ols::fit(&x, &y)?;
    Some(AdfResult {
        statistic: fit.t_value(0),
        used_lag: lag,
        nobs: fit.nobs,
    })
}

/// Regressors `[y[t], Δy[t-1], …, Δy[t-lag], (1)]` against `Δy[t]` for
/// `t in start..diffs.len()`. Column 0 is always the lagged level.
fn design(
    series: &[f64],
    diffs: &[f64],
    lag: usize,
    start: usize,
    deterministic: Deterministic,
) -> (DMatrix<f64>, DVector<f64>) {
    let rows = diffs.len().saturating_sub(start);
    let cols = 1 + lag + deterministic.n_terms();

    let x = DMatrix::from_fn(rows, cols, |r, c| {
        let t = start + r;
        match c {
            0 => series[t],
            c if c <= lag => diffs[t - c],
            _ => 1.0,
        }
    });
    let y = DVector::from_iterator(rows, diffs[start..].iter().copied());
    (x, y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::mackinnon::adf_p_value;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn gaussian(rng: &mut StdRng) -> f64 {
        let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
        let u2: f64 = rng.gen();
        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }

    #[test]
    fn schwert_rule_values() {
        assert_eq!(schwert_max_lag(100, Deterministic::Constant), 12);
        assert_eq!(schwert_max_lag(500, Deterministic::None), 18);
        // Capped by n/2 - 1 for short series.
        assert_eq!(schwert_max_lag(10, Deterministic::None), 4);
    }

    #[test]
    fn stationary_series_rejects_unit_root() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut x = vec![0.0];
        for _ in 0..400 {
            let last = *x.last().unwrap();
            x.push(0.3 * last + gaussian(&mut rng));
        }
        let res = adf_test(&x, Deterministic::Constant, None).unwrap();
        assert!(res.statistic < -5.0, "stat = {}", res.statistic);
        assert!(adf_p_value(res.statistic) < 0.01);
    }

    #[test]
    fn random_walk_does_not_reject() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut x = vec![100.0];
        for _ in 0..400 {
            let last = *x.last().unwrap();
            x.push(last + gaussian(&mut rng));
        }
        let res = adf_test(&x, Deterministic::Constant, None).unwrap();
        assert!(adf_p_value(res.statistic) > 0.01, "stat = {}", res.statistic);
    }

    #[test]
    fn explicit_max_lag_bounds_used_lag() {
        let mut rng = StdRng::seed_from_u64(3);
        let x: Vec<f64> = (0..200).map(|_| gaussian(&mut rng)).collect();
        let res = adf_test(&x, Deterministic::None, Some(2)).unwrap();
        assert!(res.used_lag <= 2);
        assert_eq!(res.nobs, 199 - res.used_lag);
    }

    #[test]
    fn too_short_is_none() {
        assert!(adf_test(&[1.0, 2.0, 3.0], Deterministic::None, None).is_none());
    }
}
