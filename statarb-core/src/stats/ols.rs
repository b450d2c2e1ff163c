//! Ordinary least squares.
//!
//! `linear_fit` is the closed-form single-regressor fit used for hedge
//! ratios. `Ols::fit` handles the multi-regressor case (ADF auxiliary
//! regressions) through the normal equations on nalgebra matrices.

use nalgebra::{DMatrix, DVector};

/// Result of `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
}

/// Fit `y = slope * x + intercept`.
///
/// `None` when the lengths differ, there are fewer than 3 points, or `x`
/// has zero variance.
pub fn linear_fit(y: &[f64], x: &[f64]) -> Option<LinearFit> {
    let n = y.len();
    if n != x.len() || n < 3 {
        return None;
    }
    let mx = x.iter().sum::<f64>() / n as f64;
    let my = y.iter().sum::<f64>() / n as f64;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    let mut syy = 0.0;
    for (xi, yi) in x.iter().zip(y) {
        let dx = xi - mx;
        let dy = yi - my;
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }
    if sxx <= 0.0 {
        return None;
    }

    let slope = sxy / sxx;
    let intercept = my - slope * mx;
    let r_squared = if syy > 0.0 {
        (sxy * sxy / (sxx * syy)).min(1.0)
    } else {
        1.0
    };
    Some(LinearFit {
        slope,
        intercept,
        r_squared,
    })
}

/// A fitted multi-regressor OLS model.
#[derive(Debug, Clone)]
pub struct Ols {
    pub coefficients: DVector<f64>,
    pub std_errors: DVector<f64>,
    /// Sum of squared residuals.
    pub ssr: f64,
    pub nobs: usize,
    /// Number of estimated parameters.
    pub k: usize,
}

impl Ols {
    /// Fit `y = X b + e`. `None` when the system is under-determined or
    /// `X'X` is singular.
    pub fn fit(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<Self> {
        let (nobs, k) = x.shape();
        if nobs != y.len() || k == 0 || nobs <= k {
            return None;
        }

        let xt = x.transpose();
        let xtx_inv = (&xt * x).try_inverse()?;
        let beta = &xtx_inv * (&xt * y);

        let residuals = y - x * &beta;
        let ssr = residuals.dot(&residuals);
        let sigma2 = ssr / (nobs - k) as f64;

        let std_errors = DVector::from_iterator(
            k,
            (0..k).map(|i| (sigma2 * xtx_inv[(i, i)]).max(0.0).sqrt()),
        );

        Some(Self {
            coefficients: beta,
            std_errors,
            ssr,
            nobs,
            k,
        })
    }

    /// t-statistic of coefficient `i`. Infinite when its standard error is 0.
    pub fn t_value(&self, i: usize) -> f64 {
        let se = self.std_errors[i];
        if se == 0.0 {
            return f64::INFINITY.copysign(self.coefficients[i]);
        }
        self.coefficients[i] / se
    }

    /// Gaussian log-likelihood at the OLS estimate.
    pub fn log_likelihood(&self) -> f64 {
        let n = self.nobs as f64;
        -n / 2.0 * ((2.0 * std::f64::consts::PI).ln() + (self.ssr / n).ln() + 1.0)
    }

    /// Akaike information criterion, `-2 llf + 2 k`.
    pub fn aic(&self) -> f64 {
        -2.0 * self.log_likelihood() + 2.0 * self.k as f64
    }
}
