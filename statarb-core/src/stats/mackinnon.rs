//! MacKinnon (1994) approximate asymptotic p-values for unit-root and
//! cointegration tests, constant-term case.
//!
//! The p-value is `Φ(c0 + c1·τ + c2·τ² + …)` with separate polynomials for
//! the small-p and large-p regions of the statistic.

use statrs::function::erf::erfc;

/// Response surface for one number of integrated variables.
struct Surface {
    /// Above this the p-value is 1.
    tau_max: f64,
    /// Below this the p-value is 0.
    tau_min: f64,
    /// Switch point between the two polynomials.
    tau_star: f64,
    small_p: &'static [f64],
    large_p: &'static [f64],
}

/// N = 1: single series ADF with a constant.
const ADF_CONSTANT: Surface = Surface {
    tau_max: 2.74,
    tau_min: -18.83,
    tau_star: -1.61,
    small_p: &[2.1659, 1.4412, 0.038269],
    large_p: &[1.7339, 0.93202, -0.12745, -0.010368],
};

/// N = 2: Engle-Granger residual test for a two-variable system.
const EG_TWO_VARIABLES: Surface = Surface {
    tau_max: 0.92,
    tau_min: -18.86,
    tau_star: -2.62,
    small_p: &[2.92, 1.5012, 0.039796],
    large_p: &[2.1945, 0.64695, -0.29198, -0.042377],
};

/// p-value of an ADF statistic from a regression with a constant.
pub fn adf_p_value(statistic: f64) -> f64 {
    p_value(statistic, &ADF_CONSTANT)
}

/// p-value of an Engle-Granger statistic for a pair (N = 2, constant in the
/// cointegrating regression).
pub fn cointegration_p_value(statistic: f64) -> f64 {
    p_value(statistic, &EG_TWO_VARIABLES)
}

fn p_value(statistic: f64, surface: &Surface) -> f64 {
    if statistic.is_nan() {
        return 1.0;
    }
    if statistic > surface.tau_max {
        return 1.0;
    }
    if statistic < surface.tau_min {
        return 0.0;
    }
    let coefs = if statistic <= surface.tau_star {
        surface.small_p
    } else {
        surface.large_p
    };
    // Horner, highest power first.
    let z = coefs.iter().rev().fold(0.0, |acc, c| acc * statistic + c);
    normal_cdf(z)
}

/// Standard normal CDF.
fn normal_cdf(z: f64) -> f64 {
    0.5 * erfc(-z / std::f64::consts::SQRT_2)
}
