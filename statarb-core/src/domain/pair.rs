//! PairCandidate: a cointegrated pair that passed the screen.

use serde::{Deserialize, Serialize};

/// A cointegrated pair with the statistics used to rank and trade it.
///
/// `hedge_ratio` and `intercept` come from regressing `instrument_a` on
/// `instrument_b`; the spread traded is `price_a - hedge_ratio * price_b`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairCandidate {
    pub instrument_a: String,
    pub instrument_b: String,
    pub p_value: f64,
    /// Engle-Granger ADF statistic (the less negative of the two directions).
    pub test_statistic: f64,
    pub hedge_ratio: f64,
    pub intercept: f64,
    /// Pearson correlation of raw prices. Reporting only.
    pub correlation: f64,
    pub spread_mean: f64,
    pub spread_std: f64,
    /// Augmenting lags picked by AIC for the reported direction.
    pub used_lag: usize,
    pub n_obs: usize,
}

impl PairCandidate {
    /// Display label, `"{a}_vs_{b}"`.
    pub fn label(&self) -> String {
        pair_label(&self.instrument_a, &self.instrument_b)
    }
}

pub fn pair_label(a: &str, b: &str) -> String {
    format!("{a}_vs_{b}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_joins_instruments() {
        assert_eq!(pair_label("INFY.NS", "TCS.NS"), "INFY.NS_vs_TCS.NS");
    }
}
