//! Descriptive statistics over price and return slices.
//!
//! Degenerate inputs (empty, single point, zero variance) return 0.0 or
//! `None` instead of NaN so callers never propagate NaNs silently.

/// Arithmetic mean. 0.0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n−1 denominator). 0.0 for fewer than 2 points.
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

/// Pearson correlation of two equal-length series.
///
/// 0.0 when either series has zero variance or the lengths differ.
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    if x.len() != y.len() || x.len() < 2 {
        return 0.0;
    }
    let mx = mean(x);
    let my = mean(y);
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (a, b) in x.iter().zip(y) {
        let dx = a - mx;
        let dy = b - my;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return 0.0;
    }
    (sxy / (sxx.sqrt() * syy.sqrt())).clamp(-1.0, 1.0)
}

/// Trailing-window mean and sample std, aligned to the input.
///
/// Entry `t` covers `values[t + 1 - window..=t]`; the first `window - 1`
/// entries are `None`. A window below 2 yields all `None`.
pub fn rolling_mean_std(values: &[f64], window: usize) -> Vec<Option<(f64, f64)>> {
    let mut out = vec![None; values.len()];
    if window < 2 || values.len() < window {
        return out;
    }
    for (i, w) in values.windows(window).enumerate() {
        out[i + window - 1] = Some((mean(w), sample_std(w)));
    }
    out
}

/// Simple returns `p[t] / p[t-1] - 1`; the first entry is 0.0.
pub fn simple_returns(prices: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(prices.len());
    if prices.is_empty() {
        return out;
    }
    out.push(0.0);
    out.extend(prices.windows(2).map(|w| {
        if w[0] == 0.0 {
            0.0
        } else {
            w[1] / w[0] - 1.0
        }
    }));
    out
}
