//! Integration tests for the cointegration screen on synthetic prices.

use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use statarb_core::{AnalyzerConfig, CointegrationAnalyzer, PriceMatrix, SkipReason};

// ── Helpers ──────────────────────────────────────────────────────────

fn gaussian(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

fn dates(n: usize) -> Vec<NaiveDate> {
    let start = NaiveDate::from_ymd_opt(2022, 1, 3).unwrap();
    (0..n).map(|i| start + Duration::days(i as i64)).collect()
}

fn random_walk(rng: &mut StdRng, n: usize, start: f64) -> Vec<f64> {
    let mut level = start;
    (0..n)
        .map(|_| {
            let out = level;
            level = (level + gaussian(rng)).max(20.0);
            out
        })
        .collect()
}

/// `a = 2·b + N(0, 0.01·b)` with `b` a random walk from 200.
fn hedged_pair(seed: u64, n: usize) -> (Vec<f64>, Vec<f64>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let b = random_walk(&mut rng, n, 200.0);
    let a = b
        .iter()
        .map(|&pb| 2.0 * pb + 0.01 * pb * gaussian(&mut rng))
        .collect();
    (a, b)
}

/// Two cointegrated pairs and an independent walk.
fn universe(seed: u64, n: usize) -> PriceMatrix {
    let (a, b) = hedged_pair(seed, n);
    let (c, d) = hedged_pair(seed + 1, n);
    let mut rng = StdRng::seed_from_u64(seed + 2);
    let e = random_walk(&mut rng, n, 80.0);
    PriceMatrix::new(
        dates(n),
        vec![
            ("AAA".into(), a),
            ("BBB".into(), b),
            ("CCC".into(), c),
            ("DDD".into(), d),
            ("EEE".into(), e),
        ],
    )
    .unwrap()
}

// ── Tests ────────────────────────────────────────────────────────────

#[test]
fn known_hedge_ratio_is_recovered() {
    let (a, b) = hedged_pair(7, 500);
    let prices = PriceMatrix::new(dates(500), vec![("A".into(), a), ("B".into(), b)]).unwrap();
    let analyzer = CointegrationAnalyzer::new(AnalyzerConfig::default());

    let c = analyzer.test_pair(&prices, "A", "B").unwrap();
    assert!(c.p_value < 0.01, "p = {}", c.p_value);
    assert!((c.hedge_ratio - 2.0).abs() < 0.02, "hedge = {}", c.hedge_ratio);
    assert!(c.correlation > 0.9);
    assert_eq!(c.n_obs, 500);

    let ranked = analyzer.test_cointegration(&prices, 0.05);
    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].label(), "A_vs_B");
}

#[test]
fn pair_test_is_symmetric_in_p_value() {
    let prices = universe(11, 300);
    let analyzer = CointegrationAnalyzer::new(AnalyzerConfig::default());
    let symbols = prices.symbols().to_vec();
    for a in &symbols {
        for b in &symbols {
            if a == b {
                continue;
            }
            let ab = analyzer.test_pair(&prices, a, b).unwrap();
            let ba = analyzer.test_pair(&prices, b, a).unwrap();
            assert_eq!(ab.p_value, ba.p_value, "{a}/{b}");
            assert_eq!(ab.test_statistic, ba.test_statistic, "{a}/{b}");
        }
    }
}

#[test]
fn top_pairs_is_a_sorted_prefix_of_the_full_ranking() {
    let prices = universe(23, 400);
    let analyzer = CointegrationAnalyzer::new(AnalyzerConfig::default());

    let all = analyzer.test_cointegration(&prices, 0.05);
    assert!(all.len() >= 2);
    assert!(all.windows(2).all(|w| w[0].p_value <= w[1].p_value));
    assert!(all.iter().all(|c| c.p_value <= 0.05));

    for n in 0..=all.len() + 1 {
        let top = analyzer.get_top_pairs(&prices, n);
        assert_eq!(top.len(), n.min(all.len()));
        assert_eq!(&all[..top.len()], &top[..]);
    }
}

#[test]
fn short_history_skips_every_pair() {
    let prices = universe(5, 40);
    let report = CointegrationAnalyzer::new(AnalyzerConfig::default()).screen(&prices);
    assert_eq!(report.tested, 10);
    assert!(report.candidates.is_empty());
    assert_eq!(report.skipped.len(), 10);
    assert!(report.skipped.iter().all(|s| matches!(
        s.reason,
        SkipReason::InsufficientData {
            required: 60,
            actual: 40
        }
    )));
}

#[test]
fn significance_level_one_keeps_every_testable_pair() {
    let prices = universe(31, 250);
    let analyzer = CointegrationAnalyzer::new(AnalyzerConfig::default());
    assert_eq!(analyzer.test_cointegration(&prices, 1.0).len(), 10);
    assert!(analyzer.test_cointegration(&prices, 0.0).len() <= 10);
}
