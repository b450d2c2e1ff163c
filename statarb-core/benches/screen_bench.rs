//! Criterion benchmarks for statarb hot paths.
//!
//! Benchmarks:
//! 1. ADF regression on a single series
//! 2. Full pair screen, sequential vs rayon
//! 3. Signal generation and backtest for one pair

use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use statarb_core::stats::{adf_test, Deterministic};
use statarb_core::{
    AnalyzerConfig, Backtester, CointegrationAnalyzer, PriceMatrix, SignalEngine, StrategyParams,
};

// ── Helpers ──────────────────────────────────────────────────────────

fn gaussian(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// `k` instruments loading on one factor with AR(1) idiosyncratic noise.
fn make_matrix(k: usize, n: usize) -> PriceMatrix {
    let mut rng = StdRng::seed_from_u64(1234);
    let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    let dates = (0..n).map(|i| start + Duration::days(i as i64)).collect();

    let mut factor = Vec::with_capacity(n);
    let mut level = 100.0_f64;
    for _ in 0..n {
        level = (level + gaussian(&mut rng)).max(10.0);
        factor.push(level);
    }

    let columns = (0..k)
        .map(|j| {
            let beta = 0.5 + j as f64 * 0.1;
            let mut resid = 0.0;
            let prices = factor
                .iter()
                .map(|f| {
                    resid = 0.9 * resid + gaussian(&mut rng);
                    (beta * f + 50.0 + resid).max(1.0)
                })
                .collect();
            (format!("SYM{j:02}"), prices)
        })
        .collect();
    PriceMatrix::new(dates, columns).unwrap()
}

// ── Benchmarks ───────────────────────────────────────────────────────

fn bench_adf(c: &mut Criterion) {
    let m = make_matrix(1, 750);
    let series = m.column(0).to_vec();
    c.bench_function("adf_750", |b| {
        b.iter(|| adf_test(black_box(&series), Deterministic::Constant, None))
    });
}

fn bench_screen(c: &mut Criterion) {
    let mut group = c.benchmark_group("screen");
    group.sample_size(10);
    let prices = make_matrix(20, 500);
    for parallel in [false, true] {
        let analyzer = CointegrationAnalyzer::new(AnalyzerConfig {
            parallel,
            ..AnalyzerConfig::default()
        });
        let label = if parallel { "rayon" } else { "sequential" };
        group.bench_with_input(BenchmarkId::new(label, 190), &prices, |b, p| {
            b.iter(|| analyzer.screen(black_box(p)))
        });
    }
    group.finish();
}

fn bench_signal_backtest(c: &mut Criterion) {
    let prices = make_matrix(2, 2_000);
    let engine = SignalEngine::new(StrategyParams::default()).unwrap();
    let backtester = Backtester::default();
    c.bench_function("signal_backtest_2000", |b| {
        b.iter(|| {
            let out = engine
                .run_strategy(black_box(&prices), "SYM00", "SYM01", 0.83)
                .unwrap();
            backtester.backtest_pair(&out, "SYM00_vs_SYM01")
        })
    });
}

criterion_group!(benches, bench_adf, bench_screen, bench_signal_backtest);
criterion_main!(benches);
