//! End-to-end pipeline tests on synthetic prices.
//!
//! Everything runs offline against a temporary cache, so no test here
//! touches the network.

use chrono::NaiveDate;
use statarb_core::data::PriceCache;
use statarb_runner::data_loader::LoadError;
use statarb_runner::{
    load_artifacts, run_from_config, save_artifacts, RunConfig, RunError,
};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn synthetic_config() -> RunConfig {
    let mut config = RunConfig::default();
    config.data.symbols = ["HDFCBANK.NS", "ICICIBANK.NS", "TCS.NS", "INFY.NS"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    config.data.start = Some(d(2022, 1, 3));
    config.data.end = Some(d(2023, 12, 29));
    config.data.offline = true;
    config.data.synthetic = true;
    config.screen.top_pairs = 3;
    config
}

#[test]
fn synthetic_run_screens_and_backtests() {
    let dir = tempfile::tempdir().unwrap();
    let cache = PriceCache::new(dir.path());
    let config = synthetic_config();

    let report = run_from_config(&config, &cache, None, None, d(2024, 1, 1)).unwrap();

    assert!(report.has_synthetic);
    assert!(report.dataset_hash.is_some());
    assert!(report.data_failures.is_empty());
    assert_eq!(report.instruments.len(), 4);
    assert_eq!(report.screen.tested, 6);
    assert!(!report.screen.candidates.is_empty());
    assert_eq!(report.runs.len(), report.screen.top(3).len());

    for (run, cand) in report.runs.iter().zip(&report.screen.candidates) {
        assert_eq!(run.label, cand.label());
        assert_eq!(run.output.len(), run.result.equity_curve.len());
        assert_eq!(run.result.metrics.number_of_trades, run.result.trades.len());
        assert!(run.result.metrics.max_drawdown <= 0.0);
    }
    for pair in report.screen.candidates.windows(2) {
        assert!(pair[0].p_value <= pair[1].p_value);
    }
}

#[test]
fn same_config_gives_same_report() {
    let dir = tempfile::tempdir().unwrap();
    let cache = PriceCache::new(dir.path());
    let config = synthetic_config();
    let today = d(2024, 1, 1);

    let first = run_from_config(&config, &cache, None, None, today).unwrap();
    let second = run_from_config(&config, &cache, None, None, today).unwrap();

    assert_eq!(first.run_id, second.run_id);
    assert_eq!(first.dataset_hash, second.dataset_hash);
    assert_eq!(first.runs.len(), second.runs.len());
    for (a, b) in first.runs.iter().zip(&second.runs) {
        assert_eq!(a.label, b.label);
        assert_eq!(a.result, b.result);
    }
}

#[test]
fn artifacts_are_written_and_reloaded() {
    let cache_dir = tempfile::tempdir().unwrap();
    let out_dir = tempfile::tempdir().unwrap();
    let cache = PriceCache::new(cache_dir.path());

    let report = run_from_config(&synthetic_config(), &cache, None, None, d(2024, 1, 1)).unwrap();
    let run_dir = save_artifacts(&report, out_dir.path()).unwrap();

    for file in ["report.json", "report.md", "pairs.csv", "comparison.csv"] {
        assert!(run_dir.join(file).exists(), "missing {file}");
    }
    for run in &report.runs {
        let pair_dir = run_dir.join(&run.label);
        for file in ["result.json", "trades.csv", "equity.csv", "spread.csv"] {
            assert!(pair_dir.join(file).exists(), "missing {}/{file}", run.label);
        }
    }

    let loaded = load_artifacts(&run_dir).unwrap();
    assert_eq!(loaded.run_id, report.run_id);
    assert_eq!(loaded.runs.len(), report.runs.len());
    assert_eq!(loaded.config, report.config);

    let spread_csv = std::fs::read_to_string(
        run_dir.join(&report.runs[0].label).join("spread.csv"),
    )
    .unwrap();
    assert!(spread_csv.starts_with("date,spread,rolling_mean,rolling_std,z_score,position"));
    assert_eq!(spread_csv.lines().count(), report.runs[0].output.len() + 1);
}

#[test]
fn offline_without_synthetic_on_empty_cache_fails() {
    let dir = tempfile::tempdir().unwrap();
    let cache = PriceCache::new(dir.path());
    let mut config = synthetic_config();
    config.data.synthetic = false;

    let err = run_from_config(&config, &cache, None, None, d(2024, 1, 1)).unwrap_err();
    assert!(matches!(
        err,
        RunError::Data(LoadError::NothingLoaded { attempted: 4, .. })
    ));
}

#[test]
fn toml_config_drives_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let cache = PriceCache::new(dir.path());
    let toml = r#"
        [data]
        symbols = ["TCS.NS", "INFY.NS", "WIPRO.NS"]
        start = "2022-06-01"
        end = "2023-12-29"
        offline = true
        synthetic = true

        [screen]
        top_pairs = 1

        [strategy]
        entry_threshold = 1.5
        lookback = 30
    "#;
    let config = RunConfig::from_toml(toml).unwrap();

    let report = run_from_config(&config, &cache, None, None, d(2024, 1, 1)).unwrap();
    assert_eq!(report.screen.tested, 3);
    assert!(report.runs.len() <= 1);
    for run in &report.runs {
        assert_eq!(run.output.params.entry_threshold, 1.5);
        assert_eq!(run.output.params.lookback, 30);
    }
}
