//! Pipeline runner: screen, then signal and backtest the top pairs.
//!
//! Two entry points:
//! - `run_pipeline()`: takes a loaded `PriceMatrix`. No I/O.
//! - `run_from_config()`: resolves symbols and dates, loads prices through
//!   the cache (`load_from_config()`), then runs the pipeline. Used by the CLI.

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use statarb_core::data::{DataProvider, DownloadProgress, PriceCache};
use statarb_core::{
    BacktestResult, CointegrationAnalyzer, PairCandidate, PriceMatrix, ScreenReport, SignalEngine,
    StrategyError, StrategyOutput,
};

use crate::config::{ConfigError, RunConfig, RunId};
use crate::data_loader::{load_prices, LoadError, LoadFailure, LoadOptions, LoadedPrices};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("strategy error: {0}")]
    Strategy(#[from] StrategyError),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Signal and backtest output for one selected pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairRun {
    /// `"{a}_vs_{b}"`
    pub label: String,
    pub candidate: PairCandidate,
    pub output: StrategyOutput,
    pub result: BacktestResult,
}

/// A selected pair whose strategy could not be run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairFailure {
    pub label: String,
    pub error: String,
}

/// Complete result of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    pub config: RunConfig,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub instruments: Vec<String>,
    /// Set when the prices came through the loader.
    pub dataset_hash: Option<String>,
    pub has_synthetic: bool,
    /// Symbols the loader skipped.
    #[serde(default)]
    pub data_failures: Vec<LoadFailure>,
    pub screen: ScreenReport,
    /// In rank order.
    pub runs: Vec<PairRun>,
    pub failures: Vec<PairFailure>,
}

impl PipelineReport {
    pub fn get(&self, label: &str) -> Option<&PairRun> {
        self.runs.iter().find(|r| r.label == label)
    }

    /// Summary block for a stored pair result.
    pub fn summary(&self, label: &str) -> Option<String> {
        self.get(label).map(|r| r.result.summary())
    }

    /// Total closed trades across all pairs.
    pub fn total_trades(&self) -> usize {
        self.runs.iter().map(|r| r.result.trades.len()).sum()
    }
}

/// Screen the matrix and backtest the top pairs. No I/O.
///
/// Pair strategies run on the rayon pool; results keep the screen's rank
/// order. A pair that fails is recorded and the others still run.
pub fn run_pipeline(prices: &PriceMatrix, config: &RunConfig) -> Result<PipelineReport, RunError> {
    config.validate()?;
    let engine = SignalEngine::new(config.strategy_params())?;
    let backtester = config.backtester();
    let analyzer = CointegrationAnalyzer::new(config.analyzer_config());

    let screen = analyzer.screen(prices);
    let selected: Vec<PairCandidate> = screen.top(config.screen.top_pairs).to_vec();
    info!(
        selected = selected.len(),
        cointegrated = screen.candidates.len(),
        "Running strategies for top pairs"
    );

    let outcomes: Vec<Result<PairRun, PairFailure>> = selected
        .par_iter()
        .map(|candidate| {
            let label = candidate.label();
            let output = engine
                .run_strategy(
                    prices,
                    &candidate.instrument_a,
                    &candidate.instrument_b,
                    candidate.hedge_ratio,
                )
                .map_err(|e| PairFailure {
                    label: label.clone(),
                    error: e.to_string(),
                })?;
            let result = backtester.backtest_pair(&output, &label);
            debug!(
                pair = %label,
                trades = result.trades.len(),
                total_return = result.metrics.total_return,
                "Pair backtest complete"
            );
            Ok(PairRun {
                label,
                candidate: candidate.clone(),
                output,
                result,
            })
        })
        .collect();

    let mut runs = Vec::with_capacity(outcomes.len());
    let mut failures = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(run) => runs.push(run),
            Err(failure) => {
                warn!(pair = %failure.label, error = %failure.error, "Pair strategy failed");
                failures.push(failure);
            }
        }
    }

    Ok(PipelineReport {
        schema_version: SCHEMA_VERSION,
        run_id: config.run_id(),
        config: config.clone(),
        start_date: prices.first_date(),
        end_date: prices.last_date(),
        instruments: prices.symbols().to_vec(),
        dataset_hash: None,
        has_synthetic: false,
        data_failures: Vec::new(),
        screen,
        runs,
        failures,
    })
}

/// Load prices as the config describes.
pub fn load_from_config(
    config: &RunConfig,
    cache: &PriceCache,
    provider: Option<&dyn DataProvider>,
    progress: Option<&dyn DownloadProgress>,
    today: NaiveDate,
) -> Result<LoadedPrices, RunError> {
    config.validate()?;
    let symbols = config.data.resolve_symbols()?;
    let (start, end) = config.data.date_range(today)?;
    let opts = LoadOptions {
        start,
        end,
        offline: config.data.offline,
        synthetic: config.data.synthetic,
        force: config.data.force,
        min_coverage: config.data.min_coverage,
    };
    info!(symbols = symbols.len(), %start, %end, "Loading prices");

    let symbol_refs: Vec<&str> = symbols.iter().map(String::as_str).collect();
    Ok(load_prices(&symbol_refs, cache, provider, progress, &opts)?)
}

/// Load prices as the config describes, then run the pipeline.
pub fn run_from_config(
    config: &RunConfig,
    cache: &PriceCache,
    provider: Option<&dyn DataProvider>,
    progress: Option<&dyn DownloadProgress>,
    today: NaiveDate,
) -> Result<PipelineReport, RunError> {
    let loaded = load_from_config(config, cache, provider, progress, today)?;

    let mut report = run_pipeline(&loaded.matrix, config)?;
    report.dataset_hash = Some(loaded.dataset_hash);
    report.has_synthetic = loaded.has_synthetic;
    report.data_failures = loaded.failures;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    /// Three instruments: A and B share a factor, C drifts alone.
    fn prices() -> PriceMatrix {
        let n = 300;
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let dates = (0..n).map(|i| start + Duration::days(i as i64)).collect();
        let factor: Vec<f64> = (0..n)
            .map(|i| 100.0 + 10.0 * (i as f64 / 25.0).sin() + i as f64 * 0.05)
            .collect();
        let a = factor
            .iter()
            .enumerate()
            .map(|(i, f)| 2.0 * f + 3.0 * (i as f64 * 1.3).sin())
            .collect();
        let b = factor.clone();
        let c = (0..n).map(|i| 50.0 + (i as f64).sqrt() * 3.0).collect();
        PriceMatrix::new(dates, vec![("A".into(), a), ("B".into(), b), ("C".into(), c)]).unwrap()
    }

    #[test]
    fn pipeline_runs_selected_pairs_in_rank_order() {
        let config = RunConfig::default();
        let report = run_pipeline(&prices(), &config).unwrap();

        assert_eq!(report.screen.tested, 3);
        assert_eq!(report.runs.len(), report.screen.top(5).len());
        for (run, cand) in report.runs.iter().zip(&report.screen.candidates) {
            assert_eq!(run.label, cand.label());
            assert_eq!(run.result.equity_curve.len(), 300);
        }
        assert!(report.failures.is_empty());
        assert_eq!(report.run_id, config.run_id());
        assert_eq!(report.instruments, vec!["A", "B", "C"]);
    }

    #[test]
    fn summary_is_looked_up_by_label() {
        let report = run_pipeline(&prices(), &RunConfig::default()).unwrap();
        if let Some(run) = report.runs.first() {
            let text = report.summary(&run.label).unwrap();
            assert!(text.contains(&run.label));
        }
        assert!(report.summary("NOPE_vs_NADA").is_none());
    }

    #[test]
    fn pairs_shorter_than_lookback_are_skipped() {
        let n = 100;
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let dates = (0..n).map(|i| start + Duration::days(i as i64)).collect();
        let b: Vec<f64> = (0..n)
            .map(|i| 100.0 + 10.0 * (i as f64 / 9.0).sin() + i as f64 * 0.2)
            .collect();
        let a = b
            .iter()
            .enumerate()
            .map(|(i, v)| 2.0 * v + 3.0 * (i as f64 * 1.3).sin())
            .collect();
        let prices = PriceMatrix::new(dates, vec![("A".into(), a), ("B".into(), b)]).unwrap();

        let mut config = RunConfig::default();
        config.strategy.lookback = 120;
        let report = run_pipeline(&prices, &config).unwrap();

        assert!(report.screen.candidates.is_empty());
        assert!(report.runs.is_empty());
        assert_eq!(report.screen.skipped.len(), 1);
        assert_eq!(
            report.screen.skipped[0].reason,
            statarb_core::SkipReason::InsufficientData {
                required: 120,
                actual: 100
            }
        );
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = RunConfig::default();
        config.strategy.lookback = 0;
        assert!(matches!(
            run_pipeline(&prices(), &config),
            Err(RunError::Config(_))
        ));
    }
}
