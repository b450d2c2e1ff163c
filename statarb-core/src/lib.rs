//! statarb core: pair screening, spread signals and pair backtesting.
//!
//! - Domain types (price matrix, pair candidates, positions, trades)
//! - Statistics primitives (OLS, ADF, MacKinnon p-values, rolling moments)
//! - Cointegration analyzer with parallel pair search
//! - Z-score signal engine with an explicit position state machine
//! - Backtester producing equity curves, trades and summary metrics
//! - Data layer: Yahoo provider, Parquet cache, alignment, universes

pub mod backtest;
pub mod cointegration;
pub mod data;
pub mod domain;
pub mod signal;
pub mod stats;

pub use backtest::{BacktestResult, Backtester, EquityPoint, OpenPosition, SummaryMetrics};
pub use cointegration::{
    AnalyzerConfig, CointegrationAnalyzer, ScreenReport, SkipReason, SkippedPair,
    COLLINEAR_STATISTIC,
};
pub use domain::{
    Direction, ExitReason, PairCandidate, PositionState, PriceMatrix, PriceMatrixError, Trade,
};
pub use signal::{SignalEngine, SpreadPoint, StrategyError, StrategyOutput, StrategyParams};
