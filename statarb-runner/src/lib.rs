//! Statarb Runner: pipeline orchestration on top of `statarb-core`.
//!
//! This crate provides:
//! - Run configuration from TOML with validation and a content-hash run ID
//! - Price loading with cache/download/synthetic fallback
//! - The screen → signal → backtest pipeline over the top pairs
//! - Terminal and Markdown reports
//! - JSON/CSV artifact export

pub mod config;
pub mod data_loader;
pub mod export;
pub mod report;
pub mod runner;

pub use config::{
    BacktestConfig, ConfigError, DataConfig, Period, RunConfig, RunId, ScreenConfig,
    StrategyConfig,
};
pub use data_loader::{
    generate_synthetic_prices, load_prices, LoadError, LoadFailure, LoadOptions, LoadedPrices,
};
pub use export::{export_json, import_json, load_artifacts, save_artifacts};
pub use report::{format_report, generate_markdown};
pub use runner::{
    load_from_config, run_from_config, run_pipeline, PairFailure, PairRun, PipelineReport,
    RunError, SCHEMA_VERSION,
};
