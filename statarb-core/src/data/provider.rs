//! Data provider trait and structured error types.
//!
//! `DataProvider` abstracts over price sources so the cache and loader can
//! run against Yahoo Finance in production and a mock in tests.

use crate::domain::PriceMatrixError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One daily closing price (split/dividend adjusted when the source has it).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Errors from fetching, caching and aligning price data.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("cache error: {0}")]
    CacheError(String),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("parquet I/O error: {0}")]
    ParquetError(String),

    #[error("no cached data for symbol '{symbol}' (run `statarb download {symbol}` first)")]
    NoCachedData { symbol: String },

    #[error("invalid universe: {0}")]
    InvalidUniverse(String),

    #[error("no price data for any symbol")]
    NoData,

    #[error(transparent)]
    Matrix(#[from] PriceMatrixError),

    #[error("data error: {0}")]
    Other(String),
}

/// Result of a successful fetch for a single symbol.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub symbol: String,
    pub points: Vec<PricePoint>,
    pub source: DataSource,
}

/// Where a series came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    YahooFinance,
    Cache,
    Synthetic,
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataSource::YahooFinance => write!(f, "yahoo_finance"),
            DataSource::Cache => write!(f, "cache"),
            DataSource::Synthetic => write!(f, "synthetic"),
        }
    }
}

/// A source of daily closing prices.
///
/// The cache sits above this trait; providers don't know about it.
pub trait DataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch daily closes for a symbol over `[start, end]`.
    fn fetch(&self, symbol: &str, start: NaiveDate, end: NaiveDate)
        -> Result<FetchResult, DataError>;

    /// Whether the provider should be tried at all (e.g. not offline).
    fn is_available(&self) -> bool;
}

/// Progress callback for multi-symbol operations.
pub trait DownloadProgress: Send {
    /// Called when starting to fetch a symbol.
    fn on_start(&self, symbol: &str, index: usize, total: usize);

    /// Called when a symbol fetch completes.
    fn on_complete(&self, symbol: &str, index: usize, total: usize, result: &Result<(), DataError>);

    /// Called when the entire batch is done.
    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize);
}

/// Progress reporter that prints to stdout.
pub struct StdoutProgress;

impl DownloadProgress for StdoutProgress {
    fn on_start(&self, symbol: &str, index: usize, total: usize) {
        println!("[{}/{}] Fetching {symbol}...", index + 1, total);
    }

    fn on_complete(
        &self,
        symbol: &str,
        _index: usize,
        _total: usize,
        result: &Result<(), DataError>,
    ) {
        match result {
            Ok(()) => println!("  OK: {symbol}"),
            Err(e) => println!("  FAIL: {symbol}: {e}"),
        }
    }

    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize) {
        println!("\nDownload complete: {succeeded}/{total} succeeded, {failed} failed");
    }
}

/// Progress reporter that discards everything.
pub struct SilentProgress;

impl DownloadProgress for SilentProgress {
    fn on_start(&self, _symbol: &str, _index: usize, _total: usize) {}

    fn on_complete(
        &self,
        _symbol: &str,
        _index: usize,
        _total: usize,
        _result: &Result<(), DataError>,
    ) {
    }

    fn on_batch_complete(&self, _succeeded: usize, _failed: usize, _total: usize) {}
}
