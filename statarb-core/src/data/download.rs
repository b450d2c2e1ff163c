//! Download orchestrator: fetch several symbols and persist them to the cache.

use super::cache::{CoverageResult, PriceCache};
use super::provider::{DataError, DataProvider, DownloadProgress};
use chrono::NaiveDate;
use tracing::info;

/// Download symbols into the cache, skipping those already covered unless
/// `force` is set. Failures are collected, never fatal.
pub fn download_symbols(
    provider: &dyn DataProvider,
    cache: &PriceCache,
    symbols: &[&str],
    start: NaiveDate,
    end: NaiveDate,
    force: bool,
    progress: &dyn DownloadProgress,
) -> DownloadSummary {
    let total = symbols.len();
    let mut succeeded = 0;
    let mut skipped = 0;
    let mut errors: Vec<(String, DataError)> = Vec::new();

    for (i, symbol) in symbols.iter().enumerate() {
        progress.on_start(symbol, i, total);

        if !force && cache.covers_range(symbol, start, end) == CoverageResult::FullyCovered {
            progress.on_complete(symbol, i, total, &Ok(()));
            succeeded += 1;
            skipped += 1;
            continue;
        }

        let result = download_single(provider, cache, symbol, start, end);
        progress.on_complete(symbol, i, total, &result);

        match result {
            Ok(()) => succeeded += 1,
            Err(e) => errors.push((symbol.to_string(), e)),
        }
    }

    let failed = errors.len();
    progress.on_batch_complete(succeeded, failed, total);
    info!(total, succeeded, failed, cached = skipped, "Download batch finished");

    DownloadSummary {
        total,
        succeeded,
        skipped,
        failed,
        errors,
    }
}

/// Fetch one symbol and write it to the cache.
pub fn download_single(
    provider: &dyn DataProvider,
    cache: &PriceCache,
    symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<(), DataError> {
    let fetched = provider.fetch(symbol, start, end)?;
    cache.write(symbol, &fetched.points, fetched.source)
}

/// Summary of a batch download operation.
#[derive(Debug)]
pub struct DownloadSummary {
    pub total: usize,
    pub succeeded: usize,
    /// Already covered by the cache; counted in `succeeded`.
    pub skipped: usize,
    pub failed: usize,
    pub errors: Vec<(String, DataError)>,
}

impl DownloadSummary {
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}
