//! Price data: providers, Parquet cache, alignment and universes.

pub mod align;
pub mod cache;
pub mod download;
pub mod provider;
pub mod universe;
pub mod yahoo;

pub use align::{align_prices, Aligned, DEFAULT_MIN_COVERAGE};
pub use cache::{CacheMeta, CacheStatus, CoverageResult, PriceCache};
pub use download::{download_single, download_symbols, DownloadSummary};
pub use provider::{
    DataError, DataProvider, DataSource, DownloadProgress, FetchResult, PricePoint,
    SilentProgress, StdoutProgress,
};
pub use universe::Universe;
pub use yahoo::YahooProvider;
