//! PriceCache: Parquet files with Hive-style symbol partitioning.
//!
//! Layout: `{cache_dir}/symbol={SYMBOL}/prices.parquet` plus a `meta.json`
//! sidecar.
//!
//! - Atomic writes (write to `.tmp`, rename into place)
//! - Schema and row-count validation on load
//! - Corrupt files are quarantined (`.quarantined`) and reported as missing

use super::provider::{DataError, DataSource, PricePoint};
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const PRICES_FILE: &str = "prices.parquet";
const META_FILE: &str = "meta.json";

/// Metadata sidecar for a cached symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheMeta {
    pub symbol: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub point_count: usize,
    pub data_hash: String,
    pub source: DataSource,
    pub cached_at: chrono::NaiveDateTime,
}

/// Cache status for a single symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStatus {
    pub symbol: String,
    pub cached: bool,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub point_count: Option<usize>,
}

/// How well the cache covers the requested date range.
#[derive(Debug, Clone, PartialEq)]
pub enum CoverageResult {
    NotCached,
    FullyCovered,
    PartiallyCovered {
        cached_start: NaiveDate,
        cached_end: NaiveDate,
    },
}

/// On-disk price cache. Construct once and pass by reference.
#[derive(Debug, Clone)]
pub struct PriceCache {
    cache_dir: PathBuf,
}

impl PriceCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    /// Root directory of the cache.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// `{cache_dir}/symbol={SYMBOL}/`
    fn symbol_dir(&self, symbol: &str) -> PathBuf {
        self.cache_dir.join(format!("symbol={symbol}"))
    }

    fn prices_path(&self, symbol: &str) -> PathBuf {
        self.symbol_dir(symbol).join(PRICES_FILE)
    }

    fn meta_path(&self, symbol: &str) -> PathBuf {
        self.symbol_dir(symbol).join(META_FILE)
    }

    /// Replace the cached series for a symbol.
    pub fn write(
        &self,
        symbol: &str,
        points: &[PricePoint],
        source: DataSource,
    ) -> Result<(), DataError> {
        let (Some(first), Some(last)) = (points.first(), points.last()) else {
            return Err(DataError::CacheError("no prices to cache".into()));
        };

        let sym_dir = self.symbol_dir(symbol);
        fs::create_dir_all(&sym_dir)
            .map_err(|e| DataError::CacheError(format!("failed to create dir: {e}")))?;

        let mut df = points_to_dataframe(points)?;
        let path = self.prices_path(symbol);
        let tmp_path = path.with_extension("parquet.tmp");
        write_parquet(&mut df, &tmp_path)?;
        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            DataError::CacheError(format!("atomic rename failed: {e}"))
        })?;

        let meta = CacheMeta {
            symbol: symbol.to_string(),
            start_date: first.date,
            end_date: last.date,
            point_count: points.len(),
            data_hash: blake3::hash(
                &serde_json::to_vec(points)
                    .map_err(|e| DataError::CacheError(format!("hash serialization: {e}")))?,
            )
            .to_hex()
            .to_string(),
            source,
            cached_at: chrono::Local::now().naive_local(),
        };
        let meta_json = serde_json::to_string_pretty(&meta)
            .map_err(|e| DataError::CacheError(format!("meta serialization: {e}")))?;
        fs::write(self.meta_path(symbol), meta_json)
            .map_err(|e| DataError::CacheError(format!("meta write: {e}")))?;

        debug!(symbol, points = points.len(), %source, "Cached prices");
        Ok(())
    }

    /// Load the cached series for a symbol, sorted by date.
    pub fn load(&self, symbol: &str) -> Result<Vec<PricePoint>, DataError> {
        let path = self.prices_path(symbol);
        if !path.exists() {
            return Err(DataError::NoCachedData {
                symbol: symbol.to_string(),
            });
        }

        match load_and_validate_parquet(&path) {
            Ok(mut points) => {
                points.sort_by_key(|p| p.date);
                Ok(points)
            }
            Err(e) => {
                let quarantine = path.with_extension("parquet.quarantined");
                warn!(
                    symbol,
                    path = %path.display(),
                    error = %e,
                    "Quarantining corrupt cache file"
                );
                let _ = fs::rename(&path, &quarantine);
                let _ = fs::remove_file(self.meta_path(symbol));
                Err(DataError::NoCachedData {
                    symbol: symbol.to_string(),
                })
            }
        }
    }

    /// Cached points with dates in `[start, end]`.
    pub fn load_range(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>, DataError> {
        let points: Vec<PricePoint> = self
            .load(symbol)?
            .into_iter()
            .filter(|p| p.date >= start && p.date <= end)
            .collect();
        if points.is_empty() {
            return Err(DataError::NoCachedData {
                symbol: symbol.to_string(),
            });
        }
        Ok(points)
    }

    /// Metadata for a cached symbol, if any.
    pub fn get_meta(&self, symbol: &str) -> Option<CacheMeta> {
        let content = fs::read_to_string(self.meta_path(symbol)).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Symbols with a metadata sidecar, sorted.
    pub fn cached_symbols(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.cache_dir) else {
            return Vec::new();
        };
        let mut symbols: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter_map(|e| {
                e.file_name()
                    .to_str()
                    .and_then(|n| n.strip_prefix("symbol="))
                    .map(String::from)
            })
            .filter(|s| self.meta_path(s).exists())
            .collect();
        symbols.sort();
        symbols
    }

    /// Cache status for each symbol.
    pub fn status(&self, symbols: &[&str]) -> Vec<CacheStatus> {
        symbols
            .iter()
            .map(|sym| {
                let meta = self.get_meta(sym);
                CacheStatus {
                    symbol: sym.to_string(),
                    cached: meta.is_some(),
                    start_date: meta.as_ref().map(|m| m.start_date),
                    end_date: meta.as_ref().map(|m| m.end_date),
                    point_count: meta.as_ref().map(|m| m.point_count),
                }
            })
            .collect()
    }

    /// Whether the cached data for a symbol covers `[start, end]`.
    pub fn covers_range(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> CoverageResult {
        match self.get_meta(symbol) {
            None => CoverageResult::NotCached,
            Some(meta) => {
                if meta.start_date <= start && meta.end_date >= end {
                    CoverageResult::FullyCovered
                } else {
                    CoverageResult::PartiallyCovered {
                        cached_start: meta.start_date,
                        cached_end: meta.end_date,
                    }
                }
            }
        }
    }
}

// ── Parquet I/O helpers ─────────────────────────────────────────────

fn epoch() -> NaiveDate {
    NaiveDate::default()
}

fn points_to_dataframe(points: &[PricePoint]) -> Result<DataFrame, DataError> {
    let dates: Vec<i32> = points
        .iter()
        .map(|p| (p.date - epoch()).num_days() as i32)
        .collect();
    let closes: Vec<f64> = points.iter().map(|p| p.close).collect();

    DataFrame::new(vec![
        Column::new("date".into(), dates)
            .cast(&DataType::Date)
            .map_err(|e| DataError::ParquetError(format!("date cast: {e}")))?,
        Column::new("close".into(), closes),
    ])
    .map_err(|e| DataError::ParquetError(format!("dataframe creation: {e}")))
}

fn write_parquet(df: &mut DataFrame, path: &Path) -> Result<(), DataError> {
    let file =
        fs::File::create(path).map_err(|e| DataError::ParquetError(format!("create file: {e}")))?;
    ParquetWriter::new(file)
        .finish(df)
        .map_err(|e| DataError::ParquetError(format!("write parquet: {e}")))?;
    Ok(())
}

fn load_and_validate_parquet(path: &Path) -> Result<Vec<PricePoint>, DataError> {
    let file = fs::File::open(path).map_err(|e| DataError::ParquetError(format!("open: {e}")))?;
    let df = ParquetReader::new(file)
        .finish()
        .map_err(|e| DataError::ParquetError(format!("read: {e}")))?;

    if df.height() == 0 {
        return Err(DataError::ValidationError("empty parquet file".into()));
    }
    for col_name in ["date", "close"] {
        if df.column(col_name).is_err() {
            return Err(DataError::ValidationError(format!(
                "missing column '{col_name}'"
            )));
        }
    }

    dataframe_to_points(&df)
}

fn dataframe_to_points(df: &DataFrame) -> Result<Vec<PricePoint>, DataError> {
    let map_err = |e: PolarsError| DataError::ParquetError(format!("column read: {e}"));

    let date_ca = df
        .column("date")
        .map_err(map_err)?
        .date()
        .map_err(|e| DataError::ParquetError(format!("date column type: {e}")))?;
    let close_ca = df
        .column("close")
        .map_err(map_err)?
        .f64()
        .map_err(|e| DataError::ParquetError(format!("close column type: {e}")))?;

    let mut points = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let days = date_ca
            .get(i)
            .ok_or_else(|| DataError::ParquetError(format!("null date at row {i}")))?;
        let close = close_ca
            .get(i)
            .ok_or_else(|| DataError::ValidationError(format!("null close at row {i}")))?;
        points.push(PricePoint {
            date: epoch() + chrono::Duration::days(days as i64),
            close,
        });
    }
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn sample_points() -> Vec<PricePoint> {
        vec![
            PricePoint {
                date: d(2),
                close: 101.0,
            },
            PricePoint {
                date: d(3),
                close: 102.5,
            },
            PricePoint {
                date: d(4),
                close: 99.75,
            },
        ]
    }

    #[test]
    fn write_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PriceCache::new(dir.path());

        cache
            .write("INFY.NS", &sample_points(), DataSource::YahooFinance)
            .unwrap();
        let loaded = cache.load("INFY.NS").unwrap();

        assert_eq!(loaded, sample_points());
        assert!(dir.path().join("symbol=INFY.NS/prices.parquet").exists());
    }

    #[test]
    fn load_nonexistent_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PriceCache::new(dir.path());
        assert!(matches!(
            cache.load("NONEXISTENT"),
            Err(DataError::NoCachedData { .. })
        ));
    }

    #[test]
    fn load_range_filters_dates() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PriceCache::new(dir.path());
        cache
            .write("TCS.NS", &sample_points(), DataSource::YahooFinance)
            .unwrap();

        let pts = cache.load_range("TCS.NS", d(3), d(10)).unwrap();
        assert_eq!(pts.len(), 2);
        assert!(cache.load_range("TCS.NS", d(20), d(25)).is_err());
    }

    #[test]
    fn corrupt_file_is_quarantined() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PriceCache::new(dir.path());
        cache
            .write("SBIN.NS", &sample_points(), DataSource::YahooFinance)
            .unwrap();

        let path = dir.path().join("symbol=SBIN.NS/prices.parquet");
        fs::write(&path, b"not a parquet file").unwrap();

        assert!(cache.load("SBIN.NS").is_err());
        assert!(!path.exists());
        assert!(path.with_extension("parquet.quarantined").exists());
        assert!(cache.get_meta("SBIN.NS").is_none());
    }

    #[test]
    fn meta_status_and_coverage() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PriceCache::new(dir.path());
        cache
            .write("ITC.NS", &sample_points(), DataSource::Synthetic)
            .unwrap();

        let meta = cache.get_meta("ITC.NS").unwrap();
        assert_eq!(meta.point_count, 3);
        assert_eq!(meta.start_date, d(2));
        assert_eq!(meta.source, DataSource::Synthetic);

        let statuses = cache.status(&["ITC.NS", "WIPRO.NS"]);
        assert!(statuses[0].cached);
        assert!(!statuses[1].cached);
        assert_eq!(cache.cached_symbols(), vec!["ITC.NS".to_string()]);

        assert_eq!(
            cache.covers_range("ITC.NS", d(2), d(4)),
            CoverageResult::FullyCovered
        );
        assert_eq!(
            cache.covers_range("ITC.NS", d(1), d(4)),
            CoverageResult::PartiallyCovered {
                cached_start: d(2),
                cached_end: d(4)
            }
        );
        assert_eq!(
            cache.covers_range("WIPRO.NS", d(1), d(4)),
            CoverageResult::NotCached
        );
    }

    #[test]
    fn empty_write_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PriceCache::new(dir.path());
        assert!(cache.write("X", &[], DataSource::Cache).is_err());
    }
}
