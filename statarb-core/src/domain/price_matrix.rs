//! Aligned closing prices for a set of instruments.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Contract violations rejected when a matrix is built.
///
/// Everything downstream of a `PriceMatrix` assumes these checks passed, so
/// the analytics never see NaNs, gaps, or misaligned columns.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PriceMatrixError {
    #[error("price matrix has no instruments")]
    NoInstruments,

    #[error("price matrix has no dates")]
    NoDates,

    #[error("duplicate instrument '{0}'")]
    DuplicateInstrument(String),

    #[error("dates are not strictly increasing at index {index} ({date})")]
    UnorderedDates { index: usize, date: NaiveDate },

    #[error("instrument '{symbol}' has {actual} prices, expected {expected}")]
    LengthMismatch {
        symbol: String,
        expected: usize,
        actual: usize,
    },

    #[error("instrument '{symbol}' has invalid price {price} on {date}")]
    InvalidPrice {
        symbol: String,
        date: NaiveDate,
        price: f64,
    },
}

/// Closing prices for several instruments on one shared, gap-free date index.
///
/// Columns keep the order they were supplied in; pair enumeration and ranking
/// tie-breaks depend on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceMatrix {
    dates: Vec<NaiveDate>,
    symbols: Vec<String>,
    columns: Vec<Vec<f64>>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl PriceMatrix {
    /// Build a matrix from a date index and one price column per instrument.
    pub fn new(
        dates: Vec<NaiveDate>,
        columns: Vec<(String, Vec<f64>)>,
    ) -> Result<Self, PriceMatrixError> {
        if columns.is_empty() {
            return Err(PriceMatrixError::NoInstruments);
        }
        if dates.is_empty() {
            return Err(PriceMatrixError::NoDates);
        }
        for (i, pair) in dates.windows(2).enumerate() {
            if pair[1] <= pair[0] {
                return Err(PriceMatrixError::UnorderedDates {
                    index: i + 1,
                    date: pair[1],
                });
            }
        }

        let mut index = HashMap::with_capacity(columns.len());
        let mut symbols = Vec::with_capacity(columns.len());
        let mut values = Vec::with_capacity(columns.len());

        for (symbol, prices) in columns {
            if prices.len() != dates.len() {
                return Err(PriceMatrixError::LengthMismatch {
                    symbol,
                    expected: dates.len(),
                    actual: prices.len(),
                });
            }
            if let Some((i, &price)) = prices
                .iter()
                .enumerate()
                .find(|(_, p)| !p.is_finite() || **p <= 0.0)
            {
                return Err(PriceMatrixError::InvalidPrice {
                    symbol,
                    date: dates[i],
                    price,
                });
            }
            if index.insert(symbol.clone(), symbols.len()).is_some() {
                return Err(PriceMatrixError::DuplicateInstrument(symbol));
            }
            symbols.push(symbol);
            values.push(prices);
        }

        Ok(Self {
            dates,
            symbols,
            columns: values,
            index,
        })
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    /// Number of dates (rows).
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn instrument_count(&self) -> usize {
        self.symbols.len()
    }

    /// Price column for an instrument.
    pub fn prices(&self, symbol: &str) -> Option<&[f64]> {
        self.position(symbol).map(|i| self.columns[i].as_slice())
    }

    /// Price column by column index.
    pub fn column(&self, index: usize) -> &[f64] {
        &self.columns[index]
    }

    /// Column index of an instrument.
    pub fn position(&self, symbol: &str) -> Option<usize> {
        if self.index.is_empty() {
            // Deserialized matrices skip the lookup table.
            return self.symbols.iter().position(|s| s == symbol);
        }
        self.index.get(symbol).copied()
    }

    pub fn first_date(&self) -> NaiveDate {
        self.dates[0]
    }

    pub fn last_date(&self) -> NaiveDate {
        self.dates[self.dates.len() - 1]
    }

    /// Restrict the matrix to dates in `[start, end]`.
    pub fn slice_dates(&self, start: NaiveDate, end: NaiveDate) -> Result<Self, PriceMatrixError> {
        let lo = self.dates.partition_point(|d| *d < start);
        let hi = self.dates.partition_point(|d| *d <= end);
        let dates = self.dates[lo..hi.max(lo)].to_vec();
        let columns = self
            .symbols
            .iter()
            .zip(&self.columns)
            .map(|(s, c)| (s.clone(), c[lo..hi.max(lo)].to_vec()))
            .collect();
        Self::new(dates, columns)
    }
}
