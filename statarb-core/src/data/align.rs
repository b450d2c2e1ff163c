//! Multi-symbol time alignment.
//!
//! Given closes for several symbols, build a `PriceMatrix` on a common
//! timeline. Dates that too few symbols trade on are dropped; remaining
//! gaps are forward-filled, and leading gaps back-filled.

use super::provider::{DataError, PricePoint};
use crate::domain::PriceMatrix;
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, warn};

/// Default fraction of symbols that must trade on a date for it to be kept.
pub const DEFAULT_MIN_COVERAGE: f64 = 0.8;

/// Aligned prices plus what alignment threw away.
#[derive(Debug, Clone)]
pub struct Aligned {
    pub matrix: PriceMatrix,
    /// Dates dropped for insufficient coverage.
    pub dropped_dates: Vec<NaiveDate>,
    /// Symbols with no usable data.
    pub excluded: Vec<String>,
}

/// Align price series to a common date index.
///
/// Symbol order in the matrix follows input order.
pub fn align_prices(
    series: Vec<(String, Vec<PricePoint>)>,
    min_coverage: f64,
) -> Result<Aligned, DataError> {
    let mut excluded = Vec::new();
    let mut usable: Vec<(String, HashMap<NaiveDate, f64>)> = Vec::with_capacity(series.len());
    for (symbol, points) in series {
        let by_date: HashMap<NaiveDate, f64> = points
            .into_iter()
            .filter(|p| p.close.is_finite() && p.close > 0.0)
            .map(|p| (p.date, p.close))
            .collect();
        if by_date.is_empty() {
            warn!(symbol = %symbol, "No usable prices; excluding from alignment");
            excluded.push(symbol);
        } else {
            usable.push((symbol, by_date));
        }
    }
    if usable.is_empty() {
        return Err(DataError::NoData);
    }

    let all_dates: BTreeSet<NaiveDate> = usable
        .iter()
        .flat_map(|(_, by_date)| by_date.keys().copied())
        .collect();

    let k = usable.len() as f64;
    let required = min_coverage.clamp(0.0, 1.0) * k;
    let (dates, dropped_dates): (Vec<NaiveDate>, Vec<NaiveDate>) =
        all_dates.into_iter().partition(|date| {
            let count = usable.iter().filter(|(_, m)| m.contains_key(date)).count();
            count as f64 >= required
        });
    if dates.is_empty() {
        return Err(DataError::ValidationError(
            "no date meets the coverage threshold".into(),
        ));
    }

    let mut columns = Vec::with_capacity(usable.len());
    for (symbol, by_date) in usable {
        let raw: Vec<Option<f64>> = dates.iter().map(|d| by_date.get(d).copied()).collect();
        match fill_gaps(&raw) {
            Some(filled) => columns.push((symbol, filled)),
            None => {
                // Every observation fell on dropped dates.
                warn!(symbol = %symbol, "No prices on retained dates; excluding");
                excluded.push(symbol);
            }
        }
    }
    if columns.is_empty() {
        return Err(DataError::NoData);
    }

    debug!(
        dates = dates.len(),
        dropped = dropped_dates.len(),
        instruments = columns.len(),
        "Aligned price series"
    );

    let matrix = PriceMatrix::new(dates, columns)?;
    Ok(Aligned {
        matrix,
        dropped_dates,
        excluded,
    })
}

/// Forward-fill, then back-fill the leading gap. None if all values are missing.
fn fill_gaps(values: &[Option<f64>]) -> Option<Vec<f64>> {
    let first = values.iter().flatten().next().copied()?;
    let mut last = first;
    Some(
        values
            .iter()
            .map(|v| {
                if let Some(x) = v {
                    last = *x;
                }
                last
            })
            .collect(),
    )
}
