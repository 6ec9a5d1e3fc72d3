//! Benchmark index for performance comparisons
//!
//! Turns a daily interest-rate series (e.g. CDI, in percent per day) into a
//! cumulative index based at 100, and aligns an index onto another date
//! series for side-by-side comparison with the portfolio curve.

use crate::error::{PortfolioError, Result};
use crate::types::{parse_date, RatePercent, TradeDate, INDEX_BASE};
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Daily benchmark rate (percent)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRate {
    pub date: TradeDate,
    pub rate: RatePercent,
}

impl BenchmarkRate {
    pub fn new(date: TradeDate, rate: RatePercent) -> Self {
        Self { date, rate }
    }

    /// Growth factor for the day
    pub fn factor(&self) -> f64 {
        1.0 + self.rate / 100.0
    }
}

/// Value of a normalized index on a date
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndexPoint {
    pub date: TradeDate,
    pub value: f64,
}

/// Compound a rate series into a cumulative index based at 100.
///
/// Every entry's rate is compounded, including the first one, so the first
/// point is `100 * (1 + rate[0] / 100)`. No calendar gap-filling is done and
/// the input is expected in ascending date order.
pub fn cumulative_index(rates: &[BenchmarkRate]) -> Vec<IndexPoint> {
    rates
        .iter()
        .scan(INDEX_BASE, |level, r| {
            *level *= r.factor();
            Some(IndexPoint {
                date: r.date,
                value: *level,
            })
        })
        .collect()
}

/// Total return of an index between its first and last point
pub fn index_return(index: &[IndexPoint]) -> Option<f64> {
    match (index.first(), index.last()) {
        (Some(first), Some(last)) if first.value != 0.0 => Some(last.value / first.value - 1.0),
        _ => None,
    }
}

/// Carry index values forward onto `dates` (both ascending).
///
/// Each date gets the value of the latest index point on or before it; dates
/// preceding the first index point get `None`.
pub fn forward_fill(index: &[IndexPoint], dates: &[TradeDate]) -> Vec<Option<f64>> {
    let mut filled = Vec::with_capacity(dates.len());
    let mut cursor = 0;
    let mut current = None;

    for date in dates {
        while cursor < index.len() && index[cursor].date <= *date {
            current = Some(index[cursor].value);
            cursor += 1;
        }
        filled.push(current);
    }
    filled
}

/// Load a rate series from a CSV file with `date` and `rate` columns
pub fn load_rates_csv(path: &Path) -> Result<Vec<BenchmarkRate>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| PortfolioError::DataError(format!("Failed to open CSV: {}", e)))?;

    let headers = rdr
        .headers()
        .map_err(|e| PortfolioError::DataError(format!("Failed to read headers: {}", e)))?
        .clone();
    let date_idx = find_column(&headers, "date")?;
    let rate_idx = find_column(&headers, "rate")?;

    let mut rates = Vec::new();
    for (row, record) in rdr.records().enumerate() {
        let record = record
            .map_err(|e| PortfolioError::ImportError { row: row + 1, reason: e.to_string() })?;
        let raw_date = record.get(date_idx).unwrap_or_default();
        let date = parse_date(raw_date).ok_or_else(|| PortfolioError::ImportError {
            row: row + 1,
            reason: format!("invalid date {:?}", raw_date),
        })?;
        let rate = parse_rate(record.get(rate_idx).unwrap_or_default()).map_err(|reason| {
            PortfolioError::ImportError { row: row + 1, reason }
        })?;
        rates.push(BenchmarkRate::new(date, rate));
    }

    rates.sort_by_key(|r| r.date);
    log::info!("Loaded {} benchmark rates from {}", rates.len(), path.display());
    Ok(rates)
}

/// Parse a rate that may use a decimal comma
pub(crate) fn parse_rate(raw: &str) -> std::result::Result<RatePercent, String> {
    raw.trim()
        .replace(',', ".")
        .parse::<f64>()
        .map_err(|e| format!("invalid rate {:?}: {}", raw, e))
}

fn find_column(headers: &csv::StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case(name))
        .ok_or_else(|| PortfolioError::DataError(format!("Column '{}' not found", name)))
}
