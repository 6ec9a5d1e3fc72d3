//! Core types and constants

use chrono::NaiveDate;

/// Trade and valuation dates carry no time component
pub type TradeDate = NaiveDate;

/// Opaque identifier of a tracked holding
pub type HoldingId = u64;

/// Price type (using f64 for precision)
pub type Price = f64;

/// Quantity type (signed: oversold holdings go negative)
pub type Quantity = f64;

/// Money/cash type
pub type Cash = f64;

/// Daily rate expressed in percent (0.05 means 0.05%)
pub type RatePercent = f64;

/// Base value of every normalized index
pub const INDEX_BASE: f64 = 100.0;

/// Date formats accepted at the import boundary, tried in order
pub const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"];

/// Parse a calendar date in any of the accepted formats
pub fn parse_date(raw: &str) -> Option<TradeDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}
