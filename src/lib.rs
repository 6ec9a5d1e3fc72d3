//! # Rusty Portfolio
//!
//! Personal investment portfolio tracking: weighted-average cost positions,
//! a trade-price valuation curve and comparison against a compounded
//! benchmark rate such as the CDI.
//!
//! All computations are pure functions over the full record set. Results do
//! not depend on the order records are supplied in.
//!
//! ## Example
//!
//! ```rust
//! use rusty_portfolio::prelude::*;
//! use chrono::NaiveDate;
//!
//! let day = |d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap();
//! let transactions = vec![
//!     Transaction::buy(1, day(2), 10.0, 10.0),
//!     Transaction::sell(1, day(3), 12.0, 4.0),
//! ];
//!
//! let positions = compute_positions(&transactions);
//! assert_eq!(positions[&1].quantity, 6.0);
//!
//! let curve = portfolio_timeseries(&transactions);
//! assert_eq!(curve.last().map(|p| p.value), Some(72.0));
//! ```

pub mod data;
pub mod error;
pub mod finance;
pub mod holding;
pub mod performance;
#[cfg(feature = "sqlite")]
pub mod store;
pub mod transaction;
pub mod types;

pub mod prelude {
    //! Commonly used types and functions
    pub use crate::data::benchmarks::{cumulative_index, BenchmarkRate, IndexPoint};
    pub use crate::error::{PortfolioError, Result};
    pub use crate::finance::{
        compute_positions, portfolio_timeseries, Ledger, PortfolioOverview, PositionSnapshot,
        ValuationPoint,
    };
    pub use crate::holding::{Dividend, Holding, PriceQuote};
    pub use crate::performance::PerformanceComparison;
    #[cfg(feature = "sqlite")]
    pub use crate::store::PortfolioStore;
    pub use crate::transaction::{TradeSide, Transaction};
    pub use crate::types::*;
}
