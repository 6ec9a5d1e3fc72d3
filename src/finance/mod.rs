//! Finance module - positions, valuation curve, overview

pub mod ledger;
pub mod summary;
pub mod valuation;

pub use ledger::{compute_positions, Ledger, PositionSnapshot};
pub use summary::{AllocationKey, AllocationSlice, HoldingRow, PortfolioOverview};
pub use valuation::{points_in_range, portfolio_timeseries, ValuationPoint};
