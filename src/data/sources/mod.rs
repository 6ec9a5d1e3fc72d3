//! External benchmark rate sources
//!
//! - SGS: Brazilian Central Bank time-series service (CDI daily rate, series 12)

pub mod sgs;

#[cfg(feature = "async")]
pub use sgs::SgsRateSource;
pub use sgs::{parse_sgs_payload, CDI_SERIES};

#[cfg(feature = "async")]
use crate::data::benchmarks::BenchmarkRate;
#[cfg(feature = "async")]
use crate::error::Result;
#[cfg(feature = "async")]
use crate::types::TradeDate;

/// Trait for remote daily-rate providers
#[cfg(feature = "async")]
pub trait RateSource: Send + Sync {
    /// Fetch daily rates (percent) for an inclusive date range, ascending
    fn fetch_rates(
        &self,
        start: TradeDate,
        end: TradeDate,
    ) -> impl std::future::Future<Output = Result<Vec<BenchmarkRate>>> + Send;

    /// Get the source name
    fn name(&self) -> &str;
}
