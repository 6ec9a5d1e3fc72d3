//! Portfolio performance against a benchmark index

use crate::data::benchmarks::{forward_fill, IndexPoint};
use crate::error::{PortfolioError, Result};
use crate::finance::valuation::{points_in_range, ValuationPoint};
use crate::types::{TradeDate, INDEX_BASE};
use serde::{Deserialize, Serialize};

/// Portfolio and benchmark levels on one date, both based at 100
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComparisonPoint {
    pub date: TradeDate,
    pub portfolio: f64,
    /// `None` before the benchmark's first observation
    pub benchmark: Option<f64>,
}

/// Side-by-side comparison over a date window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceComparison {
    pub start: TradeDate,
    pub end: TradeDate,
    pub points: Vec<ComparisonPoint>,
}

impl PerformanceComparison {
    /// Align a valuation curve with a benchmark index over `[start, end]`.
    ///
    /// The curve is normalized to 100 at its first point in the window and the
    /// benchmark is carried forward onto the curve's dates.
    pub fn build(
        points: &[ValuationPoint],
        benchmark: &[IndexPoint],
        start: TradeDate,
        end: TradeDate,
    ) -> Result<Self> {
        let window = points_in_range(points, start, end);
        let first = window.first().ok_or_else(|| {
            PortfolioError::DataError(format!("No valuation points between {} and {}", start, end))
        })?;
        if first.value == 0.0 {
            return Err(PortfolioError::ZeroBaseValue { date: first.date });
        }

        let base = first.value;
        let dates: Vec<TradeDate> = window.iter().map(|p| p.date).collect();
        let filled = forward_fill(benchmark, &dates);

        let points = window
            .iter()
            .zip(filled)
            .map(|(p, benchmark)| ComparisonPoint {
                date: p.date,
                portfolio: p.value / base * INDEX_BASE,
                benchmark,
            })
            .collect::<Vec<_>>();

        log::debug!("Compared {} points between {} and {}", points.len(), start, end);
        Ok(Self { start, end, points })
    }

    /// Portfolio return over the window
    pub fn portfolio_return(&self) -> f64 {
        self.points
            .last()
            .map(|p| p.portfolio / INDEX_BASE - 1.0)
            .unwrap_or(0.0)
    }

    /// Benchmark return from its first available level to the last one
    pub fn benchmark_return(&self) -> Option<f64> {
        let mut levels = self.points.iter().filter_map(|p| p.benchmark);
        let first = levels.next()?;
        let last = levels.last().unwrap_or(first);
        if first == 0.0 {
            None
        } else {
            Some(last / first - 1.0)
        }
    }

    /// Portfolio return minus benchmark return
    pub fn excess_return(&self) -> Option<f64> {
        self.benchmark_return().map(|b| self.portfolio_return() - b)
    }

    /// Annualized portfolio return, 0 for windows shorter than a day
    pub fn annualized_return(&self) -> f64 {
        let (first, last) = match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return 0.0,
        };

        let days = (last.date - first.date).num_days() as f64;
        if days == 0.0 {
            return 0.0;
        }

        let growth = 1.0 + self.portfolio_return();
        if growth <= 0.0 {
            return -1.0;
        }
        growth.powf(365.25 / days) - 1.0
    }

    /// Largest peak-to-trough decline of the portfolio curve
    pub fn max_drawdown(&self) -> f64 {
        let mut peak = match self.points.first() {
            Some(p) => p.portfolio,
            None => return 0.0,
        };
        let mut max_dd: f64 = 0.0;

        for point in &self.points {
            if point.portfolio > peak {
                peak = point.portfolio;
            }
            if peak > 0.0 {
                max_dd = max_dd.max((peak - point.portfolio) / peak);
            }
        }
        max_dd
    }

    /// Get summary statistics
    pub fn summary(&self) -> ComparisonSummary {
        ComparisonSummary {
            start: self.start,
            end: self.end,
            portfolio_return: self.portfolio_return(),
            benchmark_return: self.benchmark_return(),
            annualized_return: self.annualized_return(),
            max_drawdown: self.max_drawdown(),
            num_points: self.points.len(),
        }
    }
}

/// Comparison summary statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonSummary {
    pub start: TradeDate,
    pub end: TradeDate,
    pub portfolio_return: f64,
    pub benchmark_return: Option<f64>,
    pub annualized_return: f64,
    pub max_drawdown: f64,
    pub num_points: usize,
}

impl std::fmt::Display for ComparisonSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Performance {} to {}:", self.start, self.end)?;
        writeln!(f, "  Portfolio Return:   {:.2}%", self.portfolio_return * 100.0)?;
        match self.benchmark_return {
            Some(r) => writeln!(f, "  Benchmark Return:   {:.2}%", r * 100.0)?,
            None => writeln!(f, "  Benchmark Return:   n/a")?,
        }
        writeln!(
            f,
            "  Annualized Return:  {:.2}%",
            self.annualized_return * 100.0
        )?;
        writeln!(f, "  Max Drawdown:       {:.2}%", self.max_drawdown * 100.0)?;
        writeln!(f, "  Points:             {}", self.num_points)?;
        Ok(())
    }
}
