//! Holding metadata, dividends and price quotes

use crate::types::{Cash, HoldingId, Price, TradeDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A tracked asset and its descriptive metadata
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Holding {
    /// Unique holding identifier
    pub id: HoldingId,
    /// Display name, unique across the portfolio
    pub name: String,
    /// Asset class (e.g. equities, fixed income)
    pub category: Option<String>,
    /// Instrument type within the category
    pub kind: Option<String>,
    /// Economic sector
    pub sector: Option<String>,
    /// Market ticker, when the holding is listed
    pub ticker: Option<String>,
    /// Free-form notes
    pub notes: Option<String>,
}

impl Holding {
    /// Create a new holding with only a name
    pub fn new(id: HoldingId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            category: None,
            kind: None,
            sector: None,
            ticker: None,
            notes: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn with_sector(mut self, sector: impl Into<String>) -> Self {
        self.sector = Some(sector.into());
        self
    }

    pub fn with_ticker(mut self, ticker: impl Into<String>) -> Self {
        self.ticker = Some(ticker.into());
        self
    }

    /// Fill metadata fields that are still empty, keeping existing values
    pub fn fill_missing(
        &mut self,
        category: Option<&str>,
        kind: Option<&str>,
        sector: Option<&str>,
    ) -> bool {
        let mut changed = false;
        for (slot, value) in [
            (&mut self.category, category),
            (&mut self.kind, kind),
            (&mut self.sector, sector),
        ] {
            if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
                if slot.is_none() {
                    *slot = Some(value.trim().to_string());
                    changed = true;
                }
            }
        }
        changed
    }
}

impl fmt::Display for Holding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.category {
            Some(category) => write!(f, "Holding({}, {}, {})", self.id, self.name, category),
            None => write!(f, "Holding({}, {})", self.id, self.name),
        }
    }
}

/// Cash distribution received from a holding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dividend {
    pub holding_id: HoldingId,
    pub date: TradeDate,
    pub amount: Cash,
}

impl Dividend {
    pub fn new(holding_id: HoldingId, date: TradeDate, amount: Cash) -> Self {
        Self {
            holding_id,
            date,
            amount,
        }
    }
}

/// Sum dividends per holding
pub fn dividends_by_holding(dividends: &[Dividend]) -> BTreeMap<HoldingId, Cash> {
    let mut totals = BTreeMap::new();
    for dividend in dividends {
        *totals.entry(dividend.holding_id).or_insert(0.0) += dividend.amount;
    }
    totals
}

/// Source label used for quotes entered by hand
pub const MANUAL_SOURCE: &str = "manual";

/// Externally supplied market price for a holding on a date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub holding_id: HoldingId,
    pub date: TradeDate,
    pub price: Price,
    pub source: String,
}

impl PriceQuote {
    pub fn manual(holding_id: HoldingId, date: TradeDate, price: Price) -> Self {
        Self {
            holding_id,
            date,
            price,
            source: MANUAL_SOURCE.to_string(),
        }
    }
}

/// Most recent quote price per holding; later entries win ties on the same date
pub fn latest_quotes(quotes: &[PriceQuote]) -> BTreeMap<HoldingId, Price> {
    let mut latest: BTreeMap<HoldingId, (TradeDate, Price)> = BTreeMap::new();
    for quote in quotes {
        match latest.get(&quote.holding_id) {
            Some((date, _)) if *date > quote.date => {}
            _ => {
                latest.insert(quote.holding_id, (quote.date, quote.price));
            }
        }
    }
    latest.into_iter().map(|(id, (_, price))| (id, price)).collect()
}
