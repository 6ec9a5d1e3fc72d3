//! Transaction records - one buy or sell of one holding
//!
//! Records are produced by the importer or the store and are only ever read
//! by the accounting code.

use crate::error::PortfolioError;
use crate::types::{Cash, HoldingId, Price, Quantity, TradeDate};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Transaction side (buy or sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    /// Canonical label, as stored and exported
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSide::Buy => "BUY",
            TradeSide::Sell => "SELL",
        }
    }
}

impl FromStr for TradeSide {
    type Err = PortfolioError;

    /// Case-insensitive; anything other than BUY or SELL is rejected
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("BUY") {
            Ok(TradeSide::Buy)
        } else if trimmed.eq_ignore_ascii_case("SELL") {
            Ok(TradeSide::Sell)
        } else {
            Err(PortfolioError::UnsupportedSide(s.to_string()))
        }
    }
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single dated buy or sell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Holding ID
    pub holding_id: HoldingId,
    /// Trade date
    pub date: TradeDate,
    /// Buy or sell
    pub side: TradeSide,
    /// Price per unit
    pub price: Price,
    /// Units traded (always positive, the side carries the direction)
    pub quantity: Quantity,
    /// Fees paid on the trade
    pub fees: Cash,
    /// Total value as reported by the source
    pub total: Cash,
    /// Realized result reported for a sell
    pub result: Option<Cash>,
    /// Realized gains reported for a sell
    pub gains: Option<Cash>,
}

impl Transaction {
    /// Create a new transaction without fees; total defaults to price * quantity
    pub fn new(
        holding_id: HoldingId,
        date: TradeDate,
        side: TradeSide,
        price: Price,
        quantity: Quantity,
    ) -> Self {
        Self {
            holding_id,
            date,
            side,
            price,
            quantity,
            fees: 0.0,
            total: price * quantity,
            result: None,
            gains: None,
        }
    }

    /// Shorthand for a buy
    pub fn buy(holding_id: HoldingId, date: TradeDate, price: Price, quantity: Quantity) -> Self {
        Self::new(holding_id, date, TradeSide::Buy, price, quantity)
    }

    /// Shorthand for a sell
    pub fn sell(holding_id: HoldingId, date: TradeDate, price: Price, quantity: Quantity) -> Self {
        Self::new(holding_id, date, TradeSide::Sell, price, quantity)
    }

    pub fn with_fees(mut self, fees: Cash) -> Self {
        self.fees = fees;
        self
    }

    pub fn with_total(mut self, total: Cash) -> Self {
        self.total = total;
        self
    }

    /// Attach the realized figures reported by the source (sells only)
    pub fn with_realized(mut self, result: Option<Cash>, gains: Option<Cash>) -> Self {
        self.result = result;
        self.gains = gains;
        self
    }

    /// Gross trade value (price * quantity)
    pub fn value(&self) -> Cash {
        self.price * self.quantity
    }

    /// Capitalized acquisition cost (value + fees)
    pub fn total_cost(&self) -> Cash {
        self.value() + self.fees
    }

    /// Quantity with the side applied: positive for buys, negative for sells
    pub fn signed_quantity(&self) -> Quantity {
        match self.side {
            TradeSide::Buy => self.quantity,
            TradeSide::Sell => -self.quantity,
        }
    }

    pub fn is_buy(&self) -> bool {
        matches!(self.side, TradeSide::Buy)
    }

    pub fn is_sell(&self) -> bool {
        matches!(self.side, TradeSide::Sell)
    }

    /// Replay order shared by every accounting routine.
    ///
    /// Date first; same-day records go buys before sells, then by holding,
    /// price, quantity and fees. Records equal under this order are
    /// interchangeable for accounting, so results never depend on the order
    /// the caller supplied.
    pub fn replay_cmp(&self, other: &Self) -> Ordering {
        self.date
            .cmp(&other.date)
            .then(self.side.cmp(&other.side))
            .then(self.holding_id.cmp(&other.holding_id))
            .then(self.price.total_cmp(&other.price))
            .then(self.quantity.total_cmp(&other.quantity))
            .then(self.fees.total_cmp(&other.fees))
    }
}

/// Borrow the records in replay order without touching the caller's slice
pub fn replay_order(transactions: &[Transaction]) -> Vec<&Transaction> {
    let mut ordered: Vec<&Transaction> = transactions.iter().collect();
    ordered.sort_by(|a, b| a.replay_cmp(b));
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(d: u32) -> TradeDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn test_side_parsing_is_case_insensitive() {
        assert_eq!("BUY".parse::<TradeSide>().unwrap(), TradeSide::Buy);
        assert_eq!("sell".parse::<TradeSide>().unwrap(), TradeSide::Sell);
        assert_eq!(" Buy ".parse::<TradeSide>().unwrap(), TradeSide::Buy);
    }

    #[test]
    fn test_side_parsing_rejects_unknown_values() {
        let err = "TRANSFER".parse::<TradeSide>().unwrap_err();
        assert!(matches!(err, PortfolioError::UnsupportedSide(ref s) if s == "TRANSFER"));
        assert!("".parse::<TradeSide>().is_err());
    }

    #[test]
    fn test_transaction_value() {
        let txn = Transaction::buy(1, day(1), 150.0, 100.0).with_fees(5.0);

        assert_eq!(txn.value(), 15000.0);
        assert_eq!(txn.total_cost(), 15005.0);
        assert_eq!(txn.total, 15000.0);
        assert!(txn.is_buy());
        assert!(!txn.is_sell());
    }

    #[test]
    fn test_signed_quantity() {
        assert_eq!(Transaction::buy(1, day(1), 10.0, 3.0).signed_quantity(), 3.0);
        assert_eq!(Transaction::sell(1, day(1), 10.0, 3.0).signed_quantity(), -3.0);
    }

    #[test]
    fn test_replay_order_puts_buys_first_on_same_day() {
        let txs = vec![
            Transaction::sell(1, day(2), 12.0, 1.0),
            Transaction::buy(1, day(2), 11.0, 1.0),
            Transaction::buy(1, day(1), 10.0, 1.0),
        ];

        let ordered = replay_order(&txs);
        assert_eq!(ordered[0].date, day(1));
        assert!(ordered[1].is_buy());
        assert!(ordered[2].is_sell());
        // caller's slice untouched
        assert!(txs[0].is_sell());
    }
}
