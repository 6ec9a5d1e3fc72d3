//! Trade-price valuation curve
//!
//! Replays transactions date by date and marks every holding at the price of
//! its own most recent transaction. One point is emitted per distinct
//! transaction date. This is not market value: quotes are never consulted.

use crate::transaction::{replay_order, Transaction};
use crate::types::{Cash, HoldingId, Price, Quantity, TradeDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Portfolio value on a transaction date
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValuationPoint {
    pub date: TradeDate,
    pub value: Cash,
}

#[derive(Debug, Clone, Copy, Default)]
struct Mark {
    quantity: Quantity,
    last_price: Price,
}

/// Build the value-over-time curve from an unordered set of records
pub fn portfolio_timeseries(transactions: &[Transaction]) -> Vec<ValuationPoint> {
    let ordered = replay_order(transactions);
    let mut marks: BTreeMap<HoldingId, Mark> = BTreeMap::new();
    let mut points: Vec<ValuationPoint> = Vec::new();

    for day in ordered.chunk_by(|a, b| a.date == b.date) {
        for txn in day {
            let mark = marks.entry(txn.holding_id).or_default();
            mark.quantity += txn.signed_quantity();
            mark.last_price = txn.price;
        }

        let value: Cash = marks.values().map(|m| m.quantity * m.last_price).sum();
        points.push(ValuationPoint {
            date: day[0].date,
            value,
        });
    }

    log::debug!(
        "Built valuation curve with {} points from {} transactions",
        points.len(),
        transactions.len()
    );
    points
}

/// Points whose date falls in `[start, end]`
pub fn points_in_range(
    points: &[ValuationPoint],
    start: TradeDate,
    end: TradeDate,
) -> Vec<ValuationPoint> {
    points
        .iter()
        .filter(|p| p.date >= start && p.date <= end)
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(d: u32) -> TradeDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn test_last_trade_price_marks_whole_quantity() {
        let txs = vec![
            Transaction::buy(1, day(1), 10.0, 10.0),
            Transaction::buy(1, day(10), 12.0, 5.0),
        ];
        let curve = portfolio_timeseries(&txs);

        assert_eq!(curve.len(), 2);
        assert_eq!(curve[0], ValuationPoint { date: day(1), value: 100.0 });
        assert_eq!(curve.last().unwrap().value, 15.0 * 12.0);
    }

    #[test]
    fn test_empty_input_gives_empty_curve() {
        assert!(portfolio_timeseries(&[]).is_empty());
    }

    #[test]
    fn test_one_point_per_transaction_date() {
        let txs = vec![
            Transaction::buy(2, day(3), 5.0, 2.0),
            Transaction::buy(1, day(1), 10.0, 1.0),
            Transaction::buy(1, day(3), 11.0, 1.0),
        ];
        let curve = portfolio_timeseries(&txs);

        let dates: Vec<_> = curve.iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![day(1), day(3)]);
        // holding 1: 2 units at 11, holding 2: 2 units at 5
        assert_eq!(curve[1].value, 32.0);
    }

    #[test]
    fn test_untraded_holdings_keep_their_last_price() {
        let txs = vec![
            Transaction::buy(1, day(1), 10.0, 3.0),
            Transaction::buy(2, day(2), 4.0, 5.0),
            Transaction::sell(2, day(4), 6.0, 5.0),
        ];
        let curve = portfolio_timeseries(&txs);
        let values: Vec<_> = curve.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![30.0, 50.0, 30.0]);
    }

    #[test]
    fn test_same_day_sell_sets_the_mark() {
        // buys replay before sells on the same day, so the sell price is the mark
        let txs = vec![
            Transaction::sell(1, day(2), 9.0, 1.0),
            Transaction::buy(1, day(2), 11.0, 1.0),
            Transaction::buy(1, day(1), 10.0, 4.0),
        ];
        let curve = portfolio_timeseries(&txs);
        assert_eq!(curve[1].value, 4.0 * 9.0);
    }

    #[test]
    fn test_points_in_range() {
        let txs = vec![
            Transaction::buy(1, day(1), 10.0, 1.0),
            Transaction::buy(1, day(5), 10.0, 1.0),
            Transaction::buy(1, day(9), 10.0, 1.0),
        ];
        let curve = portfolio_timeseries(&txs);
        let window = points_in_range(&curve, day(2), day(9));
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].date, day(5));
    }
}
