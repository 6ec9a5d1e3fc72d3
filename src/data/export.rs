//! CSV export of transactions and dividends
//!
//! Columns match what the importer reads, so an exported file can be
//! imported again into another database.

use crate::error::{PortfolioError, Result};
use crate::holding::{Dividend, Holding};
use crate::transaction::{TradeSide, Transaction};
use crate::types::{Cash, HoldingId, Price, Quantity, TradeDate};
use csv::Writer;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;

#[derive(Serialize)]
struct TransactionRecord<'a> {
    name: &'a str,
    category: Option<&'a str>,
    date: TradeDate,
    side: TradeSide,
    unit_price: Price,
    quantity: Quantity,
    fees: Cash,
    total: Cash,
    result: Option<Cash>,
    gains: Option<Cash>,
}

#[derive(Serialize)]
struct DividendRecord<'a> {
    name: &'a str,
    category: Option<&'a str>,
    date: TradeDate,
    amount: Cash,
}

struct Names<'a> {
    by_id: BTreeMap<HoldingId, &'a Holding>,
    placeholders: BTreeMap<HoldingId, String>,
}

impl<'a> Names<'a> {
    fn new(holdings: &'a [Holding], ids: impl Iterator<Item = HoldingId>) -> Self {
        let by_id: BTreeMap<HoldingId, &Holding> = holdings.iter().map(|h| (h.id, h)).collect();
        let placeholders = ids
            .filter(|id| !by_id.contains_key(id))
            .map(|id| (id, format!("#{}", id)))
            .collect();
        Self { by_id, placeholders }
    }

    fn name(&self, id: HoldingId) -> &str {
        match self.by_id.get(&id) {
            Some(holding) => &holding.name,
            None => self.placeholders.get(&id).map_or("", String::as_str),
        }
    }

    fn category(&self, id: HoldingId) -> Option<&str> {
        self.by_id.get(&id).and_then(|h| h.category.as_deref())
    }
}

fn csv_err(e: csv::Error) -> PortfolioError {
    PortfolioError::DataError(format!("Failed to write CSV: {}", e))
}

/// Write transactions as CSV, returning the number of rows written
pub fn write_transactions_csv<W: Write>(
    writer: W,
    holdings: &[Holding],
    transactions: &[Transaction],
) -> Result<usize> {
    let names = Names::new(holdings, transactions.iter().map(|t| t.holding_id));
    let mut wtr = Writer::from_writer(writer);

    for txn in transactions {
        wtr.serialize(TransactionRecord {
            name: names.name(txn.holding_id),
            category: names.category(txn.holding_id),
            date: txn.date,
            side: txn.side,
            unit_price: txn.price,
            quantity: txn.quantity,
            fees: txn.fees,
            total: txn.total,
            result: txn.result,
            gains: txn.gains,
        })
        .map_err(csv_err)?;
    }
    wtr.flush()?;
    Ok(transactions.len())
}

/// Write dividends as CSV, returning the number of rows written
pub fn write_dividends_csv<W: Write>(
    writer: W,
    holdings: &[Holding],
    dividends: &[Dividend],
) -> Result<usize> {
    let names = Names::new(holdings, dividends.iter().map(|d| d.holding_id));
    let mut wtr = Writer::from_writer(writer);

    for dividend in dividends {
        wtr.serialize(DividendRecord {
            name: names.name(dividend.holding_id),
            category: names.category(dividend.holding_id),
            date: dividend.date,
            amount: dividend.amount,
        })
        .map_err(csv_err)?;
    }
    wtr.flush()?;
    Ok(dividends.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::importer::{
        import_dividends, import_transactions, ImportOptions, InMemoryBook,
    };
    use chrono::NaiveDate;

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    #[test]
    fn test_exported_transactions_import_back() {
        let holdings = vec![
            Holding::new(1, "ITSA4").with_category("Ações"),
            Holding::new(2, "HGLG11"),
        ];
        let transactions = vec![
            Transaction::buy(1, day(1, 2), 10.0, 10.0).with_fees(1.0),
            Transaction::buy(2, day(1, 5), 160.5, 2.0),
            Transaction::sell(1, day(3, 1), 30.0, 5.0).with_realized(Some(83.0), Some(82.5)),
        ];

        let mut out = Vec::new();
        assert_eq!(write_transactions_csv(&mut out, &holdings, &transactions).unwrap(), 3);
        let text = String::from_utf8(out.clone()).unwrap();
        assert!(text.starts_with(
            "name,category,date,side,unit_price,quantity,fees,total,result,gains\n"
        ));
        assert!(text.contains("ITSA4,Ações,2024-01-02,BUY,10.0,10.0,1.0,100.0,,"));

        let mut book = InMemoryBook::new();
        let summary =
            import_transactions(out.as_slice(), ImportOptions::default(), &mut book).unwrap();
        assert_eq!(summary.transactions, 3);
        assert_eq!(book.transactions(), transactions.as_slice());
        assert_eq!(
            book.holding_by_name("ITSA4").and_then(|h| h.category.clone()),
            Some("Ações".to_string())
        );
    }

    #[test]
    fn test_dividends_export_with_unknown_holding() {
        let dividends = vec![
            Dividend::new(1, day(4, 1), 12.5),
            Dividend::new(9, day(4, 2), 3.0),
        ];

        let mut out = Vec::new();
        write_dividends_csv(&mut out, &[Holding::new(1, "ITSA4")], &dividends).unwrap();
        let text = String::from_utf8(out.clone()).unwrap();
        assert_eq!(
            text,
            "name,category,date,amount\nITSA4,,2024-04-01,12.5\n#9,,2024-04-02,3.0\n"
        );

        let mut book = InMemoryBook::new();
        assert_eq!(import_dividends(out.as_slice(), &mut book).unwrap().dividends, 2);
    }
}
