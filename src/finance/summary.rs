//! Portfolio overview and allocation breakdown
//!
//! Combines positions, dividends and quotes into the figures shown on the
//! overview screen. Holdings without a quote are marked at their most recent
//! trade price, and holdings never traded at zero.

use crate::finance::ledger::compute_positions;
use crate::holding::{dividends_by_holding, Dividend, Holding};
use crate::transaction::{replay_order, TradeSide, Transaction};
use crate::types::{Cash, HoldingId, Price, Quantity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Label for holdings missing the grouping attribute
pub const UNCATEGORIZED: &str = "Uncategorized";

/// One line of the holdings table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldingRow {
    pub holding_id: HoldingId,
    pub name: String,
    pub category: Option<String>,
    pub kind: Option<String>,
    pub sector: Option<String>,
    pub quantity: Quantity,
    pub average_cost: Price,
    pub net_invested: Cash,
    /// Price used to value the position
    pub mark: Price,
    pub market_value: Cash,
    pub dividends: Cash,
    /// Share of the portfolio's current value
    pub weight: f64,
}

/// Attribute used to group holdings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationKey {
    Category,
    Kind,
    Sector,
}

impl AllocationKey {
    fn label<'a>(&self, row: &'a HoldingRow) -> &'a str {
        let value = match self {
            AllocationKey::Category => &row.category,
            AllocationKey::Kind => &row.kind,
            AllocationKey::Sector => &row.sector,
        };
        value.as_deref().unwrap_or(UNCATEGORIZED)
    }
}

/// Value held in one group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationSlice {
    pub label: String,
    pub value: Cash,
    pub weight: f64,
}

/// Headline figures plus the holdings table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioOverview {
    /// Buy totals minus sell totals
    pub invested: Cash,
    pub dividends: Cash,
    /// Sum of the gains reported on sells
    pub realized_gains: Cash,
    pub fees_paid: Cash,
    pub current_value: Cash,
    /// (current value + dividends + realized gains - invested) / invested
    pub total_return: f64,
    /// Holdings with a non-zero quantity, largest market value first
    pub holdings: Vec<HoldingRow>,
}

impl PortfolioOverview {
    /// Build the overview. `quotes` holds the latest quoted price per holding.
    pub fn build(
        holdings: &[Holding],
        transactions: &[Transaction],
        dividends: &[Dividend],
        quotes: &BTreeMap<HoldingId, Price>,
    ) -> Self {
        let mut invested = 0.0;
        let mut realized_gains = 0.0;
        let mut fees_paid = 0.0;
        let mut last_trade: BTreeMap<HoldingId, Price> = BTreeMap::new();

        for txn in replay_order(transactions) {
            match txn.side {
                TradeSide::Buy => invested += txn.total,
                TradeSide::Sell => {
                    invested -= txn.total;
                    realized_gains += txn.gains.unwrap_or(0.0);
                }
            }
            fees_paid += txn.fees;
            last_trade.insert(txn.holding_id, txn.price);
        }

        let dividend_totals = dividends_by_holding(dividends);
        let metadata: BTreeMap<HoldingId, &Holding> = holdings.iter().map(|h| (h.id, h)).collect();

        let mut rows: Vec<HoldingRow> = compute_positions(transactions)
            .into_values()
            .filter(|p| p.quantity != 0.0)
            .map(|position| {
                let id = position.holding_id;
                let mark = quotes
                    .get(&id)
                    .or_else(|| last_trade.get(&id))
                    .copied()
                    .unwrap_or(0.0);
                let holding = metadata.get(&id);
                HoldingRow {
                    holding_id: id,
                    name: holding.map_or_else(|| format!("#{}", id), |h| h.name.clone()),
                    category: holding.and_then(|h| h.category.clone()),
                    kind: holding.and_then(|h| h.kind.clone()),
                    sector: holding.and_then(|h| h.sector.clone()),
                    quantity: position.quantity,
                    average_cost: position.average_cost,
                    net_invested: position.net_invested,
                    mark,
                    market_value: position.market_value(mark),
                    dividends: dividend_totals.get(&id).copied().unwrap_or(0.0),
                    weight: 0.0,
                }
            })
            .collect();

        let current_value: Cash = rows.iter().map(|r| r.market_value).sum();
        for row in &mut rows {
            row.weight = share(row.market_value, current_value);
        }
        rows.sort_by(|a, b| {
            b.market_value
                .total_cmp(&a.market_value)
                .then_with(|| a.name.cmp(&b.name))
        });

        let dividends: Cash = dividend_totals.values().sum();
        let total_return = if invested == 0.0 {
            0.0
        } else {
            (current_value + dividends + realized_gains - invested) / invested
        };

        log::debug!(
            "Overview: {} open holdings, value {:.2}, invested {:.2}",
            rows.len(),
            current_value,
            invested
        );

        Self {
            invested,
            dividends,
            realized_gains,
            fees_paid,
            current_value,
            total_return,
            holdings: rows,
        }
    }

    /// Group market value by a holding attribute, largest group first
    pub fn allocation(&self, key: AllocationKey) -> Vec<AllocationSlice> {
        let mut groups: BTreeMap<&str, Cash> = BTreeMap::new();
        for row in &self.holdings {
            *groups.entry(key.label(row)).or_insert(0.0) += row.market_value;
        }

        let mut slices: Vec<AllocationSlice> = groups
            .into_iter()
            .map(|(label, value)| AllocationSlice {
                label: label.to_string(),
                value,
                weight: share(value, self.current_value),
            })
            .collect();
        slices.sort_by(|a, b| b.value.total_cmp(&a.value).then_with(|| a.label.cmp(&b.label)));
        slices
    }

    /// The `n` largest holdings by market value
    pub fn top_holdings(&self, n: usize) -> &[HoldingRow] {
        &self.holdings[..n.min(self.holdings.len())]
    }

    /// Number of holdings with a non-zero quantity
    pub fn open_holdings(&self) -> usize {
        self.holdings.len()
    }
}

fn share(part: Cash, whole: Cash) -> f64 {
    if whole == 0.0 {
        0.0
    } else {
        part / whole
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    fn fixture() -> (Vec<Holding>, Vec<Transaction>, Vec<Dividend>) {
        let holdings = vec![
            Holding::new(1, "ITSA4").with_category("Ações").with_sector("Financeiro"),
            Holding::new(2, "HGLG11").with_category("FII"),
            Holding::new(3, "Closed"),
        ];
        let transactions = vec![
            Transaction::buy(1, day(1, 2), 10.0, 10.0).with_fees(1.0),
            Transaction::buy(1, day(2, 1), 20.0, 5.0),
            Transaction::sell(1, day(3, 1), 30.0, 5.0).with_realized(Some(83.0), Some(50.0)),
            Transaction::buy(2, day(1, 10), 25.0, 4.0),
            Transaction::buy(3, day(1, 3), 5.0, 2.0),
            Transaction::sell(3, day(1, 4), 6.0, 2.0).with_realized(Some(2.0), Some(2.0)),
        ];
        let dividends = vec![Dividend::new(1, day(4, 1), 12.0)];
        (holdings, transactions, dividends)
    }

    #[test]
    fn test_overview_totals() {
        let (holdings, transactions, dividends) = fixture();
        let quotes = BTreeMap::from([(1, 40.0)]);
        let overview = PortfolioOverview::build(&holdings, &transactions, &dividends, &quotes);

        assert_relative_eq!(overview.invested, 148.0);
        assert_relative_eq!(overview.dividends, 12.0);
        assert_relative_eq!(overview.realized_gains, 52.0);
        assert_relative_eq!(overview.fees_paid, 1.0);
        // 10 ITSA4 at the 40.0 quote plus 4 HGLG11 at their 25.0 trade price
        assert_relative_eq!(overview.current_value, 500.0);
        assert_relative_eq!(overview.total_return, (500.0 + 12.0 + 52.0 - 148.0) / 148.0);
    }

    #[test]
    fn test_holdings_table_excludes_closed_positions() {
        let (holdings, transactions, dividends) = fixture();
        let quotes = BTreeMap::from([(1, 40.0)]);
        let overview = PortfolioOverview::build(&holdings, &transactions, &dividends, &quotes);

        assert_eq!(overview.open_holdings(), 2);
        let top = &overview.holdings[0];
        assert_eq!(top.name, "ITSA4");
        assert_relative_eq!(top.average_cost, 13.4, epsilon = 1e-9);
        assert_relative_eq!(top.net_invested, 134.0, epsilon = 1e-9);
        assert_eq!(top.mark, 40.0);
        assert_relative_eq!(top.weight, 0.8);
        assert_eq!(top.dividends, 12.0);

        let second = &overview.holdings[1];
        assert_eq!(second.mark, 25.0);
        assert_relative_eq!(second.weight, 0.2);
    }

    #[test]
    fn test_allocation_by_category_and_sector() {
        let (holdings, transactions, dividends) = fixture();
        let overview =
            PortfolioOverview::build(&holdings, &transactions, &dividends, &BTreeMap::new());

        // ITSA4 marked at its last trade (30.0): 300, HGLG11: 100
        let by_category = overview.allocation(AllocationKey::Category);
        assert_eq!(by_category.len(), 2);
        assert_eq!(by_category[0].label, "Ações");
        assert_relative_eq!(by_category[0].weight, 0.75);

        let by_sector = overview.allocation(AllocationKey::Sector);
        assert_eq!(by_sector[1].label, UNCATEGORIZED);
        assert_relative_eq!(by_sector[1].value, 100.0);
    }

    #[test]
    fn test_top_holdings_clamps() {
        let (holdings, transactions, dividends) = fixture();
        let overview =
            PortfolioOverview::build(&holdings, &transactions, &dividends, &BTreeMap::new());
        assert_eq!(overview.top_holdings(1).len(), 1);
        assert_eq!(overview.top_holdings(10).len(), 2);
    }

    #[test]
    fn test_empty_portfolio() {
        let overview = PortfolioOverview::build(&[], &[], &[], &BTreeMap::new());
        assert_eq!(overview.invested, 0.0);
        assert_eq!(overview.total_return, 0.0);
        assert!(overview.holdings.is_empty());
        assert!(overview.allocation(AllocationKey::Kind).is_empty());
    }

    #[test]
    fn test_unknown_holding_gets_placeholder_name() {
        let transactions = vec![Transaction::buy(7, day(1, 1), 2.0, 3.0)];
        let overview = PortfolioOverview::build(&[], &transactions, &[], &BTreeMap::new());
        assert_eq!(overview.holdings[0].name, "#7");
        assert_eq!(overview.holdings[0].category, None);
    }
}
