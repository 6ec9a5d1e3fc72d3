//! Position accounting - running quantity and blended average cost
//!
//! Cost basis uses a single weighted average per holding:
//! - a buy capitalizes `price * quantity + fees` into the running cost
//! - a sell removes `average_cost * quantity` from the running cost; fees on
//!   sells do not touch the cost basis
//!
//! [`compute_positions`] recomputes everything from the full record set and is
//! the reference result. [`Ledger`] maintains the same state incrementally and
//! always agrees with it.

use crate::transaction::{replay_order, TradeSide, Transaction};
use crate::types::{Cash, HoldingId, Price, Quantity};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Current state of one holding
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    pub holding_id: HoldingId,
    /// Units held; negative when sells exceed tracked buys
    pub quantity: Quantity,
    /// Cost basis per unit (0 when quantity is 0)
    pub average_cost: Price,
    /// Cost basis remaining for the held quantity
    pub net_invested: Cash,
}

impl PositionSnapshot {
    pub fn is_open(&self) -> bool {
        self.quantity != 0.0
    }

    /// Value of the position at the given mark
    pub fn market_value(&self, mark: Price) -> Cash {
        self.quantity * mark
    }

    /// Unrealized P&L at the given mark
    pub fn unrealized_pnl(&self, mark: Price) -> Cash {
        self.market_value(mark) - self.net_invested
    }
}

/// Running accumulator for a single holding
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct RunningPosition {
    quantity: Quantity,
    cost: Cash,
}

impl RunningPosition {
    fn average_cost(&self) -> Price {
        if self.quantity != 0.0 {
            self.cost / self.quantity
        } else {
            0.0
        }
    }

    fn apply(&mut self, txn: &Transaction) {
        match txn.side {
            TradeSide::Buy => {
                self.cost += txn.price * txn.quantity + txn.fees;
                self.quantity += txn.quantity;
            }
            TradeSide::Sell => {
                let average = self.average_cost();
                self.quantity -= txn.quantity;
                self.cost -= average * txn.quantity;
            }
        }
    }

    fn snapshot(&self, holding_id: HoldingId) -> PositionSnapshot {
        PositionSnapshot {
            holding_id,
            quantity: self.quantity,
            average_cost: self.average_cost(),
            net_invested: self.cost,
        }
    }
}

fn fold_positions<'a, I>(ordered: I) -> BTreeMap<HoldingId, RunningPosition>
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let mut state: BTreeMap<HoldingId, RunningPosition> = BTreeMap::new();
    for txn in ordered {
        state.entry(txn.holding_id).or_default().apply(txn);
    }
    state
}

fn snapshots(
    state: &BTreeMap<HoldingId, RunningPosition>,
) -> BTreeMap<HoldingId, PositionSnapshot> {
    state
        .iter()
        .map(|(&holding_id, running)| {
            if running.quantity < 0.0 {
                log::warn!(
                    "Holding {} is oversold: quantity {} after replaying its transactions",
                    holding_id,
                    running.quantity
                );
            }
            (holding_id, running.snapshot(holding_id))
        })
        .collect()
}

/// Compute the position of every holding from an unordered set of records
pub fn compute_positions(transactions: &[Transaction]) -> BTreeMap<HoldingId, PositionSnapshot> {
    let state = fold_positions(replay_order(transactions));
    log::debug!(
        "Computed {} positions from {} transactions",
        state.len(),
        transactions.len()
    );
    snapshots(&state)
}

/// Incrementally maintained positions
///
/// Records arriving in replay order are applied in place; a record that sorts
/// before the last applied one is inserted at its place and the state replayed.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    /// All recorded transactions, in replay order
    transactions: Vec<Transaction>,
    state: BTreeMap<HoldingId, RunningPosition>,
    replays: usize,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a ledger from an existing record set
    pub fn from_transactions(transactions: Vec<Transaction>) -> Self {
        let mut ledger = Self {
            transactions,
            state: BTreeMap::new(),
            replays: 0,
        };
        ledger.transactions.sort_by(|a, b| a.replay_cmp(b));
        ledger.state = fold_positions(&ledger.transactions);
        ledger
    }

    /// Record a transaction
    pub fn record_transaction(&mut self, transaction: Transaction) {
        let in_order = self
            .transactions
            .last()
            .map_or(true, |last| last.replay_cmp(&transaction) != Ordering::Greater);

        if in_order {
            self.state
                .entry(transaction.holding_id)
                .or_default()
                .apply(&transaction);
            self.transactions.push(transaction);
        } else {
            let idx = self
                .transactions
                .partition_point(|t| t.replay_cmp(&transaction) != Ordering::Greater);
            log::debug!(
                "Back-dated transaction for holding {} on {}, replaying {} records",
                transaction.holding_id,
                transaction.date,
                self.transactions.len() + 1
            );
            self.transactions.insert(idx, transaction);
            self.state = fold_positions(&self.transactions);
            self.replays += 1;
        }
    }

    /// Record several transactions
    pub fn extend<I: IntoIterator<Item = Transaction>>(&mut self, transactions: I) {
        for transaction in transactions {
            self.record_transaction(transaction);
        }
    }

    /// Get position for a holding
    pub fn position(&self, holding_id: HoldingId) -> Option<PositionSnapshot> {
        self.state.get(&holding_id).map(|p| p.snapshot(holding_id))
    }

    /// Get all positions; equal to [`compute_positions`] over [`Ledger::transactions`]
    pub fn positions(&self) -> BTreeMap<HoldingId, PositionSnapshot> {
        snapshots(&self.state)
    }

    /// All transactions in replay order
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Get transactions for a holding
    pub fn transactions_for_holding(&self, holding_id: HoldingId) -> Vec<&Transaction> {
        self.transactions
            .iter()
            .filter(|t| t.holding_id == holding_id)
            .collect()
    }

    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }

    /// Number of holdings with a non-zero quantity
    pub fn open_position_count(&self) -> usize {
        self.state.values().filter(|p| p.quantity != 0.0).count()
    }

    /// How many back-dated records forced a full replay
    pub fn replay_count(&self) -> usize {
        self.replays
    }
}
