//! CSV importer for holdings, transactions and dividends
//!
//! Rows reference holdings by name; names are resolved (and created when
//! unknown) through a [`RecordSink`], which also owns deduplication. Each
//! file is imported as one batch: a read error part-way through leaves the
//! sink as it was before the file.
//!
//! Holdings file columns (headers are case-insensitive):
//! `name`, `category`?, `kind`?, `sector`?, `ticker`?, `notes`?
//!
//! Transactions file columns: `name`, `category`?, `date`, `side`?,
//! `unit_price`, `quantity`, `fees`?, `total`?, `result`?, `gains`?
//!
//! Dividends file columns: `name`, `category`?, `date`, `amount`

use crate::error::{PortfolioError, Result};
use crate::holding::{Dividend, Holding};
use crate::transaction::{TradeSide, Transaction};
use crate::types::{parse_date, HoldingId, TradeDate};
use csv::{ReaderBuilder, StringRecord};
use hashbrown::{HashMap, HashSet};
use serde::Serialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Resolves holding names to identifiers and stores their metadata
pub trait HoldingRegistry {
    /// Find a holding by name, creating it when unknown. Returns the id and
    /// whether it was created. A category fills an empty one on existing holdings.
    fn resolve_holding(&mut self, name: &str, category: Option<&str>) -> Result<(HoldingId, bool)>;

    /// Look a holding up by name
    fn find_holding(&self, name: &str) -> Result<Option<Holding>>;

    /// Overwrite the metadata of an existing holding
    fn save_holding(&mut self, holding: &Holding) -> Result<()>;

    /// Run `f` as one unit: when it fails nothing it wrote is kept.
    ///
    /// Sinks without transactional storage just run `f`.
    fn in_batch<T, F>(&mut self, f: F) -> Result<T>
    where
        Self: Sized,
        F: FnOnce(&mut Self) -> Result<T>,
    {
        f(self)
    }
}

/// Destination for imported records
pub trait RecordSink: HoldingRegistry {
    /// Store a transaction; `false` when an identical record already exists
    fn add_transaction(&mut self, transaction: &Transaction) -> Result<bool>;

    /// Store a dividend; `false` when an identical record already exists
    fn add_dividend(&mut self, dividend: &Dividend) -> Result<bool>;
}

/// Metadata for one holding. `None` leaves the stored value alone, an empty
/// string clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HoldingUpdate {
    pub category: Option<String>,
    pub kind: Option<String>,
    pub sector: Option<String>,
    pub ticker: Option<String>,
    pub notes: Option<String>,
}

impl HoldingUpdate {
    /// Apply to `holding`, returning whether anything changed
    pub fn apply(&self, holding: &mut Holding) -> bool {
        let mut changed = false;
        for (slot, value) in [
            (&mut holding.category, &self.category),
            (&mut holding.kind, &self.kind),
            (&mut holding.sector, &self.sector),
            (&mut holding.ticker, &self.ticker),
            (&mut holding.notes, &self.notes),
        ] {
            if let Some(value) = value {
                let value = Some(value.trim().to_string()).filter(|v| !v.is_empty());
                if *slot != value {
                    *slot = value;
                    changed = true;
                }
            }
        }
        changed
    }
}

/// Counts reported after an import
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub holdings_created: usize,
    pub holdings_updated: usize,
    pub transactions: usize,
    pub dividends: usize,
    pub duplicates: usize,
    pub skipped: usize,
}

impl ImportSummary {
    pub fn merge(&mut self, other: &ImportSummary) {
        self.holdings_created += other.holdings_created;
        self.holdings_updated += other.holdings_updated;
        self.transactions += other.transactions;
        self.dividends += other.dividends;
        self.duplicates += other.duplicates;
        self.skipped += other.skipped;
    }
}

/// Options for transaction files
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportOptions {
    /// Side applied when the file has no `side` column (e.g. a buys-only sheet)
    pub default_side: Option<TradeSide>,
}

/// Import a holdings CSV file
pub fn import_holdings_csv<S: HoldingRegistry>(path: &Path, sink: &mut S) -> Result<ImportSummary> {
    let summary = import_holdings(File::open(path)?, sink)?;
    log::info!("Imported holdings from {}: {:?}", path.display(), summary);
    Ok(summary)
}

/// Import a transactions CSV file
pub fn import_transactions_csv<S: RecordSink>(
    path: &Path,
    options: ImportOptions,
    sink: &mut S,
) -> Result<ImportSummary> {
    let summary = import_transactions(File::open(path)?, options, sink)?;
    log::info!("Imported transactions from {}: {:?}", path.display(), summary);
    Ok(summary)
}

/// Import a dividends CSV file
pub fn import_dividends_csv<S: RecordSink>(path: &Path, sink: &mut S) -> Result<ImportSummary> {
    let summary = import_dividends(File::open(path)?, sink)?;
    log::info!("Imported dividends from {}: {:?}", path.display(), summary);
    Ok(summary)
}

struct Columns {
    headers: StringRecord,
}

impl Columns {
    fn new(headers: StringRecord) -> Self {
        Self { headers }
    }

    fn index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.eq_ignore_ascii_case(name))
    }

    fn require(&self, name: &str) -> Result<usize> {
        self.index(name)
            .ok_or_else(|| PortfolioError::DataError(format!("Column '{}' not found", name)))
    }
}

fn field<'r>(record: &'r StringRecord, idx: Option<usize>) -> Option<&'r str> {
    idx.and_then(|i| record.get(i)).map(str::trim).filter(|v| !v.is_empty())
}

/// Blank numbers read as `None`; a decimal comma is accepted, NaN and infinities are not
fn number(
    record: &StringRecord,
    idx: Option<usize>,
    column: &str,
) -> std::result::Result<Option<f64>, String> {
    match field(record, idx) {
        None => Ok(None),
        Some(raw) => raw
            .replace(',', ".")
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Some)
            .ok_or_else(|| format!("invalid {} {:?}", column, raw)),
    }
}

fn date(record: &StringRecord, idx: usize) -> std::result::Result<TradeDate, String> {
    let raw = field(record, Some(idx)).unwrap_or_default();
    parse_date(raw).ok_or_else(|| format!("invalid date {:?}", raw))
}

fn reader<R: Read>(input: R) -> csv::Reader<R> {
    ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input)
}

fn read_headers<R: Read>(rdr: &mut csv::Reader<R>) -> Result<Columns> {
    let headers = rdr
        .headers()
        .map_err(|e| PortfolioError::DataError(format!("Failed to read headers: {}", e)))?
        .clone();
    Ok(Columns::new(headers))
}

fn read_record(record: csv::Result<StringRecord>, row: usize) -> Result<StringRecord> {
    record.map_err(|e| PortfolioError::ImportError {
        row,
        reason: e.to_string(),
    })
}

/// Import holding metadata from any CSV reader.
///
/// Unknown names create holdings; non-blank cells overwrite stored values.
pub fn import_holdings<R: Read, S: HoldingRegistry>(
    input: R,
    sink: &mut S,
) -> Result<ImportSummary> {
    let mut rdr = reader(input);
    let headers = read_headers(&mut rdr)?;
    let name_idx = headers.require("name")?;
    let cols = [
        headers.index("category"),
        headers.index("kind"),
        headers.index("sector"),
        headers.index("ticker"),
        headers.index("notes"),
    ];

    sink.in_batch(|sink| {
        let mut summary = ImportSummary::default();
        for (row, record) in rdr.records().enumerate() {
            let record = read_record(record, row + 1)?;
            let name = match field(&record, Some(name_idx)) {
                Some(name) => name,
                None => continue,
            };
            let [category, kind, sector, ticker, notes] =
                cols.map(|idx| field(&record, idx).map(str::to_string));
            let update = HoldingUpdate {
                category,
                kind,
                sector,
                ticker,
                notes,
            };

            let (_, created) = sink.resolve_holding(name, None)?;
            let mut holding = sink
                .find_holding(name)?
                .ok_or_else(|| PortfolioError::HoldingNotFound(name.to_string()))?;
            if update.apply(&mut holding) {
                sink.save_holding(&holding)?;
                if !created {
                    summary.holdings_updated += 1;
                }
            }
            if created {
                summary.holdings_created += 1;
            }
        }
        Ok(summary)
    })
}

struct TransactionColumns {
    name: usize,
    category: Option<usize>,
    date: usize,
    side: Option<usize>,
    price: usize,
    quantity: usize,
    fees: Option<usize>,
    total: Option<usize>,
    result: Option<usize>,
    gains: Option<usize>,
}

/// A parsed row, before its holding name is resolved
struct TransactionRow<'r> {
    name: &'r str,
    category: Option<&'r str>,
    date: TradeDate,
    side: TradeSide,
    price: f64,
    quantity: f64,
    fees: f64,
    total: f64,
    result: Option<f64>,
    gains: Option<f64>,
}

impl TransactionRow<'_> {
    fn into_transaction(self, holding_id: HoldingId) -> Transaction {
        Transaction::new(holding_id, self.date, self.side, self.price, self.quantity)
            .with_fees(self.fees)
            .with_total(self.total)
            .with_realized(self.result, self.gains)
    }
}

fn parse_transaction_row<'r>(
    record: &'r StringRecord,
    cols: &TransactionColumns,
    options: ImportOptions,
) -> std::result::Result<Option<TransactionRow<'r>>, String> {
    let name = match field(record, Some(cols.name)) {
        Some(name) => name,
        None => return Ok(None),
    };

    let date = date(record, cols.date)?;
    let side = match (field(record, cols.side), options.default_side) {
        (Some(raw), _) => raw.parse::<TradeSide>().map_err(|e| e.to_string())?,
        (None, Some(side)) => side,
        (None, None) => return Err("missing side".to_string()),
    };
    let price = number(record, Some(cols.price), "unit_price")?.unwrap_or(0.0);
    let quantity = number(record, Some(cols.quantity), "quantity")?.unwrap_or(0.0);
    let fees = number(record, cols.fees, "fees")?.unwrap_or(0.0);
    let total = number(record, cols.total, "total")?.unwrap_or(price * quantity);
    let (result, gains) = match side {
        TradeSide::Sell => (
            Some(number(record, cols.result, "result")?.unwrap_or(0.0)),
            Some(number(record, cols.gains, "gains")?.unwrap_or(0.0)),
        ),
        TradeSide::Buy => (None, None),
    };

    Ok(Some(TransactionRow {
        name,
        category: field(record, cols.category),
        date,
        side,
        price,
        quantity,
        fees,
        total,
        result,
        gains,
    }))
}

/// Import transactions from any CSV reader
pub fn import_transactions<R: Read, S: RecordSink>(
    input: R,
    options: ImportOptions,
    sink: &mut S,
) -> Result<ImportSummary> {
    let mut rdr = reader(input);
    let headers = read_headers(&mut rdr)?;
    let cols = TransactionColumns {
        name: headers.require("name")?,
        category: headers.index("category"),
        date: headers.require("date")?,
        side: headers.index("side"),
        price: headers.require("unit_price")?,
        quantity: headers.require("quantity")?,
        fees: headers.index("fees"),
        total: headers.index("total"),
        result: headers.index("result"),
        gains: headers.index("gains"),
    };
    if cols.side.is_none() && options.default_side.is_none() {
        return Err(PortfolioError::DataError(
            "Column 'side' not found and no default side given".to_string(),
        ));
    }

    sink.in_batch(|sink| {
        let mut summary = ImportSummary::default();
        for (row, record) in rdr.records().enumerate() {
            let record = read_record(record, row + 1)?;
            let parsed = match parse_transaction_row(&record, &cols, options) {
                Ok(Some(parsed)) => parsed,
                Ok(None) => continue,
                Err(reason) => {
                    log::warn!("Skipping transaction row {}: {}", row + 1, reason);
                    summary.skipped += 1;
                    continue;
                }
            };

            let (holding_id, created) = sink.resolve_holding(parsed.name, parsed.category)?;
            if created {
                summary.holdings_created += 1;
            }
            if sink.add_transaction(&parsed.into_transaction(holding_id))? {
                summary.transactions += 1;
            } else {
                summary.duplicates += 1;
            }
        }
        Ok(summary)
    })
}

/// Import dividends from any CSV reader
pub fn import_dividends<R: Read, S: RecordSink>(input: R, sink: &mut S) -> Result<ImportSummary> {
    let mut rdr = reader(input);
    let headers = read_headers(&mut rdr)?;
    let name_idx = headers.require("name")?;
    let category_idx = headers.index("category");
    let date_idx = headers.require("date")?;
    let amount_idx = headers.require("amount")?;

    sink.in_batch(|sink| {
        let mut summary = ImportSummary::default();
        for (row, record) in rdr.records().enumerate() {
            let record = read_record(record, row + 1)?;
            let name = match field(&record, Some(name_idx)) {
                Some(name) => name,
                None => continue,
            };

            let parsed = date(&record, date_idx).and_then(|date| {
                Ok((date, number(&record, Some(amount_idx), "amount")?.unwrap_or(0.0)))
            });
            let (date, amount) = match parsed {
                Ok(values) => values,
                Err(reason) => {
                    log::warn!("Skipping dividend row {}: {}", row + 1, reason);
                    summary.skipped += 1;
                    continue;
                }
            };

            let (holding_id, created) = sink.resolve_holding(name, field(&record, category_idx))?;
            if created {
                summary.holdings_created += 1;
            }
            if sink.add_dividend(&Dividend::new(holding_id, date, amount))? {
                summary.dividends += 1;
            } else {
                summary.duplicates += 1;
            }
        }
        Ok(summary)
    })
}

type TransactionKey = (HoldingId, i32, TradeSide, u64, u64, u64, u64, Option<u64>, Option<u64>);

/// Natural key of a transaction: every field that identifies the trade
fn transaction_key(t: &Transaction) -> TransactionKey {
    use chrono::Datelike;
    (
        t.holding_id,
        t.date.num_days_from_ce(),
        t.side,
        t.price.to_bits(),
        t.quantity.to_bits(),
        t.fees.to_bits(),
        t.total.to_bits(),
        t.result.map(f64::to_bits),
        t.gains.map(f64::to_bits),
    )
}

/// In-memory record book, for tests and one-off computations without a database
#[derive(Debug, Default)]
pub struct InMemoryBook {
    holdings: Vec<Holding>,
    by_name: HashMap<String, HoldingId>,
    transactions: Vec<Transaction>,
    dividends: Vec<Dividend>,
    transaction_keys: HashSet<TransactionKey>,
    dividend_keys: HashSet<(HoldingId, i32, u64)>,
}

impl InMemoryBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn holdings(&self) -> &[Holding] {
        &self.holdings
    }

    pub fn holding_by_name(&self, name: &str) -> Option<&Holding> {
        self.by_name
            .get(name.trim())
            .and_then(|id| self.holdings.iter().find(|h| h.id == *id))
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn dividends(&self) -> &[Dividend] {
        &self.dividends
    }
}

impl HoldingRegistry for InMemoryBook {
    fn resolve_holding(&mut self, name: &str, category: Option<&str>) -> Result<(HoldingId, bool)> {
        let name = name.trim();
        if let Some(&id) = self.by_name.get(name) {
            if let Some(holding) = self.holdings.iter_mut().find(|h| h.id == id) {
                holding.fill_missing(category, None, None);
            }
            return Ok((id, false));
        }

        let id = self.holdings.len() as HoldingId + 1;
        let mut holding = Holding::new(id, name);
        holding.fill_missing(category, None, None);
        self.holdings.push(holding);
        self.by_name.insert(name.to_string(), id);
        Ok((id, true))
    }

    fn find_holding(&self, name: &str) -> Result<Option<Holding>> {
        Ok(self.holding_by_name(name).cloned())
    }

    fn save_holding(&mut self, holding: &Holding) -> Result<()> {
        let slot = self
            .holdings
            .iter_mut()
            .find(|h| h.id == holding.id)
            .ok_or_else(|| PortfolioError::HoldingNotFound(holding.id.to_string()))?;
        *slot = holding.clone();
        Ok(())
    }
}

impl RecordSink for InMemoryBook {
    fn add_transaction(&mut self, transaction: &Transaction) -> Result<bool> {
        if !self.transaction_keys.insert(transaction_key(transaction)) {
            return Ok(false);
        }
        self.transactions.push(transaction.clone());
        Ok(true)
    }

    fn add_dividend(&mut self, dividend: &Dividend) -> Result<bool> {
        use chrono::Datelike;
        let key = (
            dividend.holding_id,
            dividend.date.num_days_from_ce(),
            dividend.amount.to_bits(),
        );
        if !self.dividend_keys.insert(key) {
            return Ok(false);
        }
        self.dividends.push(dividend.clone());
        Ok(true)
    }
}
