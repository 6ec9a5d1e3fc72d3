//! Portfolio database with SQLite
//!
//! Holds holdings, transactions, dividends and price quotes. Transactions and
//! dividends are deduplicated on their natural key, so importing the same
//! file twice is harmless. The store is opened explicitly and passed to
//! whatever needs it; nothing in the crate keeps a global connection.

use crate::data::importer::{HoldingRegistry, RecordSink};
use crate::error::{PortfolioError, Result};
use crate::holding::{Dividend, Holding, PriceQuote};
use crate::transaction::{TradeSide, Transaction};
use crate::types::{HoldingId, Price};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeMap;
use std::path::Path;

fn db_err(context: &str) -> impl Fn(rusqlite::Error) -> PortfolioError + '_ {
    move |e| PortfolioError::DatabaseError(format!("{}: {}", context, e))
}

/// SQLite-backed record store
pub struct PortfolioStore {
    conn: Connection,
}

impl PortfolioStore {
    /// Create or open database at path
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(db_path).map_err(db_err("Failed to open database"))?;

        let mut store = Self { conn };
        store.create_tables()?;
        log::info!("Opened portfolio database at {}", db_path.display());
        Ok(store)
    }

    /// Create in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(db_err("Failed to create in-memory database"))?;

        let mut store = Self { conn };
        store.create_tables()?;
        Ok(store)
    }

    /// Create database tables
    pub fn create_tables(&mut self) -> Result<()> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS holdings (
                    id INTEGER PRIMARY KEY,
                    name TEXT NOT NULL UNIQUE,
                    category TEXT,
                    kind TEXT,
                    sector TEXT,
                    ticker TEXT,
                    notes TEXT
                );
                CREATE TABLE IF NOT EXISTS transactions (
                    id INTEGER PRIMARY KEY,
                    holding_id INTEGER NOT NULL REFERENCES holdings(id),
                    date TEXT NOT NULL,
                    side TEXT NOT NULL,
                    price REAL NOT NULL,
                    quantity REAL NOT NULL,
                    fees REAL NOT NULL DEFAULT 0,
                    total REAL NOT NULL,
                    result REAL,
                    gains REAL
                );
                CREATE UNIQUE INDEX IF NOT EXISTS uq_transactions_natural ON transactions (
                    holding_id, date, side, price, quantity, fees, total,
                    IFNULL(result, 'none'), IFNULL(gains, 'none')
                );
                CREATE TABLE IF NOT EXISTS dividends (
                    id INTEGER PRIMARY KEY,
                    holding_id INTEGER NOT NULL REFERENCES holdings(id),
                    date TEXT NOT NULL,
                    amount REAL NOT NULL,
                    UNIQUE (holding_id, date, amount)
                );
                CREATE TABLE IF NOT EXISTS prices (
                    id INTEGER PRIMARY KEY,
                    holding_id INTEGER NOT NULL REFERENCES holdings(id),
                    date TEXT NOT NULL,
                    price REAL NOT NULL,
                    source TEXT NOT NULL DEFAULT 'manual',
                    UNIQUE (holding_id, date, source)
                );
                CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions(date);",
            )
            .map_err(db_err("Failed to create tables"))?;
        Ok(())
    }

    fn row_to_holding(row: &Row<'_>) -> rusqlite::Result<Holding> {
        Ok(Holding {
            id: row.get::<_, i64>(0)? as HoldingId,
            name: row.get(1)?,
            category: row.get(2)?,
            kind: row.get(3)?,
            sector: row.get(4)?,
            ticker: row.get(5)?,
            notes: row.get(6)?,
        })
    }

    fn row_to_transaction(row: &Row<'_>) -> rusqlite::Result<Transaction> {
        let side: String = row.get(2)?;
        let side = side
            .parse::<TradeSide>()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;
        Ok(Transaction {
            holding_id: row.get::<_, i64>(0)? as HoldingId,
            date: row.get(1)?,
            side,
            price: row.get(3)?,
            quantity: row.get(4)?,
            fees: row.get(5)?,
            total: row.get(6)?,
            result: row.get(7)?,
            gains: row.get(8)?,
        })
    }

    /// Insert a holding; the id is assigned by the database
    pub fn insert_holding(&mut self, holding: &Holding) -> Result<HoldingId> {
        self.conn
            .execute(
                "INSERT INTO holdings (name, category, kind, sector, ticker, notes)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    holding.name.trim(),
                    &holding.category,
                    &holding.kind,
                    &holding.sector,
                    &holding.ticker,
                    &holding.notes,
                ],
            )
            .map_err(db_err("Failed to insert holding"))?;
        Ok(self.conn.last_insert_rowid() as HoldingId)
    }

    /// Replace the metadata of an existing holding
    pub fn update_holding(&mut self, holding: &Holding) -> Result<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE holdings
                 SET name = ?2, category = ?3, kind = ?4, sector = ?5, ticker = ?6, notes = ?7
                 WHERE id = ?1",
                params![
                    holding.id as i64,
                    holding.name.trim(),
                    &holding.category,
                    &holding.kind,
                    &holding.sector,
                    &holding.ticker,
                    &holding.notes,
                ],
            )
            .map_err(db_err("Failed to update holding"))?;
        if changed == 0 {
            return Err(PortfolioError::HoldingNotFound(holding.id.to_string()));
        }
        Ok(())
    }

    /// Get holding by ID
    pub fn get_holding(&self, holding_id: HoldingId) -> Result<Option<Holding>> {
        self.conn
            .query_row(
                "SELECT id, name, category, kind, sector, ticker, notes
                 FROM holdings WHERE id = ?1",
                params![holding_id as i64],
                Self::row_to_holding,
            )
            .optional()
            .map_err(db_err("Failed to get holding"))
    }

    /// Get holding by name
    pub fn holding_by_name(&self, name: &str) -> Result<Option<Holding>> {
        self.conn
            .query_row(
                "SELECT id, name, category, kind, sector, ticker, notes
                 FROM holdings WHERE name = ?1",
                params![name.trim()],
                Self::row_to_holding,
            )
            .optional()
            .map_err(db_err("Failed to get holding"))
    }

    /// All holdings ordered by name
    pub fn list_holdings(&self) -> Result<Vec<Holding>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, name, category, kind, sector, ticker, notes
                 FROM holdings ORDER BY name",
            )
            .map_err(db_err("Failed to prepare query"))?;

        let holdings = stmt
            .query_map([], Self::row_to_holding)
            .map_err(db_err("Failed to query holdings"))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(db_err("Failed to collect holdings"))?;
        Ok(holdings)
    }

    /// Insert a transaction unless an identical one exists. Only uniqueness
    /// conflicts are ignored; any other constraint failure is an error.
    pub fn insert_transaction(&mut self, txn: &Transaction) -> Result<bool> {
        let inserted = self
            .conn
            .execute(
                "INSERT INTO transactions
                 (holding_id, date, side, price, quantity, fees, total, result, gains)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT DO NOTHING",
                params![
                    txn.holding_id as i64,
                    txn.date,
                    txn.side.as_str(),
                    txn.price,
                    txn.quantity,
                    txn.fees,
                    txn.total,
                    txn.result,
                    txn.gains,
                ],
            )
            .map_err(db_err("Failed to insert transaction"))?;
        Ok(inserted > 0)
    }

    /// All transactions ordered by date, then insertion
    pub fn list_transactions(&self) -> Result<Vec<Transaction>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT holding_id, date, side, price, quantity, fees, total, result, gains
                 FROM transactions ORDER BY date, id",
            )
            .map_err(db_err("Failed to prepare query"))?;

        let transactions = stmt
            .query_map([], Self::row_to_transaction)
            .map_err(db_err("Failed to query transactions"))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(db_err("Failed to collect transactions"))?;
        Ok(transactions)
    }

    /// Insert a dividend unless an identical one exists
    pub fn insert_dividend(&mut self, dividend: &Dividend) -> Result<bool> {
        let inserted = self
            .conn
            .execute(
                "INSERT INTO dividends (holding_id, date, amount) VALUES (?1, ?2, ?3)
                 ON CONFLICT DO NOTHING",
                params![dividend.holding_id as i64, dividend.date, dividend.amount],
            )
            .map_err(db_err("Failed to insert dividend"))?;
        Ok(inserted > 0)
    }

    /// All dividends ordered by date
    pub fn list_dividends(&self) -> Result<Vec<Dividend>> {
        let mut stmt = self
            .conn
            .prepare("SELECT holding_id, date, amount FROM dividends ORDER BY date, id")
            .map_err(db_err("Failed to prepare query"))?;

        let dividends = stmt
            .query_map([], |row| {
                Ok(Dividend {
                    holding_id: row.get::<_, i64>(0)? as HoldingId,
                    date: row.get(1)?,
                    amount: row.get(2)?,
                })
            })
            .map_err(db_err("Failed to query dividends"))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(db_err("Failed to collect dividends"))?;
        Ok(dividends)
    }

    /// Record a quote; a second quote for the same holding, date and source replaces the first
    pub fn upsert_quote(&mut self, quote: &PriceQuote) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO prices (holding_id, date, price, source) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (holding_id, date, source) DO UPDATE SET price = excluded.price",
                params![quote.holding_id as i64, quote.date, quote.price, &quote.source],
            )
            .map_err(db_err("Failed to store quote"))?;
        Ok(())
    }

    /// Price of the most recent quote per holding
    pub fn latest_prices(&self) -> Result<BTreeMap<HoldingId, Price>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT p.holding_id, p.price FROM prices p
                 JOIN (SELECT holding_id, MAX(date) AS max_date FROM prices GROUP BY holding_id) m
                   ON p.holding_id = m.holding_id AND p.date = m.max_date
                 ORDER BY p.id",
            )
            .map_err(db_err("Failed to prepare query"))?;

        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, i64>(0)? as HoldingId, row.get::<_, f64>(1)?))
            })
            .map_err(db_err("Failed to query prices"))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(db_err("Failed to collect prices"))?;
        Ok(rows.into_iter().collect())
    }

    /// Row counts of (holdings, transactions, dividends, prices)
    pub fn counts(&self) -> Result<(usize, usize, usize, usize)> {
        let count = |table: &str| -> Result<usize> {
            let n: i64 = self
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
                .map_err(db_err("Failed to count rows"))?;
            Ok(n as usize)
        };
        Ok((
            count("holdings")?,
            count("transactions")?,
            count("dividends")?,
            count("prices")?,
        ))
    }
}

impl HoldingRegistry for PortfolioStore {
    fn resolve_holding(&mut self, name: &str, category: Option<&str>) -> Result<(HoldingId, bool)> {
        let category = category.map(str::trim).filter(|c| !c.is_empty());
        if let Some(existing) = self.holding_by_name(name)? {
            if let (Some(category), None) = (category, &existing.category) {
                self.conn
                    .execute(
                        "UPDATE holdings SET category = ?2 WHERE id = ?1",
                        params![existing.id as i64, category],
                    )
                    .map_err(db_err("Failed to update holding"))?;
            }
            return Ok((existing.id, false));
        }

        let mut holding = Holding::new(0, name.trim());
        holding.category = category.map(str::to_string);
        let id = self.insert_holding(&holding)?;
        log::debug!("Created holding {} ({})", holding.name, id);
        Ok((id, true))
    }

    fn find_holding(&self, name: &str) -> Result<Option<Holding>> {
        self.holding_by_name(name)
    }

    fn save_holding(&mut self, holding: &Holding) -> Result<()> {
        self.update_holding(holding)
    }

    /// Runs `f` inside one SQLite transaction, rolled back when `f` fails.
    /// Nested calls join the outer transaction.
    fn in_batch<T, F>(&mut self, f: F) -> Result<T>
    where
        Self: Sized,
        F: FnOnce(&mut Self) -> Result<T>,
    {
        if !self.conn.is_autocommit() {
            return f(self);
        }

        self.conn
            .execute_batch("BEGIN IMMEDIATE")
            .map_err(db_err("Failed to begin transaction"))?;
        match f(self) {
            Ok(value) => {
                self.conn
                    .execute_batch("COMMIT")
                    .map_err(db_err("Failed to commit transaction"))?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback) = self.conn.execute_batch("ROLLBACK") {
                    log::error!("Failed to roll back: {}", rollback);
                }
                Err(e)
            }
        }
    }
}

impl RecordSink for PortfolioStore {
    fn add_transaction(&mut self, transaction: &Transaction) -> Result<bool> {
        self.insert_transaction(transaction)
    }

    fn add_dividend(&mut self, dividend: &Dividend) -> Result<bool> {
        self.insert_dividend(dividend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    #[test]
    fn test_store_creation() {
        let store = PortfolioStore::open_in_memory().unwrap();
        assert_eq!(store.counts().unwrap(), (0, 0, 0, 0));
    }

    #[test]
    fn test_resolve_holding_creates_once() {
        let mut store = PortfolioStore::open_in_memory().unwrap();
        let (id, created) = store.resolve_holding("ITSA4", None).unwrap();
        assert!(created);

        let (again, created) = store.resolve_holding(" ITSA4 ", Some("Ações")).unwrap();
        assert_eq!(id, again);
        assert!(!created);
        assert_eq!(
            store.get_holding(id).unwrap().unwrap().category.as_deref(),
            Some("Ações")
        );
    }

    #[test]
    fn test_transactions_round_trip_and_dedup() {
        let mut store = PortfolioStore::open_in_memory().unwrap();
        let (id, _) = store.resolve_holding("HGLG11", None).unwrap();

        let buy = Transaction::buy(id, day(1, 2), 160.0, 2.0).with_fees(0.5);
        let sell =
            Transaction::sell(id, day(2, 2), 170.0, 1.0).with_realized(Some(9.75), Some(9.75));

        assert!(store.insert_transaction(&buy).unwrap());
        assert!(!store.insert_transaction(&buy).unwrap());
        assert!(store.insert_transaction(&sell).unwrap());
        assert!(!store.insert_transaction(&sell).unwrap());

        let listed = store.list_transactions().unwrap();
        assert_eq!(listed, vec![buy, sell]);
    }

    #[test]
    fn test_dividends_dedup() {
        let mut store = PortfolioStore::open_in_memory().unwrap();
        let (id, _) = store.resolve_holding("ITSA4", None).unwrap();
        let dividend = Dividend::new(id, day(3, 1), 12.5);

        assert!(store.insert_dividend(&dividend).unwrap());
        assert!(!store.insert_dividend(&dividend).unwrap());
        assert_eq!(store.list_dividends().unwrap(), vec![dividend]);
    }

    #[test]
    fn test_latest_prices() {
        let mut store = PortfolioStore::open_in_memory().unwrap();
        let (a, _) = store.resolve_holding("A", None).unwrap();
        let (b, _) = store.resolve_holding("B", None).unwrap();

        store.upsert_quote(&PriceQuote::manual(a, day(1, 1), 10.0)).unwrap();
        store.upsert_quote(&PriceQuote::manual(a, day(1, 5), 11.0)).unwrap();
        store.upsert_quote(&PriceQuote::manual(b, day(1, 3), 5.0)).unwrap();
        store.upsert_quote(&PriceQuote::manual(b, day(1, 3), 5.5)).unwrap();

        let latest = store.latest_prices().unwrap();
        assert_eq!(latest[&a], 11.0);
        assert_eq!(latest[&b], 5.5);
        assert_eq!(store.counts().unwrap().3, 3);
    }

    #[test]
    fn test_update_holding() {
        let mut store = PortfolioStore::open_in_memory().unwrap();
        let (id, _) = store.resolve_holding("KNRI11", None).unwrap();

        let holding = Holding::new(id, "KNRI11")
            .with_category("FII")
            .with_kind("Tijolo")
            .with_ticker("KNRI11.SA");
        store.update_holding(&holding).unwrap();
        assert_eq!(store.holding_by_name("KNRI11").unwrap(), Some(holding));

        let missing = Holding::new(999, "nope");
        assert!(matches!(
            store.update_holding(&missing),
            Err(PortfolioError::HoldingNotFound(_))
        ));
    }

    #[test]
    fn test_unknown_side_in_database_is_rejected() {
        let store = PortfolioStore::open_in_memory().unwrap();
        store
            .conn
            .execute_batch(
                "INSERT INTO holdings (id, name) VALUES (1, 'X');
                 INSERT INTO transactions (holding_id, date, side, price, quantity, total)
                 VALUES (1, '2024-01-01', 'SPLIT', 1, 1, 1);",
            )
            .unwrap();
        assert!(matches!(
            store.list_transactions(),
            Err(PortfolioError::DatabaseError(_))
        ));
    }

    #[test]
    fn test_non_finite_values_are_errors_not_duplicates() {
        let mut store = PortfolioStore::open_in_memory().unwrap();
        let (id, _) = store.resolve_holding("X", None).unwrap();

        let bad = Transaction::buy(id, day(1, 1), f64::NAN, 1.0);
        assert!(matches!(
            store.insert_transaction(&bad),
            Err(PortfolioError::DatabaseError(_))
        ));
        let bad_dividend = Dividend::new(id, day(1, 1), f64::NAN);
        assert!(store.insert_dividend(&bad_dividend).is_err());
        assert_eq!(store.counts().unwrap(), (1, 0, 0, 0));
    }

    #[test]
    fn test_failed_import_rolls_back_the_whole_file() {
        use crate::data::importer::{import_transactions, ImportOptions};

        let mut store = PortfolioStore::open_in_memory().unwrap();
        let mut csv = b"name,date,side,unit_price,quantity\n".to_vec();
        csv.extend_from_slice(b"A,2024-01-01,BUY,1,1\nB,2024-01-02,BUY,");
        csv.extend_from_slice(b"\xff,1\n");

        let err =
            import_transactions(csv.as_slice(), ImportOptions::default(), &mut store).unwrap_err();
        assert!(matches!(err, PortfolioError::ImportError { row: 2, .. }));
        assert_eq!(store.counts().unwrap(), (0, 0, 0, 0));

        // the connection is usable again afterwards
        let ok = b"name,date,side,unit_price,quantity\nA,2024-01-01,BUY,1,1\n";
        let summary = import_transactions(&ok[..], ImportOptions::default(), &mut store).unwrap();
        assert_eq!(summary.transactions, 1);
        assert_eq!(store.counts().unwrap(), (1, 1, 0, 0));
    }

    #[test]
    fn test_import_holdings_updates_metadata() {
        use crate::data::importer::import_holdings;

        let mut store = PortfolioStore::open_in_memory().unwrap();
        store.resolve_holding("ITSA4", None).unwrap();

        let csv = "name,category,kind,sector,ticker\n\
                   ITSA4,Ações,Holding,Financeiro,ITSA4.SA\nKNRI11,FII,,,\n";
        let summary = import_holdings(csv.as_bytes(), &mut store).unwrap();
        assert_eq!(summary.holdings_created, 1);
        assert_eq!(summary.holdings_updated, 1);

        let itsa = store.holding_by_name("ITSA4").unwrap().unwrap();
        assert_eq!(itsa.sector.as_deref(), Some("Financeiro"));
        assert_eq!(itsa.ticker.as_deref(), Some("ITSA4.SA"));
        let knri = store.holding_by_name("KNRI11").unwrap().unwrap();
        assert_eq!(knri.category.as_deref(), Some("FII"));
        assert_eq!(knri.kind, None);
    }
}
