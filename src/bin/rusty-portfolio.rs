//! rusty-portfolio CLI - Command-line interface for portfolio tracking
//!
//! ## Example Usage
//!
//! ```bash
//! # Create the database
//! rusty-portfolio init
//!
//! # Import records
//! rusty-portfolio import --holdings ativos.csv --transactions trades.csv --dividends dividends.csv
//!
//! # Edit a holding and add a trade by hand
//! rusty-portfolio holding ITSA4 --sector Financeiro --ticker ITSA4.SA
//! rusty-portfolio transactions add ITSA4 --date 2024-05-02 --side buy --price 10.5 --quantity 100
//!
//! # Export records
//! rusty-portfolio transactions list --export trades.csv
//!
//! # Show open positions and the overview
//! rusty-portfolio positions
//! rusty-portfolio overview --by sector --top 5
//!
//! # Compare against the CDI
//! rusty-portfolio compare --start 2024-01-01 --rates-csv cdi.csv
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use rusty_portfolio::data::benchmarks::{cumulative_index, load_rates_csv, BenchmarkRate};
use rusty_portfolio::data::export::{write_dividends_csv, write_transactions_csv};
use rusty_portfolio::data::importer::{
    import_dividends_csv, import_holdings_csv, import_transactions_csv, HoldingRegistry,
    HoldingUpdate, ImportOptions, ImportSummary,
};
use rusty_portfolio::error::{PortfolioError, Result};
use rusty_portfolio::finance::summary::{AllocationKey, PortfolioOverview};
use rusty_portfolio::finance::{compute_positions, points_in_range, portfolio_timeseries};
use rusty_portfolio::holding::{Dividend, Holding, PriceQuote};
use rusty_portfolio::performance::PerformanceComparison;
use rusty_portfolio::store::PortfolioStore;
use rusty_portfolio::transaction::{TradeSide, Transaction};
use rusty_portfolio::types::{parse_date, HoldingId, TradeDate};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process;

/// Environment variable overriding the database path
const DB_ENV_VAR: &str = "RUSTY_PORTFOLIO_DB";

/// rusty-portfolio: personal investment portfolio tracker
#[derive(Parser)]
#[command(name = "rusty-portfolio")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "Robert Fall")]
#[command(about = "Track positions, valuation and benchmark performance", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Database file (overrides config and environment)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database if it does not exist
    Init,

    /// Import holdings, transactions and/or dividends from CSV files
    Import {
        /// Holdings CSV (name, category, kind, sector, ticker, notes)
        #[arg(long)]
        holdings: Option<PathBuf>,

        /// Transactions CSV
        #[arg(short = 't', long)]
        transactions: Option<PathBuf>,

        /// Dividends CSV
        #[arg(short = 'd', long)]
        dividends: Option<PathBuf>,

        /// Side for transaction files without a side column (BUY or SELL)
        #[arg(long)]
        side: Option<String>,
    },

    /// Show or edit a holding's metadata (an empty value clears a field)
    Holding {
        /// Holding name
        #[arg(value_name = "NAME")]
        name: String,

        #[arg(long)]
        category: Option<String>,

        #[arg(long)]
        kind: Option<String>,

        #[arg(long)]
        sector: Option<String>,

        #[arg(long)]
        ticker: Option<String>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// List, export or add transactions
    Transactions {
        #[command(subcommand)]
        action: TransactionAction,
    },

    /// List, export or add dividends
    Dividends {
        #[command(subcommand)]
        action: DividendAction,
    },

    /// Show positions per holding
    Positions {
        /// Include closed positions
        #[arg(short = 'a', long)]
        all: bool,
    },

    /// Print the valuation curve
    Timeseries {
        /// Start date (YYYY-MM-DD)
        #[arg(short = 's', long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD)
        #[arg(short = 'e', long)]
        end: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show totals, holdings and allocation
    Overview {
        /// Group allocation by
        #[arg(short = 'b', long, value_enum, default_value = "category")]
        by: GroupBy,

        /// Number of holdings to list
        #[arg(short = 'n', long, default_value = "10")]
        top: usize,
    },

    /// Record a manual price quote
    Price {
        /// Holding name
        #[arg(value_name = "NAME")]
        name: String,

        /// Quoted price
        #[arg(value_name = "PRICE")]
        price: f64,

        /// Quote date (default: today)
        #[arg(long)]
        date: Option<String>,
    },

    /// Compare the portfolio against a benchmark rate
    Compare {
        /// Start date (default: first valuation date)
        #[arg(short = 's', long)]
        start: Option<String>,

        /// End date (default: last valuation date)
        #[arg(short = 'e', long)]
        end: Option<String>,

        /// Offline rate file with date and rate columns
        #[arg(long)]
        rates_csv: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum TransactionAction {
    /// List transactions, optionally writing them to a CSV file
    List {
        /// Only this holding
        #[arg(long)]
        holding: Option<String>,

        /// Write CSV here instead of printing a table
        #[arg(long, value_name = "PATH")]
        export: Option<PathBuf>,
    },

    /// Record a transaction (the holding is created when unknown)
    Add {
        /// Holding name
        #[arg(value_name = "NAME")]
        name: String,

        /// Trade date
        #[arg(long)]
        date: String,

        /// BUY or SELL
        #[arg(long)]
        side: String,

        /// Unit price
        #[arg(long)]
        price: f64,

        #[arg(long)]
        quantity: f64,

        #[arg(long, default_value = "0")]
        fees: f64,

        /// Total value (default: price * quantity)
        #[arg(long)]
        total: Option<f64>,

        /// Realized result of a sell
        #[arg(long)]
        result: Option<f64>,

        /// Realized gains of a sell
        #[arg(long)]
        gains: Option<f64>,

        /// Category for a new holding
        #[arg(long)]
        category: Option<String>,
    },
}

#[derive(Subcommand)]
enum DividendAction {
    /// List dividends, optionally writing them to a CSV file
    List {
        /// Only this holding
        #[arg(long)]
        holding: Option<String>,

        /// Write CSV here instead of printing a table
        #[arg(long, value_name = "PATH")]
        export: Option<PathBuf>,
    },

    /// Record a dividend (the holding is created when unknown)
    Add {
        /// Holding name
        #[arg(value_name = "NAME")]
        name: String,

        /// Payment date
        #[arg(long)]
        date: String,

        #[arg(long)]
        amount: f64,

        /// Category for a new holding
        #[arg(long)]
        category: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum GroupBy {
    Category,
    Kind,
    Sector,
}

impl From<GroupBy> for AllocationKey {
    fn from(value: GroupBy) -> Self {
        match value {
            GroupBy::Category => AllocationKey::Category,
            GroupBy::Kind => AllocationKey::Kind,
            GroupBy::Sector => AllocationKey::Sector,
        }
    }
}

/// Configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Config {
    #[serde(default = "default_db_path")]
    db_path: PathBuf,
    #[serde(default = "default_benchmark_url")]
    benchmark_url: String,
    #[serde(default = "default_benchmark_series")]
    benchmark_series: u32,
    #[serde(default = "default_timeout_secs")]
    http_timeout_secs: u64,
}

fn app_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".rusty-portfolio")
}

fn default_db_path() -> PathBuf {
    app_dir().join("portfolio.db")
}

fn default_benchmark_url() -> String {
    rusty_portfolio::data::sources::sgs::SGS_BASE_URL.to_string()
}

fn default_benchmark_series() -> u32 {
    rusty_portfolio::data::sources::CDI_SERIES
}

fn default_timeout_secs() -> u64 {
    rusty_portfolio::data::sources::sgs::DEFAULT_TIMEOUT_SECS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            benchmark_url: default_benchmark_url(),
            benchmark_series: default_benchmark_series(),
            http_timeout_secs: default_timeout_secs(),
        }
    }
}

impl Config {
    fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => app_dir().join("config.toml"),
        };

        let mut config = if config_path.exists() {
            let contents = fs::read_to_string(&config_path)?;
            toml::from_str(&contents).map_err(|e| {
                PortfolioError::ConfigError(format!("{}: {}", config_path.display(), e))
            })?
        } else {
            if path.is_some() {
                eprintln!(
                    "{} Config file {} not found, using defaults",
                    "Warning:".yellow(),
                    config_path.display()
                );
            }
            Config::default()
        };

        if let Some(db) = std::env::var_os(DB_ENV_VAR) {
            config.db_path = PathBuf::from(db);
        }
        Ok(config)
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = Config::load(cli.config.as_deref()).and_then(|mut config| {
        if let Some(db) = cli.db.clone() {
            config.db_path = db;
        }
        if cli.verbose {
            println!(
                "{} v{}",
                "rusty-portfolio".cyan().bold(),
                env!("CARGO_PKG_VERSION")
            );
            println!("Database: {}", config.db_path.display().to_string().dimmed());
        }
        run(cli.command, &config)
    });

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

fn run(command: Commands, config: &Config) -> Result<()> {
    let mut store = PortfolioStore::open(&config.db_path)?;

    match command {
        Commands::Init => {
            let (holdings, transactions, dividends, prices) = store.counts()?;
            println!(
                "{} Database ready at {}",
                "✓".green().bold(),
                config.db_path.display()
            );
            println!(
                "  {} holdings, {} transactions, {} dividends, {} quotes",
                holdings, transactions, dividends, prices
            );
            Ok(())
        }
        Commands::Import {
            holdings,
            transactions,
            dividends,
            side,
        } => import(&mut store, holdings, transactions, dividends, side),
        Commands::Holding {
            name,
            category,
            kind,
            sector,
            ticker,
            notes,
        } => {
            let update = HoldingUpdate {
                category,
                kind,
                sector,
                ticker,
                notes,
            };
            edit_holding(&mut store, &name, &update)
        }
        Commands::Transactions { action } => transactions_command(&mut store, action),
        Commands::Dividends { action } => dividends_command(&mut store, action),
        Commands::Positions { all } => show_positions(&store, all),
        Commands::Timeseries { start, end, json } => show_timeseries(&store, start, end, json),
        Commands::Overview { by, top } => show_overview(&store, by.into(), top),
        Commands::Price { name, price, date } => record_price(&mut store, &name, price, date),
        Commands::Compare {
            start,
            end,
            rates_csv,
        } => compare(&store, config, start, end, rates_csv),
    }
}

fn parse_date_arg(raw: &str) -> Result<TradeDate> {
    parse_date(raw).ok_or_else(|| PortfolioError::ParseError(format!("invalid date {:?}", raw)))
}

fn finite(value: f64, what: &str) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(PortfolioError::ParseError(format!("invalid {} {}", what, value)))
    }
}

fn import(
    store: &mut PortfolioStore,
    holdings: Option<PathBuf>,
    transactions: Option<PathBuf>,
    dividends: Option<PathBuf>,
    side: Option<String>,
) -> Result<()> {
    if holdings.is_none() && transactions.is_none() && dividends.is_none() {
        return Err(PortfolioError::DataError(
            "Nothing to import: pass --holdings, --transactions and/or --dividends".to_string(),
        ));
    }

    let options = ImportOptions {
        default_side: side.as_deref().map(str::parse::<TradeSide>).transpose()?,
    };

    let mut summary = ImportSummary::default();
    if let Some(path) = holdings {
        println!("Importing holdings from {}", path.display().to_string().bright_green());
        summary.merge(&import_holdings_csv(&path, store)?);
    }
    if let Some(path) = transactions {
        println!("Importing transactions from {}", path.display().to_string().bright_green());
        summary.merge(&import_transactions_csv(&path, options, store)?);
    }
    if let Some(path) = dividends {
        println!("Importing dividends from {}", path.display().to_string().bright_green());
        summary.merge(&import_dividends_csv(&path, store)?);
    }

    println!();
    println!("{}", "Import Summary".green().bold());
    println!("{}", "==============".green());
    println!("  {} {}", "Holdings created:".bold(), summary.holdings_created);
    println!("  {} {}", "Holdings updated:".bold(), summary.holdings_updated);
    println!("  {} {}", "Transactions:".bold(), summary.transactions);
    println!("  {} {}", "Dividends:".bold(), summary.dividends);
    println!("  {} {}", "Duplicates:".bold(), summary.duplicates);
    if summary.skipped > 0 {
        println!("  {} {}", "Skipped rows:".bold(), summary.skipped.to_string().yellow());
    }
    Ok(())
}

fn print_holding(holding: &Holding) {
    let show = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());
    println!("{}", holding.name.cyan().bold());
    println!("  {} {}", "Category:".bold(), show(&holding.category));
    println!("  {} {}", "Kind:".bold(), show(&holding.kind));
    println!("  {} {}", "Sector:".bold(), show(&holding.sector));
    println!("  {} {}", "Ticker:".bold(), show(&holding.ticker));
    println!("  {} {}", "Notes:".bold(), show(&holding.notes));
}

fn edit_holding(store: &mut PortfolioStore, name: &str, update: &HoldingUpdate) -> Result<()> {
    let mut holding = store
        .holding_by_name(name)?
        .ok_or_else(|| PortfolioError::HoldingNotFound(name.to_string()))?;

    if update.apply(&mut holding) {
        store.update_holding(&holding)?;
        println!("{} {} updated", "✓".green().bold(), holding.name.bright_green());
    }
    print_holding(&holding);
    Ok(())
}

/// Id of `name`, or `None` for all holdings
fn holding_filter(store: &PortfolioStore, name: Option<&str>) -> Result<Option<HoldingId>> {
    name.map(|name| {
        store
            .holding_by_name(name)?
            .map(|h| h.id)
            .ok_or_else(|| PortfolioError::HoldingNotFound(name.to_string()))
    })
    .transpose()
}

fn holding_name(holdings: &[Holding], id: HoldingId) -> String {
    holdings
        .iter()
        .find(|h| h.id == id)
        .map_or_else(|| format!("#{}", id), |h| h.name.clone())
}

fn report_insert(inserted: bool, what: &str, name: &str) {
    if inserted {
        println!("{} {} recorded for {}", "✓".green().bold(), what, name.bright_green());
    } else {
        println!("{} identical {} already recorded", "Warning:".yellow(), what);
    }
}

fn transactions_command(store: &mut PortfolioStore, action: TransactionAction) -> Result<()> {
    match action {
        TransactionAction::List { holding, export } => {
            let filter = holding_filter(store, holding.as_deref())?;
            let holdings = store.list_holdings()?;
            let transactions: Vec<Transaction> = store
                .list_transactions()?
                .into_iter()
                .filter(|t| filter.map_or(true, |id| t.holding_id == id))
                .collect();

            if let Some(path) = export {
                let file = File::create(&path)?;
                let written = write_transactions_csv(file, &holdings, &transactions)?;
                println!(
                    "{} {} transactions written to {}",
                    "✓".green().bold(),
                    written,
                    path.display()
                );
                return Ok(());
            }

            println!(
                "  {:<12} {:<20} {:<5} {:>12} {:>12} {:>10} {:>14}",
                "Date".bold(),
                "Holding".bold(),
                "Side".bold(),
                "Price".bold(),
                "Quantity".bold(),
                "Fees".bold(),
                "Total".bold()
            );
            for txn in &transactions {
                println!(
                    "  {:<12} {:<20} {:<5} {:>12.4} {:>12.4} {:>10.2} {:>14.2}",
                    txn.date.to_string(),
                    holding_name(&holdings, txn.holding_id),
                    txn.side.as_str(),
                    txn.price,
                    txn.quantity,
                    txn.fees,
                    txn.total
                );
            }
            Ok(())
        }
        TransactionAction::Add {
            name,
            date,
            side,
            price,
            quantity,
            fees,
            total,
            result,
            gains,
            category,
        } => {
            let side: TradeSide = side.parse()?;
            let price = finite(price, "price")?;
            let quantity = finite(quantity, "quantity")?;
            let total = finite(total.unwrap_or(price * quantity), "total")?;
            let (result, gains) = match side {
                TradeSide::Sell => (
                    Some(finite(result.unwrap_or(0.0), "result")?),
                    Some(finite(gains.unwrap_or(0.0), "gains")?),
                ),
                TradeSide::Buy => (None, None),
            };

            let (holding_id, created) = store.resolve_holding(&name, category.as_deref())?;
            if created {
                println!("{} new holding {}", "✓".green().bold(), name.bright_green());
            }
            let txn = Transaction::new(holding_id, parse_date_arg(&date)?, side, price, quantity)
                .with_fees(finite(fees, "fees")?)
                .with_total(total)
                .with_realized(result, gains);
            let inserted = store.insert_transaction(&txn)?;
            report_insert(inserted, "transaction", &name);
            Ok(())
        }
    }
}

fn dividends_command(store: &mut PortfolioStore, action: DividendAction) -> Result<()> {
    match action {
        DividendAction::List { holding, export } => {
            let filter = holding_filter(store, holding.as_deref())?;
            let holdings = store.list_holdings()?;
            let dividends: Vec<Dividend> = store
                .list_dividends()?
                .into_iter()
                .filter(|d| filter.map_or(true, |id| d.holding_id == id))
                .collect();

            if let Some(path) = export {
                let written = write_dividends_csv(File::create(&path)?, &holdings, &dividends)?;
                println!(
                    "{} {} dividends written to {}",
                    "✓".green().bold(),
                    written,
                    path.display()
                );
                return Ok(());
            }

            println!("  {:<12} {:<20} {:>12}", "Date".bold(), "Holding".bold(), "Amount".bold());
            for dividend in &dividends {
                println!(
                    "  {:<12} {:<20} {:>12.2}",
                    dividend.date.to_string(),
                    holding_name(&holdings, dividend.holding_id),
                    dividend.amount
                );
            }
            let total: f64 = dividends.iter().map(|d| d.amount).sum();
            println!("  {:<33} {:>12.2}", "Total".bold(), total);
            Ok(())
        }
        DividendAction::Add {
            name,
            date,
            amount,
            category,
        } => {
            let amount = finite(amount, "amount")?;
            let date = parse_date_arg(&date)?;
            let (holding_id, created) = store.resolve_holding(&name, category.as_deref())?;
            if created {
                println!("{} new holding {}", "✓".green().bold(), name.bright_green());
            }
            let inserted = store.insert_dividend(&Dividend::new(holding_id, date, amount))?;
            report_insert(inserted, "dividend", &name);
            Ok(())
        }
    }
}

fn show_positions(store: &PortfolioStore, all: bool) -> Result<()> {
    let holdings = store.list_holdings()?;
    let positions = compute_positions(&store.list_transactions()?);

    println!("{}", "Positions".cyan().bold());
    println!(
        "  {:<24} {:>14} {:>14} {:>16}",
        "Holding".bold(),
        "Quantity".bold(),
        "Avg Cost".bold(),
        "Net Invested".bold()
    );
    for position in positions.values().filter(|p| all || p.is_open()) {
        let name = holdings
            .iter()
            .find(|h| h.id == position.holding_id)
            .map_or_else(|| format!("#{}", position.holding_id), |h| h.name.clone());
        let quantity = format!("{:>14.4}", position.quantity);
        let quantity = if position.quantity < 0.0 {
            quantity.red().to_string()
        } else {
            quantity
        };
        println!(
            "  {:<24} {} {:>14.4} {:>16.2}",
            name, quantity, position.average_cost, position.net_invested
        );
    }
    Ok(())
}

fn show_timeseries(
    store: &PortfolioStore,
    start: Option<String>,
    end: Option<String>,
    json: bool,
) -> Result<()> {
    let mut points = portfolio_timeseries(&store.list_transactions()?);
    if start.is_some() || end.is_some() {
        let start = start.as_deref().map(parse_date_arg).transpose()?.unwrap_or(TradeDate::MIN);
        let end = end.as_deref().map(parse_date_arg).transpose()?.unwrap_or(TradeDate::MAX);
        points = points_in_range(&points, start, end);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&points)?);
    } else {
        println!("date,value");
        for point in &points {
            println!("{},{:.2}", point.date, point.value);
        }
    }
    Ok(())
}

fn show_overview(store: &PortfolioStore, key: AllocationKey, top: usize) -> Result<()> {
    let overview = PortfolioOverview::build(
        &store.list_holdings()?,
        &store.list_transactions()?,
        &store.list_dividends()?,
        &store.latest_prices()?,
    );

    println!("{}", "Portfolio Overview".green().bold());
    println!("{}", "==================".green());
    println!("  {} {:.2}", "Invested:".bold(), overview.invested);
    println!("  {} {:.2}", "Current value:".bold(), overview.current_value);
    println!("  {} {:.2}", "Dividends:".bold(), overview.dividends);
    println!("  {} {:.2}", "Realized gains:".bold(), overview.realized_gains);
    println!("  {} {:.2}", "Fees paid:".bold(), overview.fees_paid);
    let total_return = format!("{:.2}%", overview.total_return * 100.0);
    let total_return = if overview.total_return >= 0.0 {
        total_return.bright_green().bold()
    } else {
        total_return.red().bold()
    };
    println!("  {} {}", "Total return:".bold(), total_return);

    println!();
    println!("{}", format!("Top {} holdings", top).cyan().bold());
    for row in overview.top_holdings(top) {
        println!(
            "  {:<24} {:>12.2} {:>7.2}%  @ {:.2}",
            row.name,
            row.market_value,
            row.weight * 100.0,
            row.mark
        );
    }

    println!();
    println!("{}", "Allocation".cyan().bold());
    for slice in overview.allocation(key) {
        println!(
            "  {:<24} {:>12.2} {:>7.2}%",
            slice.label,
            slice.value,
            slice.weight * 100.0
        );
    }
    Ok(())
}

fn record_price(
    store: &mut PortfolioStore,
    name: &str,
    price: f64,
    date: Option<String>,
) -> Result<()> {
    let holding = store
        .holding_by_name(name)?
        .ok_or_else(|| PortfolioError::HoldingNotFound(name.to_string()))?;
    let date = match date {
        Some(raw) => parse_date_arg(&raw)?,
        None => chrono::Local::now().date_naive(),
    };

    store.upsert_quote(&PriceQuote::manual(holding.id, date, price))?;
    println!(
        "{} {} quoted at {:.2} on {}",
        "✓".green().bold(),
        holding.name.bright_green(),
        price,
        date
    );
    Ok(())
}

fn load_rates(
    config: &Config,
    rates_csv: Option<PathBuf>,
    start: TradeDate,
    end: TradeDate,
) -> Result<Vec<BenchmarkRate>> {
    if let Some(path) = rates_csv {
        return load_rates_csv(&path);
    }
    fetch_rates(config, start, end)
}

#[cfg(feature = "async")]
fn fetch_rates(config: &Config, start: TradeDate, end: TradeDate) -> Result<Vec<BenchmarkRate>> {
    use rusty_portfolio::data::sources::{RateSource, SgsRateSource};
    use std::time::Duration;

    let source = SgsRateSource::new(
        config.benchmark_url.clone(),
        config.benchmark_series,
        Duration::from_secs(config.http_timeout_secs),
    )?;
    println!("Fetching benchmark rates from {}", source.name().bright_green());
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(source.fetch_rates(start, end))
}

#[cfg(not(feature = "async"))]
fn fetch_rates(_config: &Config, _start: TradeDate, _end: TradeDate) -> Result<Vec<BenchmarkRate>> {
    Err(PortfolioError::ConfigError(
        "Fetching rates needs the `async` feature; pass --rates-csv instead".to_string(),
    ))
}

fn compare(
    store: &PortfolioStore,
    config: &Config,
    start: Option<String>,
    end: Option<String>,
    rates_csv: Option<PathBuf>,
) -> Result<()> {
    let points = portfolio_timeseries(&store.list_transactions()?);
    let (first, last) = match (points.first(), points.last()) {
        (Some(first), Some(last)) => (first.date, last.date),
        _ => return Err(PortfolioError::DataError("No transactions recorded".to_string())),
    };
    let start = start.as_deref().map(parse_date_arg).transpose()?.unwrap_or(first);
    let end = end.as_deref().map(parse_date_arg).transpose()?.unwrap_or(last);

    let rates = load_rates(config, rates_csv, start, end)?;
    let rates: Vec<BenchmarkRate> = rates
        .into_iter()
        .filter(|r| r.date >= start && r.date <= end)
        .collect();
    let index = cumulative_index(&rates);

    let comparison = PerformanceComparison::build(&points, &index, start, end)?;
    println!("{}", comparison.summary());
    Ok(())
}
