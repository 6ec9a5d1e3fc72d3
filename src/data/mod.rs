//! Record import and benchmark data

pub mod benchmarks;
pub mod export;
pub mod importer;
pub mod sources;

pub use benchmarks::{cumulative_index, forward_fill, load_rates_csv, BenchmarkRate, IndexPoint};
pub use export::{write_dividends_csv, write_transactions_csv};
pub use importer::{
    import_dividends_csv, import_holdings_csv, import_transactions_csv, HoldingRegistry,
    HoldingUpdate, ImportOptions, ImportSummary, InMemoryBook, RecordSink,
};
