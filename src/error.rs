//! Error types for rusty_portfolio

use chrono::NaiveDate;
use thiserror::Error;

/// Main error type for rusty_portfolio
#[derive(Error, Debug)]
pub enum PortfolioError {
    #[error("Unsupported transaction side: {0:?} (expected BUY or SELL)")]
    UnsupportedSide(String),

    #[error("Holding not found: {0}")]
    HoldingNotFound(String),

    #[error("Portfolio value is zero on {date}, cannot normalize the curve")]
    ZeroBaseValue { date: NaiveDate },

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Import error at row {row}: {reason}")]
    ImportError { row: usize, reason: String },

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("HTTP error: {0}")]
    HttpError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

/// Result type alias for rusty_portfolio operations
pub type Result<T> = std::result::Result<T, PortfolioError>;
