//! Error types for the economy core

use thiserror::Error;

/// Result type for economy operations
pub type Result<T> = std::result::Result<T, Error>;

/// Economy core errors
#[derive(Error, Debug)]
pub enum Error {
    /// Database error (sqlx)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Decimal parse error
    #[error("Decimal parse error: {0}")]
    DecimalParse(#[from] rust_decimal::Error),

    /// The durable store is not online or the schema is not synchronized
    #[error("Economy core is not ready")]
    NotReady,

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Currency not found
    #[error("Unknown currency: {0}")]
    CurrencyNotFound(String),

    /// Identifier already taken, including soft-deleted rows
    #[error("Currency identifier already exists: {0}")]
    DuplicateCurrency(String),

    /// The primary currency may not be deleted until reassigned
    #[error("Currency is primary and cannot be deleted: {0}")]
    PrimaryCurrencyProtected(String),

    /// Snapshot not found
    #[error("Snapshot not found: {0}")]
    SnapshotNotFound(String),

    /// A snapshot cannot cover zero accounts
    #[error("No accounts to snapshot")]
    SnapshotEmpty,

    /// Async executor rejected a task (shut down or saturated)
    #[error("Executor rejected task: {0}")]
    ExecutorRejected(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Internal(String),
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Internal(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Internal(msg.to_string())
    }
}
