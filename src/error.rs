use rust_decimal::Decimal;
use thiserror::Error;

/// Failure of the durable key-value backend itself.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Reading or writing the persisted ledger failed.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to read '{key}'")]
    Read {
        key: String,
        #[source]
        source: StorageError,
    },
    #[error("stored '{key}' is corrupt")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode ledger snapshot")]
    Encode(#[source] serde_json::Error),
    #[error("failed to write '{key}': {reason}")]
    Write { key: String, reason: String },
}

/// Rejected user input. Raised by callers before anything reaches the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("please enter a valid amount (got '{0}')")]
    InvalidAmount(String),
    #[error("amount cannot be negative: {0}")]
    NegativeAmount(Decimal),
    #[error("please select a category")]
    MissingCategory,
}
