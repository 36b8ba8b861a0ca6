//! Pocket Ledger: a local-only income and expense tracker with per-category
//! monthly budgets.
//!
//! The [`TransactionStore`] owns the in-memory ledger. Every mutation is
//! persisted as a whole-ledger snapshot to a [`storage::KeyValueStorage`]
//! by a background writer, so the caller never waits on the disk.

pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod logging;
pub mod models;
pub mod storage;
pub mod store;
pub mod summary;

pub use error::{PersistenceError, StorageError, ValidationError};
pub use logging::init_tracing;
pub use store::TransactionStore;
