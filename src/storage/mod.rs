//! Durable key-value storage the ledger is persisted into.
//!
//! The store only needs `get` and `set` on whole text blobs, so any backend
//! that can hold a handful of keyed strings will do.

mod memory;
mod schema;
mod sqlite;

pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;

use crate::error::StorageError;

pub type Result<T> = std::result::Result<T, StorageError>;

/// Key holding the JSON array of transactions.
pub const TRANSACTIONS_KEY: &str = "transactions";
/// Key holding the JSON object of category budgets.
pub const BUDGETS_KEY: &str = "budgets";

/// Abstraction over persistence backends capable of storing keyed text blobs.
pub trait KeyValueStorage: Send + Sync {
    /// Returns `None` when nothing has been stored under `key`.
    fn get(&self, key: &str) -> Result<Option<String>>;
    /// Overwrites whatever was stored under `key`.
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

impl<T: KeyValueStorage + ?Sized> KeyValueStorage for std::sync::Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }
}
