//! The ledger's single source of truth.
//!
//! [`TransactionStore`] holds every transaction and the category budgets in
//! memory and mirrors them to a [`KeyValueStorage`] after each mutation. Writes
//! happen on a background thread; mutations never wait for them. Call
//! [`TransactionStore::flush`] to wait for the disk to catch up and learn
//! whether the last write succeeded.

mod writer;

pub use writer::{PersistStatus, WriteFailure};

use chrono::{DateTime, Local, TimeZone};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::PersistenceError;
use crate::models::{normalize_budgets, Budgets, NewTransaction, Transaction, TransactionKind};
use crate::storage::{KeyValueStorage, BUDGETS_KEY, TRANSACTIONS_KEY};
use crate::summary::{self, BudgetStatus, Period, Totals};

use writer::Writer;

pub struct TransactionStore {
    transactions: Vec<Transaction>,
    budgets: Budgets,
    storage: Arc<dyn KeyValueStorage>,
    writer: Writer,
    loading: bool,
}

impl TransactionStore {
    /// Create an empty store over `storage`. Nothing is read until [`initialize`](Self::initialize).
    pub fn new(storage: impl KeyValueStorage + 'static) -> Self {
        Self::with_storage(Arc::new(storage))
    }

    pub fn with_storage(storage: Arc<dyn KeyValueStorage>) -> Self {
        let writer = Writer::spawn(Arc::clone(&storage));
        Self {
            transactions: Vec::new(),
            budgets: Budgets::new(),
            storage,
            writer,
            loading: true,
        }
    }

    /// Load both persisted structures.
    ///
    /// A missing blob means "empty". A blob that cannot be read or parsed is
    /// logged and replaced by an empty structure; the first such error is
    /// returned, but the store stays usable either way.
    pub fn initialize(&mut self) -> Result<(), PersistenceError> {
        self.loading = true;
        let mut first_error = None;

        self.transactions =
            match load_blob::<Vec<Transaction>>(self.storage.as_ref(), TRANSACTIONS_KEY) {
                Ok(transactions) => transactions,
                Err(e) => {
                    tracing::error!(error = ?e, "could not load transactions; starting empty");
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                    Vec::new()
                }
            };

        self.budgets = match load_blob::<Budgets>(self.storage.as_ref(), BUDGETS_KEY) {
            Ok(budgets) => budgets,
            Err(e) => {
                tracing::error!(error = ?e, "could not load budgets; starting empty");
                if first_error.is_none() {
                    first_error = Some(e);
                }
                Budgets::new()
            }
        };

        let dropped = normalize_budgets(&mut self.budgets);
        if dropped > 0 {
            tracing::debug!(dropped, "ignored zero budget limits");
        }

        self.loading = false;
        tracing::info!(
            transactions = self.transactions.len(),
            budgets = self.budgets.len(),
            "ledger loaded"
        );

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// True until [`initialize`](Self::initialize) has finished.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    // ── Mutations ─────────────────────────────────────────────

    /// Record a transaction at the front of the list and return its new id.
    pub fn add_transaction(&mut self, new: NewTransaction) -> String {
        let id = self.next_id();
        let txn = new.into_transaction(id.clone());
        tracing::debug!(id = %id, kind = %txn.kind, category = %txn.category, "transaction added");
        self.transactions.insert(0, txn);
        self.persist();
        id
    }

    /// Remove the transaction with `id`. Returns `false` if there was none.
    pub fn delete_transaction(&mut self, id: &str) -> bool {
        let before = self.transactions.len();
        self.transactions.retain(|t| t.id != id);
        let removed = self.transactions.len() != before;
        tracing::debug!(id, removed, "transaction delete");
        self.persist();
        removed
    }

    /// Set the monthly limit for `category`. A zero limit clears it.
    pub fn set_category_budget(&mut self, category: impl Into<String>, amount: Decimal) {
        let category = category.into();
        if amount.is_zero() {
            self.budgets.remove(&category);
            tracing::debug!(category = %category, "budget cleared");
        } else {
            tracing::debug!(category = %category, limit = %amount, "budget set");
            self.budgets.insert(category, amount);
        }
        self.persist();
    }

    // ── Reads ─────────────────────────────────────────────────

    /// All transactions, most recently added first.
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn budgets(&self) -> &Budgets {
        &self.budgets
    }

    pub fn budget_limit(&self, category: &str) -> Option<Decimal> {
        self.budgets.get(category).copied()
    }

    pub fn get(&self, id: &str) -> Option<&Transaction> {
        self.transactions.iter().find(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Transactions of one kind (or all), newest date first.
    pub fn recent(&self, kind: Option<TransactionKind>) -> Vec<&Transaction> {
        let mut rows: Vec<&Transaction> = self
            .transactions
            .iter()
            .filter(|t| kind.map_or(true, |k| t.kind == k))
            .collect();
        rows.sort_by(|a, b| b.date.cmp(&a.date));
        rows
    }

    pub fn in_period_at<Tz: TimeZone>(
        &self,
        period: Period,
        now: &DateTime<Tz>,
    ) -> Vec<&Transaction> {
        summary::filter_period(&self.transactions, period, now)
    }

    pub fn totals_at<Tz: TimeZone>(&self, period: Period, now: &DateTime<Tz>) -> Totals {
        Totals::from_transactions(self.in_period_at(period, now))
    }

    /// Budget utilization for the calendar month containing `now`.
    pub fn budget_report_at<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Vec<BudgetStatus> {
        summary::budget_report(&self.totals_at(Period::Month, now), &self.budgets)
    }

    /// [`in_period_at`](Self::in_period_at) relative to the local clock.
    pub fn in_period(&self, period: Period) -> Vec<&Transaction> {
        self.in_period_at(period, &Local::now())
    }

    pub fn totals(&self, period: Period) -> Totals {
        self.totals_at(period, &Local::now())
    }

    pub fn net_balance(&self, period: Period) -> Decimal {
        self.totals(period).net()
    }

    pub fn budget_report(&self) -> Vec<BudgetStatus> {
        self.budget_report_at(&Local::now())
    }

    // ── Persistence ───────────────────────────────────────────

    pub fn persist_status(&self) -> PersistStatus {
        self.writer.status()
    }

    /// Wait for every scheduled write to finish. Fails if the latest one did.
    pub fn flush(&self) -> Result<(), PersistenceError> {
        let status = self.writer.wait_idle();
        match status.current_failure() {
            Some(failure) => Err(PersistenceError::Write {
                key: failure.key.clone(),
                reason: failure.reason.clone(),
            }),
            None => Ok(()),
        }
    }

    fn persist(&self) {
        match encode(&self.transactions, &self.budgets) {
            Ok((transactions, budgets)) => {
                self.writer.submit(transactions, budgets);
            }
            Err(e) => {
                tracing::error!(error = ?e, "could not encode ledger snapshot");
                self.writer.reject(TRANSACTIONS_KEY, e.to_string());
            }
        }
    }

    fn next_id(&self) -> String {
        loop {
            let id = Uuid::new_v4().to_string();
            if self.get(&id).is_none() {
                return id;
            }
        }
    }
}

fn load_blob<T: DeserializeOwned + Default>(
    storage: &dyn KeyValueStorage,
    key: &str,
) -> Result<T, PersistenceError> {
    let raw = storage.get(key).map_err(|source| PersistenceError::Read {
        key: key.to_string(),
        source,
    })?;
    match raw {
        Some(raw) => serde_json::from_str(&raw).map_err(|source| PersistenceError::Corrupt {
            key: key.to_string(),
            source,
        }),
        None => Ok(T::default()),
    }
}

/// Serialize both structures as they are right now.
pub(crate) fn encode(
    transactions: &[Transaction],
    budgets: &Budgets,
) -> Result<(String, String), PersistenceError> {
    let transactions = serde_json::to_string(transactions).map_err(PersistenceError::Encode)?;
    let budgets = serde_json::to_string(budgets).map_err(PersistenceError::Encode)?;
    Ok((transactions, budgets))
}

#[cfg(test)]
mod tests;
