#![allow(clippy::unwrap_used)]

use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashSet;
use std::sync::Arc;

use super::*;
use crate::error::StorageError;
use crate::models::{parse_amount, parse_budget_limit};
use crate::storage::{MemoryStorage, SqliteStorage};

fn memory_store() -> (TransactionStore, Arc<MemoryStorage>) {
    let storage = Arc::new(MemoryStorage::new());
    let mut store = TransactionStore::with_storage(storage.clone());
    store.initialize().unwrap();
    (store, storage)
}

fn expense(category: &str, amount: Decimal) -> NewTransaction {
    NewTransaction::new(TransactionKind::Expense, amount, category)
}

fn income(category: &str, amount: Decimal) -> NewTransaction {
    NewTransaction::new(TransactionKind::Income, amount, category)
}

// ── Initialize ────────────────────────────────────────────────

#[test]
fn test_loading_flag_clears_after_initialize() {
    let mut store = TransactionStore::new(MemoryStorage::new());
    assert!(store.is_loading());
    store.initialize().unwrap();
    assert!(!store.is_loading());
    assert!(store.is_empty());
    assert!(store.budgets().is_empty());
}

#[test]
fn test_initialize_reads_existing_blobs() {
    let storage = MemoryStorage::new()
        .with_value(
            TRANSACTIONS_KEY,
            r#"[{"id":"1718000000000","amount":12.5,"category":"Comida","date":"2024-06-10T08:00:00.000Z","note":"","type":"expense"},
                {"id":"1718000000001","amount":1500,"category":"Sueldo","date":"2024-06-01T08:00:00.000Z","type":"income"}]"#,
        )
        .with_value(BUDGETS_KEY, r#"{"Comida":200,"Ocio":0}"#);
    let mut store = TransactionStore::new(storage);
    store.initialize().unwrap();

    assert_eq!(store.len(), 2);
    let first = &store.transactions()[0];
    assert_eq!(first.id, "1718000000000");
    assert_eq!(first.amount, dec!(12.5));
    assert_eq!(first.kind, TransactionKind::Expense);
    assert_eq!(first.note.as_deref(), Some(""));
    assert_eq!(store.transactions()[1].note, None);

    assert_eq!(store.budget_limit("Comida"), Some(dec!(200)));
    // Zero limits load as "no limit".
    assert_eq!(store.budget_limit("Ocio"), None);
    assert_eq!(store.budgets().len(), 1);
}

#[test]
fn test_corrupt_blob_yields_empty_store() {
    let storage = MemoryStorage::new()
        .with_value(TRANSACTIONS_KEY, "{not json")
        .with_value(BUDGETS_KEY, r#"{"Comida":200}"#);
    let mut store = TransactionStore::new(storage);

    let err = store.initialize().unwrap_err();
    assert!(matches!(err, PersistenceError::Corrupt { ref key, .. } if key == TRANSACTIONS_KEY));
    assert!(!store.is_loading());
    assert!(store.is_empty());
    // The intact blob still loads.
    assert_eq!(store.budget_limit("Comida"), Some(dec!(200)));
}

#[test]
fn test_both_blobs_corrupt() {
    let storage = MemoryStorage::new()
        .with_value(TRANSACTIONS_KEY, "[{]")
        .with_value(BUDGETS_KEY, "[]");
    let mut store = TransactionStore::new(storage);
    assert!(store.initialize().is_err());
    assert!(store.is_empty());
    assert!(store.budgets().is_empty());
}

#[test]
fn test_read_failure_degrades_to_empty() {
    let storage = Arc::new(MemoryStorage::new().with_value(BUDGETS_KEY, r#"{"Luz":40}"#));
    storage.set_fail_reads(true);
    let mut store = TransactionStore::with_storage(storage.clone());
    let err = store.initialize().unwrap_err();
    assert!(matches!(err, PersistenceError::Read { .. }));
    assert!(store.budgets().is_empty());

    // Still usable afterwards.
    store.add_transaction(expense("Luz", dec!(40)));
    store.flush().unwrap();
    assert_eq!(store.len(), 1);
}

#[test]
fn test_corrupt_data_not_overwritten_until_mutation() {
    let storage = Arc::new(MemoryStorage::new().with_value(TRANSACTIONS_KEY, "oops"));
    let mut store = TransactionStore::with_storage(storage.clone());
    assert!(store.initialize().is_err());
    store.flush().unwrap();
    assert_eq!(storage.peek(TRANSACTIONS_KEY).as_deref(), Some("oops"));
    assert_eq!(storage.write_count(), 0);
}

// ── Mutations ─────────────────────────────────────────────────

#[test]
fn test_add_prepends_and_assigns_ids() {
    let (mut store, _) = memory_store();
    let a = store.add_transaction(expense("Comida", dec!(10)));
    let b = store.add_transaction(income("Sueldo", dec!(100)).with_note("October"));
    assert_ne!(a, b);
    assert_eq!(store.transactions()[0].id, b);
    assert_eq!(store.transactions()[1].id, a);
    assert_eq!(store.get(&b).unwrap().note.as_deref(), Some("October"));
}

#[test]
fn test_length_and_uniqueness_after_adds_and_deletes() {
    let (mut store, _) = memory_store();
    let mut ids = Vec::new();
    for i in 0..25 {
        ids.push(store.add_transaction(expense("Otros", Decimal::from(i))));
    }
    let mut deleted = 0;
    for id in ids.iter().step_by(3) {
        assert!(store.delete_transaction(id));
        deleted += 1;
    }
    // Deleting the same ids again removes nothing.
    for id in ids.iter().step_by(3) {
        assert!(!store.delete_transaction(id));
    }

    assert_eq!(store.len(), 25 - deleted);
    let unique: HashSet<&str> = store.transactions().iter().map(|t| t.id.as_str()).collect();
    assert_eq!(unique.len(), store.len());
}

#[test]
fn test_ids_not_reused_after_delete() {
    let (mut store, _) = memory_store();
    let first = store.add_transaction(expense("Agua", dec!(5)));
    store.delete_transaction(&first);
    let second = store.add_transaction(expense("Agua", dec!(5)));
    assert_ne!(first, second);
}

#[test]
fn test_delete_missing_is_noop() {
    let (mut store, _) = memory_store();
    store.add_transaction(expense("Luz", dec!(30)));
    let before = store.transactions().to_vec();
    assert!(!store.delete_transaction("does-not-exist"));
    assert_eq!(store.transactions(), before.as_slice());
}

#[test]
fn test_set_budget_insert_overwrite_and_clear() {
    let (mut store, _) = memory_store();
    store.set_category_budget("Comida", dec!(200));
    assert_eq!(store.budget_limit("Comida"), Some(dec!(200)));
    store.set_category_budget("Comida", dec!(250));
    assert_eq!(store.budget_limit("Comida"), Some(dec!(250)));
    store.set_category_budget("Comida", Decimal::ZERO);
    assert_eq!(store.budget_limit("Comida"), None);
    assert!(store.budgets().is_empty());
}

#[test]
fn test_set_budget_accepts_unknown_category() {
    let (mut store, _) = memory_store();
    store.set_category_budget("Mascotas", dec!(30));
    assert_eq!(store.budget_limit("Mascotas"), Some(dec!(30)));
}

#[test]
fn test_recent_sorted_by_date() {
    let (mut store, _) = memory_store();
    let older = Utc.with_ymd_and_hms(2026, 1, 5, 0, 0, 0).unwrap();
    let newer = Utc.with_ymd_and_hms(2026, 2, 5, 0, 0, 0).unwrap();
    store.add_transaction(expense("Luz", dec!(1)).with_date(newer));
    store.add_transaction(expense("Agua", dec!(2)).with_date(older));
    store.add_transaction(income("Sueldo", dec!(3)).with_date(older));

    let expenses = store.recent(Some(TransactionKind::Expense));
    let cats: Vec<&str> = expenses.iter().map(|t| t.category.as_str()).collect();
    assert_eq!(cats, vec!["Luz", "Agua"]);
    assert_eq!(store.recent(None).len(), 3);
    assert_eq!(store.recent(Some(TransactionKind::Income)).len(), 1);
}

// ── Aggregates ────────────────────────────────────────────────

#[test]
fn test_store_totals_and_budget_report() {
    let (mut store, _) = memory_store();
    let now = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
    let this_month = Utc.with_ymd_and_hms(2026, 10, 2, 12, 0, 0).unwrap();
    let last_month = Utc.with_ymd_and_hms(2026, 9, 20, 12, 0, 0).unwrap();

    store.add_transaction(expense("Comida", dec!(80)).with_date(this_month));
    store.add_transaction(expense("Comida", dec!(40)).with_date(this_month));
    store.add_transaction(expense("Comida", dec!(500)).with_date(last_month));
    store.add_transaction(income("Sueldo", dec!(1000)).with_date(this_month));
    store.set_category_budget("Comida", dec!(100));

    let monthly = store.totals_at(Period::Month, &now);
    assert_eq!(monthly.spent("Comida"), dec!(120));
    assert_eq!(monthly.net(), dec!(880));

    let annual = store.totals_at(Period::Year, &now);
    assert_eq!(annual.spent("Comida"), dec!(620));
    assert_eq!(store.in_period_at(Period::Year, &now).len(), 4);

    let report = store.budget_report_at(&now);
    let comida = report.iter().find(|r| r.category == "Comida").unwrap();
    assert!(comida.over_budget);
    assert_eq!(comida.progress, Decimal::ONE);
    let luz = report.iter().find(|r| r.category == "Luz").unwrap();
    assert_eq!(luz.limit, None);
    assert!(!luz.over_budget);
}

// ── Persistence ───────────────────────────────────────────────

#[test]
fn test_every_mutation_persists_both_keys() {
    let (mut store, storage) = memory_store();
    store.add_transaction(expense("Comida", dec!(10)));
    store.set_category_budget("Comida", dec!(100));
    store.flush().unwrap();

    let transactions: Vec<Transaction> =
        serde_json::from_str(&storage.peek(TRANSACTIONS_KEY).unwrap()).unwrap();
    assert_eq!(transactions, store.transactions());
    let budgets: Budgets = serde_json::from_str(&storage.peek(BUDGETS_KEY).unwrap()).unwrap();
    assert_eq!(&budgets, store.budgets());

    let status = store.persist_status();
    assert!(status.is_idle());
    assert_eq!(status.issued, 2);
    assert_eq!(status.failures, 0);
}

#[test]
fn test_delete_of_missing_id_still_writes() {
    let (mut store, storage) = memory_store();
    store.delete_transaction("nothing");
    store.flush().unwrap();
    assert_eq!(storage.peek(TRANSACTIONS_KEY).as_deref(), Some("[]"));
    assert_eq!(storage.peek(BUDGETS_KEY).as_deref(), Some("{}"));
}

#[test]
fn test_persisted_json_shape() {
    let (mut store, storage) = memory_store();
    let date = Utc.with_ymd_and_hms(2026, 10, 1, 9, 30, 0).unwrap();
    let id = store.add_transaction(expense("Comida", dec!(12.5)).with_date(date));
    store.set_category_budget("Comida", dec!(200));
    store.flush().unwrap();

    let raw: serde_json::Value =
        serde_json::from_str(&storage.peek(TRANSACTIONS_KEY).unwrap()).unwrap();
    let record = &raw[0];
    assert_eq!(record["id"], serde_json::json!(id));
    assert_eq!(record["amount"], serde_json::json!(12.5));
    assert_eq!(record["category"], "Comida");
    assert_eq!(record["date"], "2026-10-01T09:30:00Z");
    assert_eq!(record["type"], "expense");
    assert!(record.get("note").is_none());

    assert!(storage.peek(TRANSACTIONS_KEY).unwrap().contains(r#""amount":12.5,"#));
    assert_eq!(storage.peek(BUDGETS_KEY).unwrap(), r#"{"Comida":200}"#);
}

#[test]
fn test_amounts_keep_full_precision_across_reload() {
    let storage = Arc::new(MemoryStorage::new());
    let amount = parse_amount("12345678.123456789").unwrap();
    let limit = parse_budget_limit("0.1234567890123456789").unwrap();
    {
        let mut store = TransactionStore::with_storage(storage.clone());
        store.initialize().unwrap();
        store.add_transaction(expense("Casa", amount));
        store.set_category_budget("Casa", limit);
        store.flush().unwrap();
    }
    assert!(storage
        .peek(TRANSACTIONS_KEY)
        .unwrap()
        .contains(r#""amount":12345678.123456789"#));

    let mut reloaded = TransactionStore::with_storage(storage);
    reloaded.initialize().unwrap();
    assert_eq!(reloaded.transactions()[0].amount, amount);
    assert_eq!(reloaded.budget_limit("Casa"), Some(limit));
}

#[test]
fn test_legacy_blob_loads_and_survives_rewrite() {
    let storage = Arc::new(
        MemoryStorage::new()
            .with_value(
                TRANSACTIONS_KEY,
                r#"[{"id":"1700000000000","amount":42.35,"category":"Luz","date":"2024-01-15T10:00:00.000Z","note":"","type":"expense"}]"#,
            )
            .with_value(BUDGETS_KEY, r#"{"Luz":50,"Agua":0}"#),
    );
    let mut store = TransactionStore::with_storage(storage.clone());
    store.initialize().unwrap();

    let legacy = store.get("1700000000000").unwrap().clone();
    assert_eq!(legacy.amount, dec!(42.35));
    assert_eq!(legacy.date, Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap());
    assert_eq!(legacy.note.as_deref(), Some(""));
    assert_eq!(legacy.kind, TransactionKind::Expense);
    assert_eq!(store.budgets().len(), 1);
    assert_eq!(store.budget_limit("Luz"), Some(dec!(50)));

    // Rewriting in the new format keeps the old record intact.
    store.add_transaction(expense("Agua", dec!(12)));
    store.flush().unwrap();
    drop(store);

    let mut reloaded = TransactionStore::with_storage(storage);
    reloaded.initialize().unwrap();
    assert_eq!(reloaded.len(), 2);
    assert_eq!(reloaded.get("1700000000000"), Some(&legacy));
    assert_eq!(reloaded.budget_limit("Agua"), None);
}

#[test]
fn test_write_failure_is_observable() {
    let (mut store, storage) = memory_store();
    storage.set_fail_writes(true);
    store.add_transaction(expense("Comida", dec!(10)));

    let err = store.flush().unwrap_err();
    assert!(matches!(err, PersistenceError::Write { ref key, .. } if key == TRANSACTIONS_KEY));
    // In-memory state stays authoritative.
    assert_eq!(store.len(), 1);

    let status = store.persist_status();
    assert_eq!(status.failures, 1);
    assert!(status.current_failure().is_some());

    // A later successful write clears the current failure.
    storage.set_fail_writes(false);
    store.set_category_budget("Comida", dec!(50));
    store.flush().unwrap();
    let status = store.persist_status();
    assert!(status.current_failure().is_none());
    assert_eq!(status.failures, 1);
    assert!(storage.peek(TRANSACTIONS_KEY).unwrap().contains("Comida"));
}

/// Panics on the first `set`, then behaves like [`MemoryStorage`].
#[derive(Default)]
struct PanicOnceStorage {
    inner: MemoryStorage,
    panicked: std::sync::atomic::AtomicBool,
}

impl KeyValueStorage for PanicOnceStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key)
    }

    #[allow(clippy::panic)]
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if !self.panicked.swap(true, std::sync::atomic::Ordering::SeqCst) {
            panic!("disk on fire");
        }
        self.inner.set(key, value)
    }
}

#[test]
fn test_backend_panic_is_a_write_failure() {
    let storage = Arc::new(PanicOnceStorage::default());
    let mut store = TransactionStore::with_storage(storage.clone());
    store.initialize().unwrap();

    store.add_transaction(expense("Ocio", dec!(15)));
    let err = store.flush().unwrap_err();
    assert!(matches!(err, PersistenceError::Write { ref reason, .. } if reason.contains("disk on fire")));

    // The writer keeps serving later snapshots.
    store.add_transaction(expense("Ocio", dec!(5)));
    store.flush().unwrap();
    assert_eq!(store.persist_status().failures, 1);
    assert!(storage.inner.peek(TRANSACTIONS_KEY).unwrap().contains("Ocio"));
}

#[test]
fn test_latest_snapshot_wins() {
    let (mut store, storage) = memory_store();
    for i in 1..=50 {
        store.add_transaction(expense("Otros", Decimal::from(i)));
    }
    store.flush().unwrap();
    let stored: Vec<Transaction> =
        serde_json::from_str(&storage.peek(TRANSACTIONS_KEY).unwrap()).unwrap();
    assert_eq!(stored.len(), 50);
    assert_eq!(stored, store.transactions());
    assert_eq!(store.persist_status().completed, 50);
}

#[test]
fn test_drop_drains_pending_writes() {
    let storage = Arc::new(MemoryStorage::new());
    {
        let mut store = TransactionStore::with_storage(storage.clone());
        store.initialize().unwrap();
        store.add_transaction(expense("Casa", dec!(99)));
    }
    assert!(storage.peek(TRANSACTIONS_KEY).unwrap().contains("Casa"));
}

#[test]
fn test_roundtrip_through_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.db");
    let date = Utc.with_ymd_and_hms(2026, 10, 3, 18, 45, 12).unwrap();

    let (saved_txns, saved_budgets) = {
        let mut store = TransactionStore::new(SqliteStorage::open(&path).unwrap());
        store.initialize().unwrap();
        store.add_transaction(
            expense("Delivery", dec!(23.40))
                .with_date(date)
                .with_note("pizza, \"extra\" cheese"),
        );
        store.add_transaction(income("Hustle", dec!(0.01)).with_date(date));
        store.set_category_budget("Delivery", dec!(60.5));
        store.flush().unwrap();
        (store.transactions().to_vec(), store.budgets().clone())
    };

    let mut reopened = TransactionStore::new(SqliteStorage::open(&path).unwrap());
    reopened.initialize().unwrap();
    assert_eq!(reopened.transactions(), saved_txns.as_slice());
    assert_eq!(reopened.budgets(), &saved_budgets);
}

#[test]
fn test_encode_roundtrip() {
    let (mut store, _) = memory_store();
    store.add_transaction(expense("Salud", dec!(45.99)).with_note("farmacia"));
    store.add_transaction(income("Devuelta", dec!(3)));
    store.set_category_budget("Salud", dec!(100));

    let (transactions, budgets) = encode(store.transactions(), store.budgets()).unwrap();
    let decoded: Vec<Transaction> = serde_json::from_str(&transactions).unwrap();
    let decoded_budgets: Budgets = serde_json::from_str(&budgets).unwrap();
    assert_eq!(decoded, store.transactions());
    assert_eq!(&decoded_budgets, store.budgets());
}
