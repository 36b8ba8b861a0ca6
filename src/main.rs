use anyhow::{Context, Result};

use pocket_ledger::config::Config;
use pocket_ledger::storage::SqliteStorage;
use pocket_ledger::{cli, init_tracing, TransactionStore};

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let config = Config::from_env()?;
    init_tracing(config.log_filter.as_deref());

    config.ensure_data_dir()?;
    let db_path = config.database_path();
    let storage = SqliteStorage::open(&db_path)
        .with_context(|| format!("Failed to open ledger: {}", db_path.display()))?;

    let mut store = TransactionStore::new(storage);
    if let Err(e) = store.initialize() {
        eprintln!("Warning: {:#}", anyhow::Error::from(e));
    }

    let mut stdout = std::io::stdout().lock();
    let result = cli::run(&args, &mut store, &mut stdout);
    let flushed = store.flush().context("Failed to save ledger");
    result?;
    flushed
}
