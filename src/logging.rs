use std::sync::Once;
use tracing_subscriber::{fmt, EnvFilter};

static TRACING_INIT: Once = Once::new();

pub const DEFAULT_FILTER: &str = "pocket_ledger=info";

/// Install the global subscriber, logging to stderr.
///
/// `filter` wins over `RUST_LOG`, which wins over [`DEFAULT_FILTER`].
/// Safe to call more than once.
pub fn init_tracing(filter: Option<&str>) {
    TRACING_INIT.call_once(|| {
        let filter = build_filter(filter);
        let _ = fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
        tracing::debug!("tracing initialized");
    });
}

fn build_filter(filter: Option<&str>) -> EnvFilter {
    filter
        .and_then(|f| EnvFilter::try_new(f).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}
