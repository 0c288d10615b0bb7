//! Tracing subscriber setup for hosts and binaries.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "chat_core=info";

/// Install a fmt subscriber filtered by `RUST_LOG` (default
/// `chat_core=info`). Returns `false` if a subscriber was already set.
pub fn init() -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}
