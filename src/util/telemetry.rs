//! Structured logging setup for services embedding the resource mapper.

use tracing_subscriber::EnvFilter;

/// Filter applied when `RUST_LOG` is unset: engine lifecycle events at `info`.
pub const DEFAULT_LOG_FILTER: &str = "prometheus_resource_mapper=info";

/// Install a fmt subscriber filtered by `RUST_LOG`, falling back to
/// [`DEFAULT_LOG_FILTER`]. Does nothing if the host already installed one.
pub fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
