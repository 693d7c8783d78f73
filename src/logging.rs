//! Logging setup

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "aeryth=info";

/// Install the global `tracing` subscriber. Respects `RUST_LOG`.
///
/// Logs go to stderr so command output on stdout stays clean. Calling this
/// twice is harmless.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
