//! Initializes the `tracing` subscriber used by every module in
//! `wavephy-core`; the CLI only owns the choice of verbosity and format.

use tracing_subscriber::EnvFilter;

/// Installs a compact, human-readable subscriber at `level` (one of
/// "error", "warn", "info", "debug", "trace"), overridable with
/// `RUST_LOG`.
pub fn init(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
