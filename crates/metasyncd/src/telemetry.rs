//! Logging initialization.
//!
//! Logs go to stderr so stdout carries only command output (the changed-file
//! summary, plan listings). `RUST_LOG` takes precedence over the configured
//! level.

use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber.
///
/// Call this once at startup, before any `tracing` events are emitted.
pub fn init(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
