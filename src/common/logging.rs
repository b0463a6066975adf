//! Logging and tracing configuration
//!
//! The library only emits `tracing` events. Applications that don't set up
//! their own subscriber can call [`init`].

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter: INFO for this crate, WARN for dependencies
const DEFAULT_FILTER: &str = "wpactrl=info,warn";

/// Initialize tracing with compact stderr output
///
/// Logs are controlled by the `RUST_LOG` environment variable.
/// Set `RUST_LOG=wpactrl=debug` to see every command and datagram.
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

/// Initialize tracing for tests, captured by the test harness
///
/// Safe to call from every test; only the first call installs a subscriber.
pub fn init_for_tests() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("wpactrl=debug")),
        )
        .with_test_writer()
        .try_init();
}
