//! Tracing subscriber setup.
//!
//! Configures structured logging with:
//! - `EnvFilter` driven by `RUST_LOG` or the configured level
//! - Human-readable or JSON output

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::DEFAULT_LOG_FILTER;

/// Initialize tracing with the given filter directive.
///
/// This sets up:
/// - Console logging with target, thread id, and source location
/// - Filtering from `filter` (falls back to `info,chanhub=debug` if invalid)
/// - JSON lines instead of the pretty format when `json` is set
///
/// # Panics
///
/// Panics if tracing has already been initialized.
pub fn init_tracing(filter: &str, json: bool) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(true))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .init();
    }

    tracing::info!(json, "Tracing initialized");
}

/// Initialize tracing for tests (only logs errors).
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("error")
        .with_test_writer()
        .try_init();
}
