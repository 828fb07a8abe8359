//! Logging Infrastructure
//!
//! Structured logging setup shared by the server binary and scheduled-job
//! drivers.

use tracing_subscriber::EnvFilter;

/// Initialize the logger, honoring `RUST_LOG` when set.
pub fn init_logger() {
    init_logger_with_level("info");
}

/// Initialize the logger with a fallback level for when `RUST_LOG` is unset.
pub fn init_logger_with_level(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(false)
        .init();
}
