//! Structured operational logging, independent of the plain-text
//! status/retry/cost-estimate protocol in `status.rs`.
//!
//! Always writes to stderr: stdout is reserved for matched records and the
//! final count.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let stderr_logs = fmt::Layer::new()
        .with_target(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_logs)
        .init();
}
