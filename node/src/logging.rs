//! # Structured Logging
//!
//! Sets up the `tracing` subscriber for the node binary. Output format is
//! chosen at the CLI ("pretty" for humans, "json" for log aggregation) and
//! filtering follows `RUST_LOG`, falling back to the given default when the
//! variable is unset.
//!
//! The library crate only emits `tracing` events; installing a subscriber
//! is the binary's job, and this is the one place it happens.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the global tracing subscriber. Call exactly once, early in
/// `main()`.
///
/// `format` accepts "json" (case-insensitive); anything else means
/// pretty-printed output.
pub fn init_logging(default_level: &str, format: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if format.eq_ignore_ascii_case("json") {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_target(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(true))
            .init();
    }

    tracing::debug!(format, "logging initialized");
}
