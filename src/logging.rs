//! Logging initialization and configuration.
//!
//! Logs go to stderr; stdout carries `op` output.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when neither `RUST_LOG` nor an explicit level is set.
pub const DEFAULT_FILTER: &str = "op_driver=info";

fn filter_for(level: Option<&str>) -> EnvFilter {
    let parsed = match level {
        Some(level) => EnvFilter::try_new(level).ok(),
        None => EnvFilter::try_from_default_env().ok(),
    };
    parsed.unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

/// Initialize the logging system.
///
/// Uses the `RUST_LOG` environment variable for filtering. If not set,
/// defaults to `op_driver=info`.
///
/// # Panics
///
/// Panics if called more than once, or if another tracing subscriber
/// has already been set.
pub fn init() {
    init_with_filter(None);
}

/// Initialize the logging system with an explicit filter directive.
///
/// An unparsable directive falls back to the default filter.
///
/// # Panics
///
/// Panics if a tracing subscriber has already been set.
pub fn init_with_filter(level: Option<&str>) {
    tracing_subscriber::registry()
        .with(filter_for(level))
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(std::io::stderr),
        )
        .init();
}

/// Try to initialize the logging system.
///
/// Returns `Ok(())` if successful, or `Err` if logging has already been
/// initialized.
pub fn try_init() -> Result<(), tracing_subscriber::util::TryInitError> {
    tracing_subscriber::registry()
        .with(filter_for(None))
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(std::io::stderr),
        )
        .try_init()
}
