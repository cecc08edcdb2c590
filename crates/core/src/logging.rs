//! Logging infrastructure.
//!
//! This module initializes the tracing subscriber for structured logging.
//! All logs are emitted to stderr so that callers keep stdout for answers.
//!
//! The library crates only emit events; the embedding application is
//! expected to call [`init_logging`] once at startup.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{AppError, AppResult};

/// Initialize the tracing subscriber with stderr output.
///
/// This sets up structured logging with:
/// - Output to stderr
/// - Environment-based filtering (RUST_LOG or provided level)
/// - Optional ANSI color control
///
/// # Arguments
/// * `log_level` - Optional filter override (e.g., "debug", "crag_workflow=trace")
/// * `no_color` - Disable colored output
///
/// # Example
/// ```no_run
/// use crag_core::logging::init_logging;
///
/// init_logging(None, false).expect("Failed to initialize logging");
/// ```
pub fn init_logging(log_level: Option<&str>, no_color: bool) -> AppResult<()> {
    let filter_str = resolve_filter(log_level, std::env::var("RUST_LOG").ok());

    let env_filter = EnvFilter::try_new(&filter_str)
        .map_err(|e| AppError::Config(format!("Invalid log filter: {}", e)))?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_ansi(!no_color && supports_color());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| AppError::Config(format!("Failed to init logging: {}", e)))?;

    Ok(())
}

/// Pick the filter string: explicit level, then RUST_LOG, then "info".
fn resolve_filter(log_level: Option<&str>, env_value: Option<String>) -> String {
    match log_level {
        Some(level) => level.to_string(),
        None => env_value.unwrap_or_else(|| "info".to_string()),
    }
}

fn supports_color() -> bool {
    std::env::var("NO_COLOR").is_err()
}
