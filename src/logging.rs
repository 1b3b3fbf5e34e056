//! Environment-aware structured logging for workflow operations.
//!
//! Console output is human-readable in development and JSON when
//! `PERDIN_LOG_FORMAT=json`, so aggregators can index ticket and step
//! fields emitted by the orchestration layer.

use std::sync::OnceLock;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize the global tracing subscriber. Safe to call more than once;
/// subsequent calls are no-ops, and an already-installed subscriber (for
/// example from an embedding web server) is left in place.
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_log_level()));

        let json_output = std::env::var("PERDIN_LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let result = if json_output {
            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_level(true)
                        .with_ansi(false)
                        .json(),
                )
                .with(filter)
                .try_init()
        } else {
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .try_init()
        };

        if result.is_err() {
            tracing::debug!(
                "Global tracing subscriber already initialized - continuing with existing subscriber"
            );
        }
    });
}

fn default_log_level() -> &'static str {
    match std::env::var("PERDIN_ENV").as_deref() {
        Ok("production") => "info",
        Ok("test") => "warn",
        _ => "debug",
    }
}
