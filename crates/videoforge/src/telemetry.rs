//! Tracing subscriber setup for the binary and for embedding callers.
//!
//! Library code logs through the `log` facade and opens `tracing` spans
//! around stages; [`init_tracing`] routes both into one `fmt` layer.

use thiserror::Error;
use tracing_log::LogTracer;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter};

/// Environment variable overriding the configured log filter.
pub const LOG_ENV: &str = "VIDEOFORGE_LOG";

#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter '{filter}': {message}")]
    InvalidFilter { filter: String, message: String },

    #[error("Logging is already initialized: {0}")]
    AlreadyInitialized(String),
}

/// Builds the filter from `VIDEOFORGE_LOG`, falling back to `fallback`
/// when the variable is unset or blank.
pub fn env_filter(fallback: &str) -> Result<EnvFilter, TelemetryError> {
    let directives = std::env::var(LOG_ENV)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string());

    EnvFilter::try_new(&directives).map_err(|e| TelemetryError::InvalidFilter {
        filter: directives.clone(),
        message: e.to_string(),
    })
}

/// Installs the global subscriber. `json` switches the output to one JSON
/// object per line with the current span's fields. Fails if a logger or
/// subscriber is already installed.
pub fn init_tracing(filter: &str, json: bool) -> Result<(), TelemetryError> {
    let filter = env_filter(filter)?;

    LogTracer::init().map_err(|e| TelemetryError::AlreadyInitialized(e.to_string()))?;

    let registry = tracing_subscriber::registry().with(filter);
    let installed = if json {
        tracing::subscriber::set_global_default(
            registry.with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false),
            ),
        )
    } else {
        tracing::subscriber::set_global_default(registry.with(fmt::layer().with_target(true)))
    };

    installed.map_err(|e| TelemetryError::AlreadyInitialized(e.to_string()))
}
