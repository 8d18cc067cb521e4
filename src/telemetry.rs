//! Structured logging setup

use tracing::Level;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::TelemetryError;

/// Map a configured level name to a tracing level; unknown names mean INFO
pub fn parse_level(log_level: &str) -> Level {
    match log_level.trim().to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Install the global tracing subscriber
///
/// `RUST_LOG` directives take precedence over `log_level`. `format` is
/// `"json"` (default) or `"pretty"`/`"text"` for human-readable lines.
pub fn init_tracing(log_level: &str, format: &str) -> Result<(), TelemetryError> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(parse_level(log_level)).into())
        .from_env_lossy();

    match format.trim().to_lowercase().as_str() {
        "pretty" | "text" => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .try_init()
            .map_err(|e| TelemetryError::SubscriberInit(e.to_string())),
        _ => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .map_err(|e| TelemetryError::SubscriberInit(e.to_string())),
    }
}
