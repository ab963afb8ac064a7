//! # Room-Chain Telemetry
//!
//! Logging and metrics shared by every client subsystem.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rc_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let _guard = init_telemetry(&TelemetryConfig::from_env())?;
//!     // Logs and metrics are now being collected
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `RC_SERVICE_NAME` | `room-chain-client` | Service name on log lines |
//! | `RC_LOG_LEVEL` | `info` | Log level filter (falls back to `RUST_LOG`) |
//! | `RC_JSON_LOGS` | `false` | JSON formatted logs |
//! | `RC_CONSOLE_OUTPUT` | `true` | Write logs to stdout |

#![allow(missing_docs)]

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::{build_filter, init_logging, LoggingHandle};
pub use metrics::{
    encode_metrics, register_metrics, HistogramTimer, MetricsHandle, COMMANDS, COMMAND_LATENCY,
    DECODE_FAILURES, ENTITIES_PRESENT, EVENTS_APPLIED, EVENTS_FORWARDED, LOGS_FETCHED,
    LOG_QUERY_DURATION, POLL_CYCLE_FAILURES, SELF_CORRECTIONS, WATERMARK,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Register metrics and install the logging subscriber.
///
/// Returns a guard that should be held for the lifetime of the application.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    // Metrics first so nothing logged during startup is missed by counters.
    let metrics_handle = register_metrics()?;
    let logging_handle = init_logging(config)?;

    Ok(TelemetryGuard {
        _logging: logging_handle,
        _metrics: metrics_handle,
    })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    _logging: LoggingHandle,
    _metrics: MetricsHandle,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!("Shutting down telemetry...");
    }
}
