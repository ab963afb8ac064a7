//! Telemetry configuration from environment variables.

use serde::{Deserialize, Serialize};
use std::env;

/// Configuration for logging and metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Service name attached to every log line
    pub service_name: String,

    /// Log level filter directive (trace, debug, info, warn, error, or an `EnvFilter` string)
    pub log_level: String,

    /// Whether to write logs to the console at all
    pub console_output: bool,

    /// Whether to format logs as JSON
    pub json_logs: bool,

    /// Include source file and line in log lines
    pub with_source_location: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "room-chain-client".to_string(),
            log_level: "info".to_string(),
            console_output: true,
            json_logs: false,
            with_source_location: false,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `RC_SERVICE_NAME`: Service name (default: room-chain-client)
    /// - `RC_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `RC_CONSOLE_OUTPUT`: Enable console output (default: true)
    /// - `RC_JSON_LOGS`: Enable JSON logs (default: false, true in containers)
    /// - `RC_LOG_SOURCE`: Include file/line (default: false)
    pub fn from_env() -> Self {
        let is_container =
            env::var("KUBERNETES_SERVICE_HOST").is_ok() || env::var("DOCKER_CONTAINER").is_ok();

        Self {
            service_name: env::var("RC_SERVICE_NAME")
                .unwrap_or_else(|_| "room-chain-client".to_string()),

            log_level: env::var("RC_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),

            console_output: env::var("RC_CONSOLE_OUTPUT")
                .map(|v| parse_flag(&v))
                .unwrap_or(true),

            json_logs: env::var("RC_JSON_LOGS")
                .map(|v| parse_flag(&v))
                .unwrap_or(is_container),

            with_source_location: env::var("RC_LOG_SOURCE")
                .map(|v| parse_flag(&v))
                .unwrap_or(false),
        }
    }
}

/// `false`/`0`/`no`/`off` (any case) are false, anything else is true.
fn parse_flag(value: &str) -> bool {
    !matches!(
        value.trim().to_lowercase().as_str(),
        "false" | "0" | "no" | "off"
    )
}
