//! Configuration for tracing and instrumentation

use serde::{Deserialize, Serialize};

/// Output format of the fmt layer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Main instrumentation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentationConfig {
    /// Service name recorded on startup
    pub service_name: String,
    /// Service version
    pub service_version: String,
    /// Log level filter (e.g., "info", "debug", "portal_http=trace")
    pub log_level: String,
    /// Human-readable or JSON lines
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for InstrumentationConfig {
    fn default() -> Self {
        Self {
            service_name: "portal".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            log_level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl InstrumentationConfig {
    /// Create configuration from environment variables
    ///
    /// Supports the following environment variables:
    /// - `SERVICE_NAME`: Service name
    /// - `RUST_LOG`: Log level filter
    /// - `PORTAL_LOG_FORMAT`: `json` for JSON lines, anything else for pretty output
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let service_name = std::env::var("SERVICE_NAME").unwrap_or(defaults.service_name);
        let log_level = std::env::var("RUST_LOG").unwrap_or(defaults.log_level);
        let format = match std::env::var("PORTAL_LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Self {
            service_name,
            service_version: defaults.service_version,
            log_level,
            format,
        }
    }
}
