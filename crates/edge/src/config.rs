//! Configuration management for the portal edge server

use crate::Result;
use portal_http::GateConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Main edge configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// HTTP server configuration
    pub server: ServerConfig,

    /// Route gate in front of the page tree
    pub gate: GateConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind HTTP server
    pub bind_addr: SocketAddr,

    /// Built page tree served behind the gate
    pub static_dir: Option<PathBuf>,

    /// Seconds to wait for in-flight requests on shutdown
    pub shutdown_grace_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            static_dir: None,
            shutdown_grace_secs: 5,
        }
    }
}

impl Settings {
    /// Load the optional file, then `PORTAL_` environment variables
    ///
    /// Anything neither source sets keeps its default. Nested keys use `__`, e.g. `PORTAL_SERVER__BIND_ADDR` or
    /// `PORTAL_GATE__LOGIN_PATH`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or a value has the wrong shape
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix("PORTAL")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
