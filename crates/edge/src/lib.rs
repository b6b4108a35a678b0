//! Portal edge server
//!
//! Serves the built page tree with the route gate deciding, per navigation,
//! whether a request passes or is redirected.

pub mod config;
pub mod error;
pub mod server;

pub use config::{ServerConfig, Settings};
pub use error::{EdgeError, Result};
