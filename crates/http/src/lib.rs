//! Portal HTTP module providing the edge route gate and the backend client
//!
//! The `server` feature carries the axum middleware that decides, before a page
//! renders, whether a navigation passes, goes to login, goes to the
//! unauthorized page, or lands on the role's dashboard. The `client` feature
//! carries the reqwest client for the login, refresh and profile endpoints.

#[cfg(feature = "server")]
#[macro_use]
extern crate tracing;

pub mod types;

#[cfg(feature = "server")]
pub mod config;
#[cfg(feature = "server")]
pub mod middleware;

#[cfg(feature = "client")]
pub mod client;

#[cfg(feature = "server")]
pub use config::{ConfigError, GateConfig};
#[cfg(feature = "server")]
pub use middleware::gate::{GatePolicy, route_gate_middleware, with_route_gate};

// Re-export commonly used types
#[cfg(feature = "server")]
pub use axum::{Router, response};
