//! Shared tracing functionality for Portal
//!
//! The subscriber setup lives behind the `tracing` feature so library crates
//! only pull in the `tracing` facade.

#[cfg(feature = "tracing")]
pub mod config;
#[cfg(feature = "tracing")]
pub mod init;

#[cfg(feature = "tracing")]
pub use config::{InstrumentationConfig, LogFormat};
#[cfg(feature = "tracing")]
pub use init::init_tracing;
