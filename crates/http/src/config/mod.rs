//! Edge gate configuration

pub mod gate;

pub use gate::{DashboardEntry, GateConfig};

use portal_core::AccessError;
use thiserror::Error;

/// Gate configuration that cannot be turned into a policy
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid route table: {0}")]
    Access(#[from] AccessError),

    #[error("`{field}` must be an absolute path, got `{value}`")]
    RelativePath { field: &'static str, value: String },

    #[error("`{field}` must not be empty")]
    Empty { field: &'static str },
}
