//! Route table validation errors

use crate::role::UserRole;

/// Errors raised while building a route access table
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize, thiserror::Error)]
pub enum AccessError {
    #[error("prefix `{prefix}` allows no roles")]
    EmptyRoleSet { prefix: String },

    #[error("prefix `{prefix}` must start with '/'")]
    InvalidPrefix { prefix: String },

    #[error("prefix `{prefix}` is listed more than once")]
    DuplicatePrefix { prefix: String },

    #[error("prefix `{shadowed}` is unreachable behind `{by}`")]
    Shadowed { shadowed: String, by: String },

    #[error("dashboard path for {role} must start with '/', got `{path}`")]
    InvalidDashboard { role: UserRole, path: String },
}
