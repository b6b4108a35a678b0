//! Portal core types and utilities
//!
//! Roles, advisory token claim decoding, the static route access table and the
//! cached current-user projection shared by the edge gate and the client session.

pub mod access;
pub mod error;
pub mod role;
pub mod token;
pub mod tracing;
pub mod user;

pub use access::{DashboardRoutes, RouteAccessRule, RouteAccessTable};
pub use error::AccessError;
pub use role::UserRole;
pub use token::{
    EXPIRY_WINDOW_SECS, TokenPayload, decode_expiry, decode_token_payload, is_expired,
    is_expiring_soon,
};
pub use user::{CurrentUser, role_profile_template};
