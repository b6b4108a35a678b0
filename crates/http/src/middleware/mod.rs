//! Middleware components for HTTP request processing

pub mod cookies;
pub mod gate;
pub mod path;
pub mod role;

pub use gate::{
    GateDecision, GatePolicy, GateRequest, LoginError, RedirectReason, route_gate_middleware,
    with_route_gate,
};
pub use path::canonical_path;
pub use role::{RoleHint, RoleResolution, RoleSource, resolve_role};
