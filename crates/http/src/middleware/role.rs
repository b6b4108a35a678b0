//! Role resolution for protected navigations
//!
//! Two sources can carry the role: the token claims and the `user` cookie the
//! client mirrors next to the token. They are consulted in a fixed order and
//! the first usable answer wins.

use portal_core::{UserRole, decode_token_payload};
use serde_json::Value;
use std::borrow::Cow;

/// Where a resolved role came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleSource {
    Token,
    UserCookie,
}

/// Role decoded at the edge for a passing request
///
/// Nothing here is verified. Handlers may use it to pick a layout but must
/// leave authorization to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleHint {
    pub role: UserRole,
    pub user_id: Option<String>,
    pub source: RoleSource,
}

/// Outcome of role resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleResolution {
    Resolved(RoleHint),
    /// No source produced a role
    Missing,
    /// The user cookie is present but is not JSON
    InvalidSession,
}

/// Resolve the role of a request holding a token
///
/// | step | condition                           | result           |
/// |------|-------------------------------------|------------------|
/// | 1    | token claims carry a known role     | `Resolved`       |
/// | 2    | user cookie absent                  | `Missing`        |
/// | 3    | user cookie is not JSON             | `InvalidSession` |
/// | 4    | user cookie JSON has a known `role` | `Resolved`       |
/// | 5    | otherwise                           | `Missing`        |
pub fn resolve_role(token: &str, user_cookie: Option<&str>) -> RoleResolution {
    let payload = decode_token_payload(token);
    if let Some(role) = payload.role {
        return RoleResolution::Resolved(RoleHint {
            role,
            user_id: payload.user_id,
            source: RoleSource::Token,
        });
    }

    let Some(raw) = user_cookie else {
        return RoleResolution::Missing;
    };

    let decoded = urlencoding::decode(raw).unwrap_or(Cow::Borrowed(raw));
    let user: Value = match serde_json::from_str(&decoded) {
        Ok(user) => user,
        Err(err) => {
            debug!(error = %err, "User cookie is not valid JSON");
            return RoleResolution::InvalidSession;
        }
    };

    let role = user
        .get("role")
        .and_then(Value::as_str)
        .and_then(|role| role.parse::<UserRole>().ok());

    match role {
        Some(role) => RoleResolution::Resolved(RoleHint {
            role,
            user_id: cookie_user_id(&user),
            source: RoleSource::UserCookie,
        }),
        None => RoleResolution::Missing,
    }
}

fn cookie_user_id(user: &Value) -> Option<String> {
    ["id", "userId"]
        .into_iter()
        .filter_map(|key| user.get(key))
        .find_map(|id| match id {
            Value::String(id) => Some(id.clone()),
            Value::Number(id) => Some(id.to_string()),
            _ => None,
        })
}
