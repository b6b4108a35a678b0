//! Advisory decoding of session token claims
//!
//! The payload segment of a session token is read without checking its
//! signature. The result is a routing hint for the edge gate and the refresh
//! scheduler; authorization decisions that matter are re-verified by the
//! backend on every request.

use crate::role::UserRole;
use base64::Engine;
use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use serde_json::{Map, Value};

/// Seconds before `exp` at which a token counts as expiring soon
pub const EXPIRY_WINDOW_SECS: i64 = 300;

/// Claims the gate cares about. All fields are absent when decoding fails.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenPayload {
    pub role: Option<UserRole>,
    pub user_id: Option<String>,
    pub exp: Option<i64>,
}

impl TokenPayload {
    /// Whether decoding produced nothing usable
    pub fn is_empty(&self) -> bool {
        self.role.is_none() && self.user_id.is_none() && self.exp.is_none()
    }
}

/// Decode the role, user id and expiry embedded in a session token.
///
/// Never fails: a token that is not three dot-separated segments, whose
/// payload is not base64url, or whose payload is not a JSON object yields an
/// empty [`TokenPayload`].
pub fn decode_token_payload(token: &str) -> TokenPayload {
    let Some(claims) = decode_claims(token) else {
        return TokenPayload::default();
    };

    TokenPayload {
        role: claims
            .get("role")
            .and_then(Value::as_str)
            .and_then(|role| role.parse().ok()),
        user_id: ["userId", "id", "sub"]
            .into_iter()
            .filter_map(|key| claims.get(key))
            .find_map(id_string),
        exp: claims.get("exp").and_then(numeric_date),
    }
}

/// Expiry (epoch seconds) of a token, if it can be decoded
pub fn decode_expiry(token: &str) -> Option<i64> {
    decode_token_payload(token).exp
}

/// Whether the token expires within `window_secs` of `now`.
///
/// An undecodable expiry counts as expiring so the caller refreshes instead of
/// carrying on with a session it cannot reason about.
pub fn is_expiring_soon(token: &str, now: i64, window_secs: i64) -> bool {
    decode_expiry(token).is_none_or(|exp| exp.saturating_sub(now) < window_secs)
}

/// Whether the token's `exp` has passed. Tokens without `exp` never expire here.
pub fn is_expired(token: &str, now: i64) -> bool {
    decode_expiry(token).is_some_and(|exp| exp <= now)
}

fn decode_claims(token: &str) -> Option<Map<String, Value>> {
    let mut segments = token.trim().split('.');
    let (Some(_header), Some(payload), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        tracing::trace!("token does not have three segments");
        return None;
    };

    let payload = payload.trim_end_matches('=');
    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .or_else(|_| STANDARD_NO_PAD.decode(payload))
        .map_err(|e| tracing::trace!("token payload is not base64: {e}"))
        .ok()?;

    serde_json::from_slice(&bytes)
        .map_err(|e| tracing::trace!("token payload is not a JSON object: {e}"))
        .ok()
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation)]
fn numeric_date(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f.floor() as i64))
}
