//! Route gate evaluated in front of every page
//!
//! [`GatePolicy::evaluate`] is a pure function of the request path, the
//! credentials it carries and the current time. [`route_gate_middleware`]
//! extracts those from an axum request and turns the decision into either the
//! inner response or a `307 Temporary Redirect`.

use super::cookies::{bearer_token, cookie_value};
use super::path::canonical_path;
use super::role::{RoleHint, RoleResolution, resolve_role};
use crate::config::{ConfigError, GateConfig};
use axum::{
    Router,
    extract::{Request, State},
    http::HeaderMap,
    middleware::{self, Next},
    response::{IntoResponse, Redirect, Response},
};
use portal_core::{DashboardRoutes, RouteAccessTable, UserRole, is_expired};
use std::fmt;
use std::sync::Arc;

/// Reason carried in the `error` query parameter of a login redirect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginError {
    AuthenticationRequired,
    InvalidSession,
    SessionExpired,
}

impl LoginError {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AuthenticationRequired => "authentication_required",
            Self::InvalidSession => "invalid_session",
            Self::SessionExpired => "session_expired",
        }
    }
}

impl fmt::Display for LoginError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a request was redirected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectReason {
    Login(LoginError),
    Unauthorized(UserRole),
    Dashboard(UserRole),
    /// The path could not be normalized
    MalformedPath,
}

/// Outcome of evaluating one navigation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Serve the request. Protected routes carry the role that let them through.
    Pass(Option<RoleHint>),
    Redirect {
        reason: RedirectReason,
        location: String,
    },
}

impl GateDecision {
    pub fn location(&self) -> Option<&str> {
        match self {
            Self::Pass(_) => None,
            Self::Redirect { location, .. } => Some(location),
        }
    }
}

/// Credentials and path of one navigation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GateRequest {
    pub path: String,
    pub token: Option<String>,
    pub user_cookie: Option<String>,
}

impl GateRequest {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_user_cookie(mut self, user: impl Into<String>) -> Self {
        self.user_cookie = Some(user.into());
        self
    }
}

/// Validated gate configuration
#[derive(Debug, Clone)]
pub struct GatePolicy {
    login_path: String,
    unauthorized_path: String,
    token_cookie: String,
    user_cookie: String,
    public_prefixes: Vec<String>,
    protected_prefixes: Vec<String>,
    asset_prefixes: Vec<String>,
    asset_extensions: Vec<String>,
    access: RouteAccessTable,
    dashboards: DashboardRoutes,
}

impl TryFrom<GateConfig> for GatePolicy {
    type Error = ConfigError;

    fn try_from(config: GateConfig) -> Result<Self, Self::Error> {
        Self::new(config)
    }
}

impl GatePolicy {
    pub fn new(config: GateConfig) -> Result<Self, ConfigError> {
        let (access, dashboards) = config.validate()?;

        Ok(Self {
            login_path: config.login_path,
            unauthorized_path: config.unauthorized_path,
            token_cookie: config.token_cookie,
            user_cookie: config.user_cookie,
            public_prefixes: config.public_prefixes,
            protected_prefixes: config.protected_prefixes,
            asset_prefixes: config.asset_prefixes,
            asset_extensions: config
                .asset_extensions
                .into_iter()
                .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            access,
            dashboards,
        })
    }

    pub fn access_table(&self) -> &RouteAccessTable {
        &self.access
    }

    pub fn dashboards(&self) -> &DashboardRoutes {
        &self.dashboards
    }

    /// Public pages and static assets
    pub fn is_public(&self, path: &str) -> bool {
        self.is_asset(path)
            || self.public_prefixes.iter().any(|prefix| {
                if prefix == "/" {
                    path == "/"
                } else {
                    path.starts_with(prefix.as_str())
                }
            })
    }

    pub fn is_protected(&self, path: &str) -> bool {
        self.protected_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }

    fn is_asset(&self, path: &str) -> bool {
        if self
            .asset_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
        {
            return true;
        }

        path.rsplit('/')
            .next()
            .and_then(|file| file.rsplit_once('.'))
            .is_some_and(|(stem, ext)| {
                !stem.is_empty()
                    && self
                        .asset_extensions
                        .iter()
                        .any(|known| known.eq_ignore_ascii_case(ext))
            })
    }

    /// Pull the path and credentials out of a request
    ///
    /// The path is normalized with [`canonical_path`] so it matches the file
    /// that will be served; `None` when that fails. The token cookie wins over
    /// an `Authorization: Bearer` header.
    pub fn extract(&self, raw_path: &str, headers: &HeaderMap) -> Option<GateRequest> {
        Some(GateRequest {
            path: canonical_path(raw_path)?,
            token: cookie_value(headers, &self.token_cookie)
                .or_else(|| bearer_token(headers))
                .map(str::to_string),
            user_cookie: cookie_value(headers, &self.user_cookie).map(str::to_string),
        })
    }

    /// Decide what happens to a navigation at time `now` (epoch seconds)
    pub fn evaluate(&self, request: &GateRequest, now: i64) -> GateDecision {
        let path = request.path.as_str();

        if self.is_public(path) {
            if path == self.login_path
                && let Some(token) = request.token.as_deref()
                && !is_expired(token, now)
                && let RoleResolution::Resolved(hint) =
                    resolve_role(token, request.user_cookie.as_deref())
            {
                return self.dashboard_redirect(hint.role);
            }
            return GateDecision::Pass(None);
        }

        if !self.is_protected(path) {
            return GateDecision::Pass(None);
        }

        let Some(token) = request.token.as_deref() else {
            return self.login_redirect(path, LoginError::AuthenticationRequired);
        };

        let hint = match resolve_role(token, request.user_cookie.as_deref()) {
            RoleResolution::Resolved(hint) => hint,
            RoleResolution::Missing => {
                return self.login_redirect(path, LoginError::SessionExpired);
            }
            RoleResolution::InvalidSession => {
                return self.login_redirect(path, LoginError::InvalidSession);
            }
        };

        if !self.access.has_route_access(path, hint.role) {
            return GateDecision::Redirect {
                reason: RedirectReason::Unauthorized(hint.role),
                location: with_query(
                    &self.unauthorized_path,
                    &[("attempted", path), ("role", hint.role.as_str())],
                ),
            };
        }

        if path == self.dashboards.root() && self.dashboards.resolve(hint.role) != path {
            return self.dashboard_redirect(hint.role);
        }

        GateDecision::Pass(Some(hint))
    }

    fn login_redirect(&self, path: &str, error: LoginError) -> GateDecision {
        GateDecision::Redirect {
            reason: RedirectReason::Login(error),
            location: with_query(
                &self.login_path,
                &[("redirect", path), ("error", error.as_str())],
            ),
        }
    }

    fn dashboard_redirect(&self, role: UserRole) -> GateDecision {
        GateDecision::Redirect {
            reason: RedirectReason::Dashboard(role),
            location: self.dashboards.resolve(role).to_string(),
        }
    }
}

/// Append percent-encoded query parameters, leaving `/` readable
fn with_query(path: &str, params: &[(&str, &str)]) -> String {
    let query = params
        .iter()
        .map(|(key, value)| format!("{key}={}", urlencoding::encode(value).replace("%2F", "/")))
        .collect::<Vec<_>>()
        .join("&");
    format!("{path}?{query}")
}

/// Axum middleware applying a [`GatePolicy`]
pub async fn route_gate_middleware(
    State(policy): State<Arc<GatePolicy>>,
    mut req: Request,
    next: Next,
) -> Response {
    let (path, decision) = match policy.extract(req.uri().path(), req.headers()) {
        Some(request) => {
            let decision = policy.evaluate(&request, chrono::Utc::now().timestamp());
            (request.path, decision)
        }
        None => (
            req.uri().path().to_string(),
            GateDecision::Redirect {
                reason: RedirectReason::MalformedPath,
                location: "/".to_string(),
            },
        ),
    };

    match decision {
        GateDecision::Pass(hint) => {
            debug!(%path, role = ?hint.as_ref().map(|h| h.role), "Gate pass");
            if let Some(hint) = hint {
                req.extensions_mut().insert(hint);
            }
            next.run(req).await
        }
        GateDecision::Redirect { reason, location } => {
            debug!(%path, ?reason, %location, "Gate redirect");
            Redirect::temporary(&location).into_response()
        }
    }
}

/// Put the route gate in front of every route of `router`
pub fn with_route_gate<S>(router: Router<S>, policy: Arc<GatePolicy>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(middleware::from_fn_with_state(policy, route_gate_middleware))
}
