//! Serializable route gate configuration
//!
//! The page tree owns these lists: which prefixes are public, which are
//! protected, which roles may enter each protected prefix, and where each
//! role lands. The gate only consumes them.

use super::ConfigError;
use portal_core::access::DASHBOARD_ROOT;
use portal_core::{DashboardRoutes, RouteAccessRule, RouteAccessTable, UserRole};
use serde::{Deserialize, Serialize};

/// Canonical dashboard of one role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardEntry {
    pub role: UserRole,
    pub path: String,
}

/// Complete route gate configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Login page; unauthenticated visitors are sent here
    pub login_path: String,
    /// Page shown when the resolved role may not enter a route
    pub unauthorized_path: String,
    /// Generic dashboard root that redirects to the role's dashboard
    pub dashboard_root: String,
    /// Cookie mirroring the session token
    pub token_cookie: String,
    /// Cookie mirroring the cached user as JSON
    pub user_cookie: String,
    /// Prefixes reachable without a session. `/` only matches exactly.
    pub public_prefixes: Vec<String>,
    /// Prefixes that require a session
    pub protected_prefixes: Vec<String>,
    /// Prefixes of framework and static assets, always public
    pub asset_prefixes: Vec<String>,
    /// File extensions served without a session
    pub asset_extensions: Vec<String>,
    /// Ordered most-specific first; the first matching prefix decides
    pub access_rules: Vec<RouteAccessRule>,
    /// Per-role landing paths; unlisted roles land on `dashboard_root`
    pub dashboards: Vec<DashboardEntry>,
}

impl Default for GateConfig {
    fn default() -> Self {
        let defaults = DashboardRoutes::default();
        let dashboards = UserRole::ALL
            .into_iter()
            .filter_map(|role| {
                let path = defaults.resolve(role);
                (path != DASHBOARD_ROOT).then(|| DashboardEntry {
                    role,
                    path: path.to_string(),
                })
            })
            .collect();

        Self {
            login_path: "/login".to_string(),
            unauthorized_path: "/unauthorized".to_string(),
            dashboard_root: DASHBOARD_ROOT.to_string(),
            token_cookie: "token".to_string(),
            user_cookie: "user".to_string(),
            public_prefixes: strings(&[
                "/",
                "/login",
                "/register",
                "/forgot-password",
                "/reset-password",
                "/verify-email",
                "/unauthorized",
                "/about",
                "/contact",
                "/api/public",
            ]),
            protected_prefixes: strings(&[
                "/dashboard",
                "/profile",
                "/settings",
                "/messages",
                "/jobs/apply",
            ]),
            asset_prefixes: strings(&["/_next/", "/static/", "/assets/"]),
            asset_extensions: strings(&[
                "js", "css", "map", "png", "jpg", "jpeg", "gif", "svg", "ico", "webp", "woff",
                "woff2", "txt",
            ]),
            access_rules: RouteAccessTable::default().rules().to_vec(),
            dashboards,
        }
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(ToString::to_string).collect()
}

impl GateConfig {
    /// Validate the configuration and build the access table and dashboards
    pub(crate) fn validate(&self) -> Result<(RouteAccessTable, DashboardRoutes), ConfigError> {
        for (field, value) in [
            ("login_path", &self.login_path),
            ("unauthorized_path", &self.unauthorized_path),
            ("dashboard_root", &self.dashboard_root),
        ] {
            if !value.starts_with('/') {
                return Err(ConfigError::RelativePath {
                    field,
                    value: value.clone(),
                });
            }
        }
        for (field, value) in [
            ("token_cookie", &self.token_cookie),
            ("user_cookie", &self.user_cookie),
        ] {
            if value.is_empty() {
                return Err(ConfigError::Empty { field });
            }
        }
        if let Some(prefix) = self
            .public_prefixes
            .iter()
            .chain(&self.protected_prefixes)
            .find(|prefix| !prefix.starts_with('/'))
        {
            return Err(ConfigError::RelativePath {
                field: "route prefixes",
                value: prefix.clone(),
            });
        }

        let table = RouteAccessTable::new(self.access_rules.clone())?;
        let dashboards = DashboardRoutes::new(
            self.dashboards
                .iter()
                .map(|entry| (entry.role, entry.path.clone())),
            self.dashboard_root.clone(),
        )?;

        Ok((table, dashboards))
    }
}
