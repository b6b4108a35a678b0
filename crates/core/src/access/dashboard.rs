//! Canonical landing path per role

use crate::error::AccessError;
use crate::role::UserRole;
use std::collections::BTreeMap;

/// Generic dashboard root that unmapped roles land on
pub const DASHBOARD_ROOT: &str = "/dashboard";

/// Per-role canonical dashboards with a generic fallback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardRoutes {
    routes: BTreeMap<UserRole, String>,
    fallback: String,
}

impl DashboardRoutes {
    pub fn new(
        routes: impl IntoIterator<Item = (UserRole, String)>,
        fallback: impl Into<String>,
    ) -> Result<Self, AccessError> {
        let routes: BTreeMap<_, _> = routes.into_iter().collect();
        if let Some((role, path)) = routes.iter().find(|(_, path)| !path.starts_with('/')) {
            return Err(AccessError::InvalidDashboard {
                role: *role,
                path: path.clone(),
            });
        }

        Ok(Self {
            routes,
            fallback: fallback.into(),
        })
    }

    /// Landing path for `role`, or the generic root when the role has none
    pub fn resolve(&self, role: UserRole) -> &str {
        self.routes.get(&role).map_or(self.fallback.as_str(), String::as_str)
    }

    /// Path the generic root redirect applies to
    pub fn root(&self) -> &str {
        &self.fallback
    }
}

impl Default for DashboardRoutes {
    fn default() -> Self {
        let routes = [
            (UserRole::Student, "/dashboard/student"),
            (UserRole::Alumni, "/dashboard/student"),
            (UserRole::Employer, "/dashboard/employer"),
            (UserRole::Admin, "/dashboard/admin"),
            (UserRole::SuperAdmin, "/dashboard/admin"),
            (UserRole::Professor, "/dashboard/university"),
            (UserRole::UniversityStaff, "/dashboard/university"),
        ]
        .into_iter()
        .map(|(role, path)| (role, path.to_string()))
        .collect();

        Self {
            routes,
            fallback: DASHBOARD_ROOT.to_string(),
        }
    }
}
