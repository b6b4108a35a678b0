//! Static mapping of path prefixes to the roles allowed behind them

use crate::error::AccessError;
use crate::role::UserRole;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// One protected prefix and the roles allowed to enter it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteAccessRule {
    pub prefix: String,
    pub roles: BTreeSet<UserRole>,
}

impl RouteAccessRule {
    pub fn new(prefix: impl Into<String>, roles: impl IntoIterator<Item = UserRole>) -> Self {
        Self {
            prefix: prefix.into(),
            roles: roles.into_iter().collect(),
        }
    }

    pub fn allows(&self, role: UserRole) -> bool {
        self.roles.contains(&role)
    }
}

/// Ordered route access rules. The first rule whose prefix matches decides.
///
/// Built once at startup and never mutated. Construction rejects rules that
/// could never match because an earlier, shorter prefix already covers them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteAccessTable {
    rules: Vec<RouteAccessRule>,
}

impl RouteAccessTable {
    /// Validate and build a table from rules ordered most-specific first
    pub fn new(rules: Vec<RouteAccessRule>) -> Result<Self, AccessError> {
        let mut seen = HashSet::new();

        for (index, rule) in rules.iter().enumerate() {
            if !rule.prefix.starts_with('/') {
                return Err(AccessError::InvalidPrefix {
                    prefix: rule.prefix.clone(),
                });
            }
            if rule.roles.is_empty() {
                return Err(AccessError::EmptyRoleSet {
                    prefix: rule.prefix.clone(),
                });
            }
            if !seen.insert(rule.prefix.as_str()) {
                return Err(AccessError::DuplicatePrefix {
                    prefix: rule.prefix.clone(),
                });
            }
            if let Some(earlier) = rules[..index]
                .iter()
                .find(|earlier| rule.prefix.starts_with(&earlier.prefix))
            {
                return Err(AccessError::Shadowed {
                    shadowed: rule.prefix.clone(),
                    by: earlier.prefix.clone(),
                });
            }
        }

        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[RouteAccessRule] {
        &self.rules
    }

    /// First rule whose prefix the path starts with
    pub fn matching_rule(&self, path: &str) -> Option<&RouteAccessRule> {
        self.rules.iter().find(|rule| path.starts_with(&rule.prefix))
    }

    /// Whether `role` may enter `path`. Paths no rule covers are open to any
    /// authenticated role.
    pub fn has_route_access(&self, path: &str, role: UserRole) -> bool {
        self.matching_rule(path).is_none_or(|rule| rule.allows(role))
    }
}

impl Default for RouteAccessTable {
    fn default() -> Self {
        use UserRole::{
            Admin, Alumni, Employer, Professor, Student, SuperAdmin, UniversityStaff,
        };

        Self {
            rules: vec![
                RouteAccessRule::new("/dashboard/admin", [Admin, SuperAdmin]),
                RouteAccessRule::new("/dashboard/employer", [Employer, Admin, SuperAdmin]),
                RouteAccessRule::new(
                    "/dashboard/university",
                    [Professor, UniversityStaff, Admin, SuperAdmin],
                ),
                RouteAccessRule::new("/dashboard/student", [Student, Alumni, Admin, SuperAdmin]),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_is_valid() {
        let table = RouteAccessTable::default();
        assert_eq!(
            RouteAccessTable::new(table.rules().to_vec()).unwrap(),
            table
        );
    }

    #[test]
    fn test_first_matching_prefix_decides() {
        let table = RouteAccessTable::new(vec![
            RouteAccessRule::new("/dashboard/admin", [UserRole::Admin]),
            RouteAccessRule::new("/reports", [UserRole::Employer]),
        ])
        .unwrap();

        assert!(table.has_route_access("/dashboard/admin/users", UserRole::Admin));
        assert!(!table.has_route_access("/dashboard/admin", UserRole::Student));
        assert!(table.has_route_access("/reports/q1", UserRole::Employer));
        assert!(!table.has_route_access("/reports/q1", UserRole::Admin));
    }

    #[test]
    fn test_unmatched_path_is_open() {
        let table = RouteAccessTable::default();
        for role in UserRole::ALL {
            assert!(table.has_route_access("/dashboard", role));
            assert!(table.has_route_access("/profile/settings", role));
        }
    }

    #[test]
    fn test_access_matches_allowed_set_for_every_role() {
        let table = RouteAccessTable::default();
        for rule in table.rules() {
            let path = format!("{}/overview", rule.prefix);
            for role in UserRole::ALL {
                assert_eq!(
                    table.has_route_access(&path, role),
                    rule.roles.contains(&role),
                    "{path} as {role}"
                );
            }
        }
    }

    #[test]
    fn test_rejects_empty_role_set() {
        let err = RouteAccessTable::new(vec![RouteAccessRule::new("/jobs", Vec::new())]).unwrap_err();
        assert_eq!(
            err,
            AccessError::EmptyRoleSet {
                prefix: "/jobs".to_string()
            }
        );
    }

    #[test]
    fn test_rejects_shadowed_prefix() {
        let err = RouteAccessTable::new(vec![
            RouteAccessRule::new("/dashboard", [UserRole::Student]),
            RouteAccessRule::new("/dashboard/admin", [UserRole::Admin]),
        ])
        .unwrap_err();

        assert_eq!(
            err,
            AccessError::Shadowed {
                shadowed: "/dashboard/admin".to_string(),
                by: "/dashboard".to_string(),
            }
        );
    }

    #[test]
    fn test_more_specific_first_is_accepted() {
        let table = RouteAccessTable::new(vec![
            RouteAccessRule::new("/dashboard/admin", [UserRole::Admin]),
            RouteAccessRule::new("/dashboard", [UserRole::Student, UserRole::Admin]),
        ])
        .unwrap();

        assert!(table.has_route_access("/dashboard/admin", UserRole::Admin));
        assert!(!table.has_route_access("/dashboard/admin", UserRole::Student));
        assert!(table.has_route_access("/dashboard/jobs", UserRole::Student));
    }

    #[test]
    fn test_rejects_duplicates_and_relative_prefixes() {
        assert!(matches!(
            RouteAccessTable::new(vec![
                RouteAccessRule::new("/a", [UserRole::Admin]),
                RouteAccessRule::new("/a", [UserRole::Student]),
            ]),
            Err(AccessError::DuplicatePrefix { .. })
        ));
        assert!(matches!(
            RouteAccessTable::new(vec![RouteAccessRule::new("a", [UserRole::Admin])]),
            Err(AccessError::InvalidPrefix { .. })
        ));
    }
}
