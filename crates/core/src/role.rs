//! User roles known to the platform

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role carried in a session token and on the cached user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Student,
    Alumni,
    Employer,
    Admin,
    SuperAdmin,
    Professor,
    UniversityStaff,
    Other,
}

impl UserRole {
    /// Every role, in declaration order
    pub const ALL: [Self; 8] = [
        Self::Student,
        Self::Alumni,
        Self::Employer,
        Self::Admin,
        Self::SuperAdmin,
        Self::Professor,
        Self::UniversityStaff,
        Self::Other,
    ];

    /// Wire name of the role
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Student => "STUDENT",
            Self::Alumni => "ALUMNI",
            Self::Employer => "EMPLOYER",
            Self::Admin => "ADMIN",
            Self::SuperAdmin => "SUPER_ADMIN",
            Self::Professor => "PROFESSOR",
            Self::UniversityStaff => "UNIVERSITY_STAFF",
            Self::Other => "OTHER",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role name outside the known set
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for UserRole {
    type Err = UnknownRole;

    /// Case-insensitive; accepts `-` or space in place of `_`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == normalized)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}
