use crate::role::UserRole;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Cached projection of the authenticated identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    /// Role-specific profile fields
    #[serde(default = "empty_profile")]
    pub profile: Value,
}

impl CurrentUser {
    /// Copy of this user acting as `role`, with the profile re-derived for it
    #[must_use]
    pub fn with_role(&self, role: UserRole) -> Self {
        Self {
            role,
            profile: role_profile_template(role),
            ..self.clone()
        }
    }
}

fn empty_profile() -> Value {
    Value::Object(serde_json::Map::new())
}

/// Blank profile fields a user of `role` carries
pub fn role_profile_template(role: UserRole) -> Value {
    match role {
        UserRole::Student | UserRole::Alumni => json!({
            "university": null,
            "major": null,
            "graduationYear": null,
            "skills": [],
            "resumeUrl": null,
        }),
        UserRole::Employer => json!({
            "companyName": null,
            "industry": null,
            "companySize": null,
            "website": null,
        }),
        UserRole::Professor | UserRole::UniversityStaff => json!({
            "university": null,
            "department": null,
            "title": null,
        }),
        UserRole::Admin | UserRole::SuperAdmin => json!({
            "permissions": [],
        }),
        UserRole::Other => empty_profile(),
    }
}
