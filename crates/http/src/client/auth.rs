//! Authentication API client methods

use super::{AuthClient, ClientError};
use crate::types::{LoginRequest, LoginResponse, RefreshRequest, RefreshResponse};
use portal_core::CurrentUser;
use reqwest::Method;

impl AuthClient {
    /// Exchange credentials for an access token and the signed-in user
    pub async fn login(
        &self,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<LoginResponse, ClientError> {
        let request = self.endpoint(Method::POST, "/auth/login").json(&LoginRequest {
            email: email.into(),
            password: password.into(),
        });
        self.send_json(request).await
    }

    /// Trade a refresh token for a new access token
    pub async fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse, ClientError> {
        let request = self
            .endpoint(Method::POST, "/auth/refresh")
            .json(&RefreshRequest {
                refresh_token: refresh_token.to_string(),
            });
        self.send_json(request).await
    }

    /// Profile of the bearer's user
    pub async fn fetch_profile(&self) -> Result<CurrentUser, ClientError> {
        let request = self.endpoint(Method::GET, "/auth/me");
        self.send_json(request).await
    }
}
