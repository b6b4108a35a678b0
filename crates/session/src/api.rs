//! Backend operations the session depends on

use async_trait::async_trait;
use portal_core::CurrentUser;
use portal_http::client::{AuthClient, ClientError};
use portal_http::types::{LoginResponse, RefreshResponse};

#[async_trait]
pub trait SessionApi: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ClientError>;
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse, ClientError>;
    async fn fetch_profile(&self) -> Result<CurrentUser, ClientError>;

    /// Bearer token attached to subsequent requests
    fn set_bearer(&self, token: Option<String>);
}

#[async_trait]
impl SessionApi for AuthClient {
    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ClientError> {
        AuthClient::login(self, email, password).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse, ClientError> {
        AuthClient::refresh(self, refresh_token).await
    }

    async fn fetch_profile(&self) -> Result<CurrentUser, ClientError> {
        AuthClient::fetch_profile(self).await
    }

    fn set_bearer(&self, token: Option<String>) {
        AuthClient::set_bearer(self, token);
    }
}
