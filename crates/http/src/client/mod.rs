//! HTTP client for the backend's `/auth` endpoints

pub mod auth;
pub mod error;

pub use error::ClientError;

use reqwest::{Client, Method, RequestBuilder, header};
use serde::de::DeserializeOwned;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Talks to the backend on behalf of one signed-in session
///
/// Clones share the bearer token, so a refresh applied through one handle is
/// used by every other.
#[derive(Clone)]
pub struct AuthClient {
    http: Client,
    base_url: String,
    bearer: Arc<RwLock<Option<String>>>,
}

impl AuthClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::builder().base_url(base_url).build()
    }

    pub fn builder() -> AuthClientBuilder {
        AuthClientBuilder::default()
    }

    /// Base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Token sent as `Authorization: Bearer`; `None` sends no header
    pub fn set_bearer(&self, token: Option<String>) {
        *self.bearer.write().unwrap_or_else(PoisonError::into_inner) = token;
    }

    pub fn bearer(&self) -> Option<String> {
        self.bearer
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn endpoint(&self, method: Method, path: &str) -> RequestBuilder {
        let request = self
            .http
            .request(method, format!("{}{path}", self.base_url));
        match self.bearer() {
            Some(token) => request.header(header::AUTHORIZATION, format!("Bearer {token}")),
            None => request,
        }
    }

    /// Send and decode a JSON body; non-2xx statuses map through [`ClientError::from_status`]
    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| status.to_string());
            return Err(ClientError::from_status(status, message));
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[derive(Default)]
pub struct AuthClientBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl AuthClientBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Whole-request timeout, 15 s unless set
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn build(self) -> Result<AuthClient, ClientError> {
        let Some(base_url) = self.base_url else {
            return Err(ClientError::Configuration("base_url is required".into()));
        };

        let http = Client::builder()
            .timeout(self.timeout.unwrap_or(DEFAULT_TIMEOUT))
            .user_agent(
                self.user_agent
                    .unwrap_or_else(|| concat!("portal-session/", env!("CARGO_PKG_VERSION")).into()),
            )
            .build()?;

        Ok(AuthClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            bearer: Arc::new(RwLock::new(None)),
        })
    }
}
