//! Client error types

use thiserror::Error;

/// Failure talking to the backend auth endpoints
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connection, timeout or body transfer failure
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// 400, usually a malformed credential payload
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// 401: wrong credentials, or a bearer/refresh token the backend rejected
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Any other non-success status
    #[error("Backend error {status}: {message}")]
    Backend { status: u16, message: String },

    /// Response body did not match the expected shape
    #[error("Unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl ClientError {
    /// Create error from HTTP status code
    pub fn from_status(status: reqwest::StatusCode, message: String) -> Self {
        match status.as_u16() {
            400 => Self::BadRequest(message),
            401 => Self::Unauthorized(message),
            403 => Self::Forbidden(message),
            404 => Self::NotFound(message),
            status => Self::Backend { status, message },
        }
    }
}
