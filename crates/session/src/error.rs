//! Session error types

use portal_http::client::ClientError;
use thiserror::Error;

/// Failure reading or writing the persisted session
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Stored session is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors surfaced by the session manager
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Client(#[from] ClientError),

    /// The profile could not be fetched and no cached user exists
    #[error("Profile unavailable: {0}")]
    ProfileUnavailable(#[source] ClientError),

    #[error("No active session")]
    NotAuthenticated,
}

pub type SessionResult<T> = Result<T, SessionError>;
