//! Client-side session for the portal
//!
//! Persists the token pair and the cached user, keeps the access token fresh
//! in the background and exposes the signed-in state to the rest of the
//! client through an injected [`SessionContext`] handle.

pub mod api;
pub mod config;
pub mod context;
pub mod error;
pub mod manager;
pub mod refresh;
pub mod store;

pub use api::SessionApi;
pub use config::RefreshConfig;
pub use context::{SessionAction, SessionContext, SessionState};
pub use error::{SessionError, SessionResult, StoreError};
pub use manager::SessionManager;
pub use refresh::{RefreshHandle, RefreshOutcome, RefreshScheduler};
pub use store::{FileStorage, MemoryStorage, StorageBackend, TokenPair, TokenStore};
