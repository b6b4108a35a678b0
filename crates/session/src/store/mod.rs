//! Persisted session tokens and cached user

mod backend;

pub use backend::{FileStorage, MemoryStorage, StorageBackend, StorageWrite};

use crate::error::StoreError;
use portal_core::CurrentUser;
use std::sync::Arc;
use tracing::warn;

pub const TOKEN_KEY: &str = "token";
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";
pub const USER_KEY: &str = "user";

/// Cookie lifetime when mirroring the session for the edge gate
const COOKIE_MAX_AGE_SECS: u32 = 60 * 60 * 24;

/// Access token and the refresh token issued with it
///
/// Login only hands out an access token, so the refresh half is optional.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

impl TokenPair {
    pub fn new(access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
        }
    }
}

/// Typed access to the persisted session
#[derive(Clone)]
pub struct TokenStore {
    backend: Arc<dyn StorageBackend>,
}

impl TokenStore {
    pub fn new(backend: impl StorageBackend + 'static) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryStorage::new())
    }

    /// Replace both tokens. A pair without a refresh token removes the stored one.
    pub fn save_tokens(&self, pair: &TokenPair) -> Result<(), StoreError> {
        let refresh = match pair.refresh_token.as_deref() {
            Some(refresh) => StorageWrite::Set(REFRESH_TOKEN_KEY, refresh),
            None => StorageWrite::Remove(REFRESH_TOKEN_KEY),
        };
        self.backend
            .apply(&[StorageWrite::Set(TOKEN_KEY, &pair.access_token), refresh])
    }

    /// Stored pair, or `None` when no access token is stored
    pub fn load_tokens(&self) -> Result<Option<TokenPair>, StoreError> {
        let mut values = self
            .backend
            .get_many(&[TOKEN_KEY, REFRESH_TOKEN_KEY])?
            .into_iter();
        let (Some(Some(access_token)), refresh_token) = (values.next(), values.next().flatten())
        else {
            return Ok(None);
        };
        Ok(Some(TokenPair {
            access_token,
            refresh_token,
        }))
    }

    pub fn save_user(&self, user: &CurrentUser) -> Result<(), StoreError> {
        self.backend.set(USER_KEY, &serde_json::to_string(user)?)
    }

    /// Cached user. An entry that no longer parses is treated as absent.
    pub fn load_user(&self) -> Result<Option<CurrentUser>, StoreError> {
        let Some(raw) = self.backend.get(USER_KEY)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(user) => Ok(Some(user)),
            Err(err) => {
                warn!(error = %err, "Discarding unreadable cached user");
                Ok(None)
            }
        }
    }

    /// Remove tokens and cached user
    pub fn clear(&self) -> Result<(), StoreError> {
        self.backend.apply(&[
            StorageWrite::Remove(TOKEN_KEY),
            StorageWrite::Remove(REFRESH_TOKEN_KEY),
            StorageWrite::Remove(USER_KEY),
        ])
    }

    /// `Set-Cookie` values mirroring the token and user for the edge gate
    ///
    /// The user cookie carries percent-encoded JSON. Nothing is emitted for
    /// entries that are not stored.
    pub fn cookie_headers(&self, secure: bool) -> Result<Vec<String>, StoreError> {
        let secure_flag = if secure { " Secure;" } else { "" };
        let mut cookies = Vec::new();

        if let Some(token) = self.backend.get(TOKEN_KEY)? {
            cookies.push(format!(
                "{TOKEN_KEY}={token}; Path=/; HttpOnly; SameSite=Lax;{secure_flag} Max-Age={COOKIE_MAX_AGE_SECS}"
            ));
        }
        if let Some(user) = self.load_user()? {
            let value = urlencoding::encode(&serde_json::to_string(&user)?).into_owned();
            cookies.push(format!(
                "{USER_KEY}={value}; Path=/; HttpOnly; SameSite=Lax;{secure_flag} Max-Age={COOKIE_MAX_AGE_SECS}"
            ));
        }

        Ok(cookies)
    }

    /// `Set-Cookie` values expiring the mirrored cookies
    pub fn clear_cookie_headers() -> Vec<String> {
        [TOKEN_KEY, USER_KEY]
            .into_iter()
            .map(|name| format!("{name}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0"))
            .collect()
    }
}
