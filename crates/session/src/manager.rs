//! Session lifecycle: login, restore, profile loading and logout

use crate::api::SessionApi;
use crate::config::RefreshConfig;
use crate::context::{SessionAction, SessionContext};
use crate::error::{SessionError, SessionResult};
use crate::refresh::{RefreshHandle, RefreshScheduler};
use crate::store::{TokenPair, TokenStore};
use portal_core::CurrentUser;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, instrument, warn};

/// Ties the backend client, the persisted session, the observable context
/// and the refresh task together
pub struct SessionManager {
    api: Arc<dyn SessionApi>,
    store: TokenStore,
    context: SessionContext,
    scheduler: RefreshScheduler,
    refresh_task: Mutex<Option<RefreshHandle>>,
}

impl SessionManager {
    pub fn new(
        api: Arc<dyn SessionApi>,
        store: TokenStore,
        context: SessionContext,
        config: RefreshConfig,
    ) -> Self {
        let scheduler = RefreshScheduler::new(api.clone(), store.clone(), config);
        Self {
            api,
            store,
            context,
            scheduler,
            refresh_task: Mutex::new(None),
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    pub fn scheduler(&self) -> &RefreshScheduler {
        &self.scheduler
    }

    /// Pick up a persisted session after a restart
    ///
    /// Returns whether a stored token was found. The cached user, if any,
    /// signs the context in and the refresh task is started.
    pub async fn restore(&self) -> SessionResult<bool> {
        self.disarm_refresh().await;
        let Some(pair) = self.store.load_tokens()? else {
            return Ok(false);
        };

        self.api.set_bearer(Some(pair.access_token));
        self.context.restore(&self.store)?;
        self.arm_refresh();
        info!(
            authenticated = self.context.is_authenticated(),
            "Session restored"
        );
        Ok(true)
    }

    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> SessionResult<CurrentUser> {
        let response = self.api.login(email, password).await?;

        self.disarm_refresh().await;
        self.store.save_tokens(&TokenPair {
            access_token: response.access_token.clone(),
            refresh_token: response.refresh_token,
        })?;
        self.store.save_user(&response.user)?;
        self.api.set_bearer(Some(response.access_token));
        self.context
            .dispatch(SessionAction::Login(response.user.clone()));
        self.arm_refresh();

        info!(user_id = %response.user.id, role = %response.user.role, "Signed in");
        Ok(response.user)
    }

    /// Fetch the profile, falling back to the cached user
    ///
    /// Only when the fetch fails and nothing is cached is the session torn
    /// down and [`SessionError::ProfileUnavailable`] returned.
    pub async fn load_current_user(&self) -> SessionResult<CurrentUser> {
        match self.api.fetch_profile().await {
            Ok(user) => {
                self.store.save_user(&user)?;
                self.context.dispatch(if self.context.is_authenticated() {
                    SessionAction::UpdateUser(user.clone())
                } else {
                    SessionAction::Login(user.clone())
                });
                Ok(user)
            }
            Err(err) => match self.store.load_user()? {
                Some(cached) => {
                    warn!(error = %err, "Profile fetch failed, using cached user");
                    if !self.context.is_authenticated() {
                        self.context.dispatch(SessionAction::Login(cached.clone()));
                    }
                    Ok(cached)
                }
                None => {
                    warn!(error = %err, "Profile fetch failed with no cached user");
                    self.logout().await?;
                    Err(SessionError::ProfileUnavailable(err))
                }
            },
        }
    }

    /// End the session locally
    ///
    /// Waits for the refresh task to finish before storage is cleared, so a
    /// refresh completing concurrently cannot write a token afterwards.
    pub async fn logout(&self) -> SessionResult<()> {
        self.disarm_refresh().await;
        self.store.clear()?;
        self.api.set_bearer(None);
        self.context.dispatch(SessionAction::Logout);
        info!("Signed out");
        Ok(())
    }

    /// Start the refresh task; callers disarm any previous one first
    fn arm_refresh(&self) {
        let handle = self.scheduler.start();
        if handle.is_none() {
            debug!("Session has no refresh token; refresh disabled");
        }
        *self
            .refresh_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = handle;
    }

    /// Cancel the refresh task and wait until it has stopped writing
    async fn disarm_refresh(&self) {
        let handle = self
            .refresh_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.cancel();
            handle.join().await;
        }
    }

    /// Whether a refresh task is currently running
    pub fn is_refreshing(&self) -> bool {
        self.refresh_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::MockSessionApi;
    use mockall::predicate::eq;
    use portal_core::UserRole;
    use portal_http::client::ClientError;
    use portal_http::types::{LoginResponse, RefreshResponse};
    use serde_json::json;
    use std::time::Duration;

    fn employer() -> CurrentUser {
        CurrentUser {
            id: "e1".to_string(),
            name: "Ines".to_string(),
            email: "ines@example.com".to_string(),
            role: UserRole::Employer,
            avatar: None,
            profile: json!({"company": "Acme"}),
        }
    }

    fn manager(api: MockSessionApi, store: &TokenStore) -> SessionManager {
        SessionManager::new(
            Arc::new(api),
            store.clone(),
            SessionContext::new(),
            RefreshConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_login_persists_session() {
        let mut api = MockSessionApi::new();
        api.expect_login()
            .with(eq("ines@example.com"), eq("pw"))
            .times(1)
            .returning(|_, _| {
                Ok(LoginResponse {
                    access_token: "a1".to_string(),
                    refresh_token: None,
                    user: employer(),
                    message: None,
                })
            });
        api.expect_set_bearer()
            .with(eq(Some("a1".to_string())))
            .times(1)
            .return_const(());
        let store = TokenStore::in_memory();
        let manager = manager(api, &store);

        let user = manager.login("ines@example.com", "pw").await.unwrap();

        assert_eq!(user, employer());
        assert_eq!(
            store.load_tokens().unwrap(),
            Some(TokenPair::new("a1", None))
        );
        assert_eq!(store.load_user().unwrap(), Some(employer()));
        assert_eq!(manager.context().current_user(), Some(employer()));
        assert!(!manager.is_refreshing());
    }

    #[tokio::test]
    async fn test_failed_login_leaves_session_empty() {
        let mut api = MockSessionApi::new();
        api.expect_login()
            .returning(|_, _| Err(ClientError::Unauthorized("bad".to_string())));
        api.expect_set_bearer().never();
        let store = TokenStore::in_memory();
        let manager = manager(api, &store);

        let result = manager.login("ines@example.com", "nope").await;

        assert!(matches!(
            result,
            Err(SessionError::Client(ClientError::Unauthorized(_)))
        ));
        assert_eq!(store.load_tokens().unwrap(), None);
        assert!(!manager.context().is_authenticated());
    }

    #[tokio::test]
    async fn test_profile_failure_falls_back_to_cache() {
        let mut api = MockSessionApi::new();
        api.expect_fetch_profile()
            .times(1)
            .returning(|| Err(ClientError::Backend {
                status: 503,
                message: "down".to_string(),
            }));
        let store = TokenStore::in_memory();
        store.save_user(&employer()).unwrap();
        let manager = manager(api, &store);

        let user = manager.load_current_user().await.unwrap();

        assert_eq!(user, employer());
        assert!(manager.context().is_authenticated());
    }

    #[tokio::test]
    async fn test_profile_failure_without_cache_invalidates() {
        let mut api = MockSessionApi::new();
        api.expect_fetch_profile()
            .returning(|| Err(ClientError::Unauthorized("expired".to_string())));
        api.expect_set_bearer().with(eq(None)).times(1).return_const(());
        let store = TokenStore::in_memory();
        store.save_tokens(&TokenPair::new("a1", None)).unwrap();
        let manager = manager(api, &store);

        let result = manager.load_current_user().await;

        assert!(matches!(result, Err(SessionError::ProfileUnavailable(_))));
        assert_eq!(store.load_tokens().unwrap(), None);
    }

    #[tokio::test]
    async fn test_profile_success_updates_cache_and_context() {
        let mut updated = employer();
        updated.name = "Ines R.".to_string();
        let returned = updated.clone();
        let mut api = MockSessionApi::new();
        api.expect_fetch_profile()
            .returning(move || Ok(returned.clone()));
        let store = TokenStore::in_memory();
        let manager = manager(api, &store);
        manager
            .context()
            .dispatch(SessionAction::Login(employer()));

        manager.load_current_user().await.unwrap();

        assert_eq!(store.load_user().unwrap(), Some(updated.clone()));
        assert_eq!(manager.context().current_user(), Some(updated));
    }

    #[tokio::test]
    async fn test_logout_clears_everything() {
        let mut api = MockSessionApi::new();
        api.expect_set_bearer().return_const(());
        api.expect_refresh().never();
        let store = TokenStore::in_memory();
        store
            .save_tokens(&TokenPair::new("opaque", Some("r1".to_string())))
            .unwrap();
        store.save_user(&employer()).unwrap();
        let manager = manager(api, &store);

        assert!(manager.restore().await.unwrap());
        assert!(manager.context().is_authenticated());
        manager.logout().await.unwrap();

        assert!(!manager.is_refreshing());
        assert_eq!(store.load_tokens().unwrap(), None);
        assert_eq!(store.load_user().unwrap(), None);
        assert!(!manager.context().is_authenticated());
    }

    #[tokio::test]
    async fn test_restore_without_tokens() {
        let manager = manager(MockSessionApi::new(), &TokenStore::in_memory());

        assert!(!manager.restore().await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_logout_waits_for_running_refresh() {
        let mut api = MockSessionApi::new();
        api.expect_refresh().times(1).returning(|_| {
            // Blocks the worker so the refresh is mid-flight when logout starts
            std::thread::sleep(Duration::from_millis(300));
            Ok(RefreshResponse {
                access_token: "a2".to_string(),
                refresh_token: Some("r2".to_string()),
            })
        });
        api.expect_set_bearer().return_const(());
        let store = TokenStore::in_memory();
        store
            .save_tokens(&TokenPair::new("opaque", Some("r1".to_string())))
            .unwrap();
        store.save_user(&employer()).unwrap();
        let manager = manager(api, &store);

        assert!(manager.restore().await.unwrap());
        tokio::time::sleep(Duration::from_millis(100)).await;
        manager.logout().await.unwrap();
        assert_eq!(store.load_tokens().unwrap(), None);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(store.load_tokens().unwrap(), None);
        assert_eq!(store.load_user().unwrap(), None);
        assert!(!manager.is_refreshing());
    }
}
