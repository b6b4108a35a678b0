//! Observable session state shared by handle

use crate::error::StoreError;
use crate::store::TokenStore;
use portal_core::{CurrentUser, UserRole};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

/// Who the client is signed in as, if anyone
#[derive(Debug, Clone, Default, PartialEq)]
pub enum SessionState {
    #[default]
    Unauthenticated,
    Authenticated(CurrentUser),
}

/// Session state transitions
#[derive(Debug, Clone, PartialEq)]
pub enum SessionAction {
    Login(CurrentUser),
    /// Replace the user (a refreshed profile, say) without changing session status
    UpdateUser(CurrentUser),
    /// Act as another role; the profile is re-derived for it
    SwitchRole(UserRole),
    Logout,
}

impl SessionState {
    pub fn user(&self) -> Option<&CurrentUser> {
        match self {
            Self::Authenticated(user) => Some(user),
            Self::Unauthenticated => None,
        }
    }

    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    /// Next state after `action`
    ///
    /// Updates and role switches need a signed-in user and leave an
    /// unauthenticated session untouched.
    #[must_use]
    pub fn reduce(self, action: SessionAction) -> Self {
        match (self, action) {
            (_, SessionAction::Login(user)) => Self::Authenticated(user),
            (_, SessionAction::Logout) => Self::Unauthenticated,
            (Self::Authenticated(_), SessionAction::UpdateUser(user)) => Self::Authenticated(user),
            (Self::Authenticated(user), SessionAction::SwitchRole(role)) => {
                Self::Authenticated(user.with_role(role))
            }
            (state @ Self::Unauthenticated, _) => state,
        }
    }
}

/// Handle to the session state
///
/// Clones share one state. Observers subscribe and are woken on every
/// dispatched action that changes it.
#[derive(Debug, Clone)]
pub struct SessionContext {
    tx: Arc<watch::Sender<SessionState>>,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionContext {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(SessionState::Unauthenticated);
        Self { tx: Arc::new(tx) }
    }

    pub fn current(&self) -> SessionState {
        self.tx.borrow().clone()
    }

    pub fn current_user(&self) -> Option<CurrentUser> {
        self.tx.borrow().user().cloned()
    }

    pub fn is_authenticated(&self) -> bool {
        self.tx.borrow().is_authenticated()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.tx.subscribe()
    }

    pub fn dispatch(&self, action: SessionAction) {
        debug!(?action, "Session action");
        self.tx.send_if_modified(|state| {
            let next = std::mem::take(state).reduce(action);
            let changed = *state != next;
            *state = next;
            changed
        });
    }

    pub fn switch_role(&self, role: UserRole) {
        self.dispatch(SessionAction::SwitchRole(role));
    }

    /// Sign in as the cached user, if one is stored
    pub fn restore(&self, store: &TokenStore) -> Result<bool, StoreError> {
        let restored = store.load_user()?;
        let found = restored.is_some();
        if let Some(user) = restored {
            self.dispatch(SessionAction::Login(user));
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn student() -> CurrentUser {
        CurrentUser {
            id: "s1".to_string(),
            name: "Kai".to_string(),
            email: "kai@example.com".to_string(),
            role: UserRole::Student,
            avatar: None,
            profile: json!({"university": "State"}),
        }
    }

    #[test]
    fn test_starts_unauthenticated() {
        let context = SessionContext::new();

        assert_eq!(context.current(), SessionState::Unauthenticated);
        assert!(!context.is_authenticated());
        assert_eq!(context.current_user(), None);
    }

    #[test]
    fn test_login_then_logout() {
        let context = SessionContext::new();

        context.dispatch(SessionAction::Login(student()));
        assert_eq!(context.current_user(), Some(student()));

        context.dispatch(SessionAction::Logout);
        assert!(!context.is_authenticated());
    }

    #[test]
    fn test_switch_role_rederives_profile() {
        let context = SessionContext::new();
        context.dispatch(SessionAction::Login(student()));

        context.switch_role(UserRole::Employer);

        let user = context.current_user().unwrap();
        assert_eq!(user.role, UserRole::Employer);
        assert_eq!(user.id, "s1");
        assert_eq!(user.profile, portal_core::role_profile_template(UserRole::Employer));
    }

    #[test]
    fn test_update_and_switch_require_session() {
        let state = SessionState::Unauthenticated
            .reduce(SessionAction::UpdateUser(student()))
            .reduce(SessionAction::SwitchRole(UserRole::Admin));

        assert_eq!(state, SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let context = SessionContext::new();
        let mut rx = context.subscribe();

        context.clone().dispatch(SessionAction::Login(student()));

        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_authenticated());
    }

    #[test]
    fn test_restore_from_store() {
        let store = TokenStore::in_memory();
        let context = SessionContext::new();
        assert!(!context.restore(&store).unwrap());

        store.save_user(&student()).unwrap();

        assert!(context.restore(&store).unwrap());
        assert_eq!(context.current_user(), Some(student()));
    }
}
