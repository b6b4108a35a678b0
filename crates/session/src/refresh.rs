//! Background token refresh
//!
//! A started scheduler checks the stored access token once right away and
//! then once per interval, trading the refresh token for a new pair whenever
//! the access token is about to expire. The first failed refresh ends the
//! task; it only runs again after another [`RefreshScheduler::start`].

use crate::api::SessionApi;
use crate::config::RefreshConfig;
use crate::error::SessionError;
use crate::store::{TokenPair, TokenStore};
use portal_core::is_expiring_soon;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Result of one refresh check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The access token is not close to expiry
    Fresh,
    Refreshed,
    /// Another refresh was already running
    InFlight,
    Failed,
}

struct Inner {
    api: Arc<dyn SessionApi>,
    store: TokenStore,
    config: RefreshConfig,
    in_flight: AtomicBool,
}

/// Keeps the stored access token fresh
#[derive(Clone)]
pub struct RefreshScheduler {
    inner: Arc<Inner>,
}

/// Clears the in-flight flag however the refresh ends, cancellation included
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl RefreshScheduler {
    pub fn new(api: Arc<dyn SessionApi>, store: TokenStore, config: RefreshConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                api,
                store,
                config,
                in_flight: AtomicBool::new(false),
            }),
        }
    }

    /// Refresh if the stored access token expires within the configured window
    ///
    /// A token whose expiry cannot be decoded counts as expiring.
    pub async fn check_and_refresh(&self) -> RefreshOutcome {
        let pair = match self.inner.store.load_tokens() {
            Ok(Some(pair)) => pair,
            Ok(None) => {
                debug!("No stored token to refresh");
                return RefreshOutcome::Failed;
            }
            Err(err) => {
                warn!(error = %err, "Failed to read stored tokens");
                return RefreshOutcome::Failed;
            }
        };

        let now = chrono::Utc::now().timestamp();
        if !is_expiring_soon(&pair.access_token, now, self.inner.config.expiry_window_secs) {
            debug!("Access token still fresh");
            return RefreshOutcome::Fresh;
        }

        self.refresh().await
    }

    /// Refresh regardless of expiry. Returns whether a new token was stored.
    pub async fn refresh_now(&self) -> bool {
        self.refresh().await == RefreshOutcome::Refreshed
    }

    async fn refresh(&self) -> RefreshOutcome {
        if self
            .inner
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Token refresh already in flight");
            return RefreshOutcome::InFlight;
        }
        let _guard = InFlightGuard(&self.inner.in_flight);

        match self.try_refresh().await {
            Ok(()) => RefreshOutcome::Refreshed,
            Err(err) => {
                warn!(error = %err, "Token refresh failed");
                RefreshOutcome::Failed
            }
        }
    }

    async fn try_refresh(&self) -> Result<(), SessionError> {
        let refresh_token = self
            .inner
            .store
            .load_tokens()?
            .and_then(|pair| pair.refresh_token)
            .ok_or(SessionError::NotAuthenticated)?;

        let response = self.inner.api.refresh(&refresh_token).await?;
        let pair = TokenPair {
            access_token: response.access_token,
            refresh_token: response.refresh_token.or(Some(refresh_token)),
        };

        self.inner.store.save_tokens(&pair)?;
        self.inner.api.set_bearer(Some(pair.access_token));
        info!("Session token refreshed");
        Ok(())
    }

    /// Spawn the periodic refresh task
    ///
    /// Returns `None` when no access token or no refresh token is stored.
    pub fn start(&self) -> Option<RefreshHandle> {
        match self.inner.store.load_tokens() {
            Ok(Some(TokenPair {
                refresh_token: Some(_),
                ..
            })) => {}
            Ok(_) => {
                debug!("Refresh scheduler not started: no token pair stored");
                return None;
            }
            Err(err) => {
                warn!(error = %err, "Refresh scheduler not started");
                return None;
            }
        }

        let cancel = CancellationToken::new();
        let task = tokio::spawn(self.clone().run(cancel.clone()));
        info!(
            interval_secs = self.inner.config.interval_secs,
            "Refresh scheduler started"
        );

        Some(RefreshHandle {
            cancel,
            task: Some(task),
        })
    }

    async fn run(self, cancel: CancellationToken) {
        let period = self.inner.config.interval();
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let outcome = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                outcome = self.check_and_refresh() => outcome,
            };

            if outcome == RefreshOutcome::Failed {
                warn!("Refresh scheduler stopped after a failed refresh");
                return;
            }

            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = interval.tick() => {}
            }
        }

        debug!("Refresh scheduler cancelled");
    }
}

/// Owner of a running refresh task; dropping it cancels the task
pub struct RefreshHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl RefreshHandle {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Wait for the task to end on its own or through [`cancel`](Self::cancel)
    pub async fn join(mut self) {
        if let Some(task) = self.task.take()
            && let Err(err) = task.await
        {
            warn!(error = %err, "Refresh task ended abnormally");
        }
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::MockSessionApi;
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use mockall::predicate::eq;
    use portal_http::client::ClientError;
    use portal_http::types::RefreshResponse;
    use serde_json::json;
    use std::time::Duration;

    fn token_expiring_in(secs: i64) -> String {
        let exp = chrono::Utc::now().timestamp() + secs;
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256"}"#);
        let payload = URL_SAFE_NO_PAD.encode(json!({"role": "STUDENT", "exp": exp}).to_string());
        format!("{header}.{payload}.sig")
    }

    fn store_with(access_token: String, refresh_token: Option<&str>) -> TokenStore {
        let store = TokenStore::in_memory();
        store
            .save_tokens(&TokenPair::new(access_token, refresh_token.map(str::to_string)))
            .unwrap();
        store
    }

    fn scheduler(api: MockSessionApi, store: &TokenStore) -> RefreshScheduler {
        RefreshScheduler::new(Arc::new(api), store.clone(), RefreshConfig::default())
    }

    #[tokio::test]
    async fn test_fresh_token_is_left_alone() {
        let mut api = MockSessionApi::new();
        api.expect_refresh().never();
        let store = store_with(token_expiring_in(301), Some("r1"));

        let outcome = scheduler(api, &store).check_and_refresh().await;

        assert_eq!(outcome, RefreshOutcome::Fresh);
    }

    #[tokio::test]
    async fn test_expiring_token_is_refreshed() {
        let fresh = token_expiring_in(3600);
        let returned = fresh.clone();
        let mut api = MockSessionApi::new();
        api.expect_refresh()
            .with(eq("r1"))
            .times(1)
            .returning(move |_| {
                Ok(RefreshResponse {
                    access_token: returned.clone(),
                    refresh_token: Some("r2".to_string()),
                })
            });
        api.expect_set_bearer()
            .with(eq(Some(fresh.clone())))
            .times(1)
            .return_const(());
        let store = store_with(token_expiring_in(299), Some("r1"));

        let outcome = scheduler(api, &store).check_and_refresh().await;

        assert_eq!(outcome, RefreshOutcome::Refreshed);
        assert_eq!(
            store.load_tokens().unwrap(),
            Some(TokenPair::new(fresh, Some("r2".to_string())))
        );
    }

    #[tokio::test]
    async fn test_undecodable_token_is_refreshed() {
        let mut api = MockSessionApi::new();
        api.expect_refresh().times(1).returning(|_| {
            Ok(RefreshResponse {
                access_token: "a2".to_string(),
                refresh_token: None,
            })
        });
        api.expect_set_bearer().return_const(());
        let store = store_with("opaque".to_string(), Some("r1"));

        let outcome = scheduler(api, &store).check_and_refresh().await;

        assert_eq!(outcome, RefreshOutcome::Refreshed);
        assert_eq!(
            store.load_tokens().unwrap(),
            Some(TokenPair::new("a2", Some("r1".to_string())))
        );
    }

    #[tokio::test]
    async fn test_refresh_now_reports_failure() {
        let mut api = MockSessionApi::new();
        api.expect_refresh()
            .times(1)
            .returning(|_| Err(ClientError::Unauthorized("revoked".to_string())));
        api.expect_set_bearer().never();
        let store = store_with(token_expiring_in(3600), Some("r1"));

        assert!(!scheduler(api, &store).refresh_now().await);
        assert_eq!(
            store.load_tokens().unwrap().unwrap().refresh_token.as_deref(),
            Some("r1")
        );
    }

    #[tokio::test]
    async fn test_concurrent_refresh_is_suppressed() {
        let mut api = MockSessionApi::new();
        api.expect_refresh().never();
        let store = store_with(token_expiring_in(10), Some("r1"));
        let scheduler = scheduler(api, &store);
        scheduler.inner.in_flight.store(true, Ordering::Release);

        assert_eq!(
            scheduler.check_and_refresh().await,
            RefreshOutcome::InFlight
        );
        assert!(!scheduler.refresh_now().await);
    }

    #[tokio::test]
    async fn test_start_requires_token_pair() {
        let store = store_with(token_expiring_in(3600), None);

        assert!(scheduler(MockSessionApi::new(), &store).start().is_none());
        assert!(
            scheduler(MockSessionApi::new(), &TokenStore::in_memory())
                .start()
                .is_none()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_stops_scheduler_until_restart() {
        let mut api = MockSessionApi::new();
        api.expect_refresh()
            .times(2)
            .returning(|_| Err(ClientError::Backend {
                status: 500,
                message: "down".to_string(),
            }));
        api.expect_set_bearer().never();
        let store = store_with(token_expiring_in(10), Some("r1"));
        let scheduler = scheduler(api, &store);

        let handle = scheduler.start().unwrap();
        handle.join().await;

        // No further attempts however long we wait
        time::advance(Duration::from_secs(3 * 45 * 60)).await;
        assert!(!scheduler.inner.in_flight.load(Ordering::Acquire));

        let restarted = scheduler.start().unwrap();
        restarted.join().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_checks_every_interval() {
        let mut api = MockSessionApi::new();
        api.expect_refresh().times(1).returning(|_| {
            Ok(RefreshResponse {
                access_token: token_expiring_in(24 * 3600),
                refresh_token: None,
            })
        });
        api.expect_set_bearer().return_const(());
        let store = store_with(token_expiring_in(60), Some("r1"));
        let scheduler = scheduler(api, &store);

        let handle = scheduler.start().unwrap();
        for _ in 0..3 {
            time::sleep(Duration::from_secs(45 * 60)).await;
        }
        assert!(!handle.is_finished());

        handle.cancel();
        handle.join().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_cancels_task() {
        let mut api = MockSessionApi::new();
        api.expect_refresh().never();
        let store = store_with(token_expiring_in(3600), Some("r1"));
        let scheduler = scheduler(api, &store);

        let handle = scheduler.start().unwrap();
        let cancel = handle.cancel.clone();
        drop(handle);

        assert!(cancel.is_cancelled());
    }
}
