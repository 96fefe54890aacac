//! Single-flight token refresh coordination.
//!
//! When a request comes back 401, the coordinator decides whether the
//! session can be refreshed and makes sure at most one refresh call is ever
//! in flight. The first caller to observe the expired token becomes the
//! episode leader and issues the refresh; every caller that hits a 401 while
//! that episode is running is queued on it and settled with the same outcome
//! — the renewed access token, or one shared terminal error. A failed
//! refresh ends the session: the store is cleared and one
//! [`SessionEvent::Expired`] is broadcast for the whole episode.

use std::mem;
use std::sync::{Arc, Mutex};

use tokio::sync::{broadcast, oneshot};
use tracing::{debug, info, warn};

use obra_core::{
    AccessToken, ApiError, ApiRequest, AuthSession, RefreshToken, SessionEvent, TokenStore,
    Transport,
};

use crate::endpoints::{AuthResponse, REFRESH, RefreshRequest};

type RefreshOutcome = Result<AccessToken, ApiError>;

/// Refresh state. `Refreshing` owns the queue of waiting callers; the queue
/// is non-empty only while a refresh is in flight, and is fully drained
/// before the state returns to `Idle`.
enum RefreshState {
    Idle,
    Refreshing {
        waiters: Vec<oneshot::Sender<RefreshOutcome>>,
    },
}

/// Coordinates token refresh across concurrent requests.
pub(crate) struct RefreshCoordinator {
    state: Mutex<RefreshState>,
    store: Arc<dyn TokenStore>,
    transport: Arc<dyn Transport>,
    events: broadcast::Sender<SessionEvent>,
}

impl RefreshCoordinator {
    pub(crate) fn new(
        store: Arc<dyn TokenStore>,
        transport: Arc<dyn Transport>,
        events: broadcast::Sender<SessionEvent>,
    ) -> Self {
        Self {
            state: Mutex::new(RefreshState::Idle),
            store,
            transport,
            events,
        }
    }

    /// Obtain a renewed access token, joining the in-flight refresh if one
    /// exists.
    ///
    /// Called after a 401 on a refreshable request. Exactly one caller per
    /// episode performs the network refresh; the rest wait on it. Every
    /// caller of a given episode sees the same outcome.
    pub(crate) async fn refreshed_token(&self) -> RefreshOutcome {
        enum Role {
            Leader,
            Follower(oneshot::Receiver<RefreshOutcome>),
        }

        let role = {
            let mut state = self.state.lock().unwrap();
            match &mut *state {
                RefreshState::Refreshing { waiters } => {
                    let (tx, rx) = oneshot::channel();
                    waiters.push(tx);
                    Role::Follower(rx)
                }
                RefreshState::Idle => {
                    *state = RefreshState::Refreshing {
                        waiters: Vec::new(),
                    };
                    Role::Leader
                }
            }
        };

        match role {
            Role::Follower(rx) => {
                debug!("refresh already in flight, waiting on it");
                // A dropped sender means the episode was abandoned before
                // settling; reject rather than hang.
                rx.await.unwrap_or_else(|_| Err(ApiError::refresh_aborted()))
            }
            Role::Leader => {
                let guard = EpisodeGuard { coordinator: self };
                let outcome = self.run_refresh().await;
                guard.settle(outcome.clone());
                outcome
            }
        }
    }

    /// Perform the refresh network call. Leader-only.
    async fn run_refresh(&self) -> RefreshOutcome {
        let refresh_token = match self.store.get() {
            Some(session) => session.refresh_token,
            None => {
                // Nothing to refresh: end the session without a network call.
                let err = ApiError::session_expired("no refresh token available");
                self.terminate(&err);
                return Err(err);
            }
        };

        info!("refreshing session");
        let request = refresh_request(&refresh_token);

        match self.transport.send(&request, None).await {
            Ok(response) if response.is_success() => self.accept_session(response.body),
            Ok(response) => {
                let err = ApiError::from_response(response.status, response.body.as_ref());
                warn!(code = %err.code, "refresh rejected, ending session");
                self.terminate(&err);
                Err(err)
            }
            Err(err) => {
                warn!(code = %err.code, "refresh transport failure, ending session");
                self.terminate(&err);
                Err(err)
            }
        }
    }

    /// Store the renewed session and hand back its access token.
    fn accept_session(&self, body: Option<serde_json::Value>) -> RefreshOutcome {
        let auth = body.and_then(|b| serde_json::from_value::<AuthResponse>(b).ok());
        match auth {
            Some(auth) => {
                let session = AuthSession::new(
                    AccessToken::new(auth.access_token),
                    RefreshToken::new(auth.refresh_token),
                    auth.user,
                );
                let token = session.access_token.clone();
                self.store.set(session);
                debug!("session refreshed");
                Ok(token)
            }
            None => {
                // A 2xx refresh without a usable session is still a failed
                // refresh.
                let err = ApiError::decode("refresh response did not contain a session");
                self.terminate(&err);
                Err(err)
            }
        }
    }

    /// End the session: clear the store and broadcast one expiry signal.
    ///
    /// Only the episode leader reaches this, so it runs once per failure
    /// episode regardless of how many callers are queued.
    fn terminate(&self, reason: &ApiError) {
        self.store.clear();
        let _ = self.events.send(SessionEvent::Expired {
            reason: reason.clone(),
        });
    }

    /// Reset to `Idle` and take ownership of any queued waiters.
    fn take_waiters(&self) -> Vec<oneshot::Sender<RefreshOutcome>> {
        match mem::replace(&mut *self.state.lock().unwrap(), RefreshState::Idle) {
            RefreshState::Refreshing { waiters } => waiters,
            RefreshState::Idle => Vec::new(),
        }
    }
}

/// Guard tying the episode's lifetime to the leading task.
///
/// On the normal path [`settle`] drains every waiter with the episode
/// outcome. If the leading task is cancelled (or panics) mid-refresh, the
/// `Drop` impl still resets the state and drops the queued senders, which
/// rejects each waiting receiver — no caller is ever left pending.
///
/// [`settle`]: EpisodeGuard::settle
struct EpisodeGuard<'a> {
    coordinator: &'a RefreshCoordinator,
}

impl EpisodeGuard<'_> {
    fn settle(self, outcome: RefreshOutcome) {
        for waiter in self.coordinator.take_waiters() {
            // A waiter that stopped listening is its own problem.
            let _ = waiter.send(outcome.clone());
        }
        mem::forget(self);
    }
}

impl Drop for EpisodeGuard<'_> {
    fn drop(&mut self) {
        drop(self.coordinator.take_waiters());
    }
}

fn refresh_request(refresh_token: &RefreshToken) -> ApiRequest {
    let body = serde_json::to_value(RefreshRequest {
        refresh_token: refresh_token.as_str(),
    })
    .expect("refresh request body serializes");

    ApiRequest::post(REFRESH).exempt().body(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::json;

    use obra_core::{MemoryTokenStore, Principal, RawResponse, Role};

    fn session(access: &str, refresh: &str) -> AuthSession {
        AuthSession::new(
            AccessToken::new(access),
            RefreshToken::new(refresh),
            Principal {
                id: "u-1".to_string(),
                name: None,
                email: None,
                phone: None,
                role: Role::User,
            },
        )
    }

    fn renewed_session_body() -> serde_json::Value {
        json!({
            "accessToken": "T2",
            "refreshToken": "R2",
            "user": {"id": "u-1", "role": "user"}
        })
    }

    /// Succeeds after yielding once, counting calls.
    struct CountingTransport {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Transport for CountingTransport {
        async fn send(
            &self,
            _request: &ApiRequest,
            _token: Option<&AccessToken>,
        ) -> Result<RawResponse, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            Ok(RawResponse {
                status: 200,
                body: Some(renewed_session_body()),
            })
        }
    }

    /// Never completes.
    struct PendingTransport;

    #[async_trait]
    impl Transport for PendingTransport {
        async fn send(
            &self,
            _request: &ApiRequest,
            _token: Option<&AccessToken>,
        ) -> Result<RawResponse, ApiError> {
            std::future::pending().await
        }
    }

    fn coordinator(
        store: Arc<dyn TokenStore>,
        transport: Arc<dyn Transport>,
    ) -> (Arc<RefreshCoordinator>, broadcast::Receiver<SessionEvent>) {
        let (events, rx) = broadcast::channel(16);
        (
            Arc::new(RefreshCoordinator::new(store, transport, events)),
            rx,
        )
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_refresh() {
        let store = Arc::new(MemoryTokenStore::with_session(session("T1", "R1")));
        let transport = Arc::new(CountingTransport {
            calls: AtomicUsize::new(0),
        });
        let (coordinator, _rx) = coordinator(store.clone(), transport.clone());

        let (a, b) = tokio::join!(coordinator.refreshed_token(), coordinator.refreshed_token());

        assert_eq!(a.unwrap().as_str(), "T2");
        assert_eq!(b.unwrap().as_str(), "T2");
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.get().unwrap().access_token.as_str(), "T2");
    }

    #[tokio::test]
    async fn missing_refresh_token_terminates_without_network_call() {
        let store = Arc::new(MemoryTokenStore::new());
        let transport = Arc::new(CountingTransport {
            calls: AtomicUsize::new(0),
        });
        let (coordinator, mut rx) = coordinator(store.clone(), transport.clone());

        let outcome = coordinator.refreshed_token().await;

        let err = outcome.unwrap_err();
        assert_eq!(err.code, "SESSION_EXPIRED");
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
        assert!(matches!(rx.try_recv(), Ok(SessionEvent::Expired { .. })));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn aborted_episode_rejects_waiters() {
        let store = Arc::new(MemoryTokenStore::with_session(session("T1", "R1")));
        let (coordinator, _rx) = coordinator(store, Arc::new(PendingTransport));

        let leader = tokio::spawn({
            let coordinator = Arc::clone(&coordinator);
            async move { coordinator.refreshed_token().await }
        });
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        let follower = tokio::spawn({
            let coordinator = Arc::clone(&coordinator);
            async move { coordinator.refreshed_token().await }
        });
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        leader.abort();
        assert!(leader.await.unwrap_err().is_cancelled());

        let outcome = follower.await.unwrap();
        assert_eq!(outcome.unwrap_err().code, "REFRESH_ABORTED");

        // The abandoned episode left the coordinator usable.
        assert!(matches!(
            *coordinator.state.lock().unwrap(),
            RefreshState::Idle
        ));
    }

    #[tokio::test]
    async fn malformed_refresh_body_ends_session() {
        struct JunkTransport;

        #[async_trait]
        impl Transport for JunkTransport {
            async fn send(
                &self,
                _request: &ApiRequest,
                _token: Option<&AccessToken>,
            ) -> Result<RawResponse, ApiError> {
                Ok(RawResponse {
                    status: 200,
                    body: Some(json!({"unexpected": true})),
                })
            }
        }

        let store = Arc::new(MemoryTokenStore::with_session(session("T1", "R1")));
        let (coordinator, mut rx) = coordinator(store.clone(), Arc::new(JunkTransport));

        let outcome = coordinator.refreshed_token().await;

        assert_eq!(outcome.unwrap_err().code, "DECODE_ERROR");
        assert!(store.get().is_none());
        assert!(matches!(rx.try_recv(), Ok(SessionEvent::Expired { .. })));
    }
}
