//! Token storage for the current session.

use std::sync::RwLock;

use crate::auth::AuthSession;

/// Storage for the current authenticated session.
///
/// The store is the only mutable state shared between in-flight requests:
/// every request reads it before dispatch, and only the refresh coordinator
/// (and logout) writes it. Implementations must treat the session as one
/// atomic tuple — a reader never observes a mix of old and new fields.
///
/// All three operations are infallible from the caller's perspective.
/// Durable backends handle IO failures internally (logging them) and keep
/// serving the latest in-process state.
pub trait TokenStore: Send + Sync {
    /// Returns the current session, or `None` when logged out.
    fn get(&self) -> Option<AuthSession>;

    /// Replace the stored session wholesale.
    fn set(&self, session: AuthSession);

    /// Remove the stored session. Clearing an empty store is a no-op.
    fn clear(&self);
}

/// In-memory session store.
///
/// The default store: state lives for the life of the process.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    session: RwLock<Option<AuthSession>>,
}

impl MemoryTokenStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with a session.
    pub fn with_session(session: AuthSession) -> Self {
        Self {
            session: RwLock::new(Some(session)),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Option<AuthSession> {
        self.session.read().unwrap().clone()
    }

    fn set(&self, session: AuthSession) {
        *self.session.write().unwrap() = Some(session);
    }

    fn clear(&self) {
        *self.session.write().unwrap() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AccessToken, Principal, RefreshToken, Role};

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

    #[test]
    fn set_replaces_whole_tuple() {
        let store = MemoryTokenStore::new();
        store.set(session("a1", "r1"));
        store.set(session("a2", "r2"));

        let current = store.get().unwrap();
        assert_eq!(current.access_token.as_str(), "a2");
        assert_eq!(current.refresh_token.as_str(), "r2");
    }

    #[test]
    fn clear_removes_everything_and_is_idempotent() {
        let store = MemoryTokenStore::new();
        store.set(session("a1", "r1"));

        store.clear();
        assert!(store.get().is_none());

        // Clearing an empty store is a no-op, not an error.
        store.clear();
        assert!(store.get().is_none());
    }

    #[test]
    fn empty_store_returns_none() {
        let store = MemoryTokenStore::new();
        assert!(store.get().is_none());
    }
}
