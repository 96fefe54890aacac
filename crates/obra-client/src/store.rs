//! File-backed session persistence.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tracing::warn;

use obra_core::{AccessToken, AuthSession, Principal, RefreshToken, TokenStore};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// Stored session data.
#[derive(Debug, Serialize, Deserialize)]
struct StoredSession {
    access_token: String,
    refresh_token: String,
    user: Principal,
}

/// A [`TokenStore`] that persists the session tuple to a JSON file.
///
/// The in-memory copy is authoritative: reads never touch the disk, and a
/// failed write is logged but does not fail the operation (the trait is
/// infallible). The whole tuple is written in one file, so a session is
/// persisted all-or-nothing.
pub struct FileTokenStore {
    path: PathBuf,
    cached: RwLock<Option<AuthSession>>,
}

impl FileTokenStore {
    /// Open a store at the given path, loading any persisted session.
    ///
    /// An unreadable or malformed file is treated as "no session" rather
    /// than an error.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let cached = RwLock::new(load(&path));
        Self { path, cached }
    }

    /// The file this store persists to.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn load(path: &Path) -> Option<AuthSession> {
    if !path.exists() {
        return None;
    }

    let json = match fs::read_to_string(path) {
        Ok(json) => json,
        Err(e) => {
            warn!(error = %e, "failed to read session file");
            return None;
        }
    };

    let stored: StoredSession = match serde_json::from_str(&json) {
        Ok(stored) => stored,
        Err(e) => {
            warn!(error = %e, "invalid session file, ignoring it");
            return None;
        }
    };

    Some(AuthSession::new(
        AccessToken::new(stored.access_token),
        RefreshToken::new(stored.refresh_token),
        stored.user,
    ))
}

fn persist(path: &Path, session: &AuthSession) {
    let stored = StoredSession {
        access_token: session.access_token.as_str().to_string(),
        refresh_token: session.refresh_token.as_str().to_string(),
        user: session.principal.clone(),
    };

    let json = match serde_json::to_string_pretty(&stored) {
        Ok(json) => json,
        Err(e) => {
            warn!(error = %e, "failed to serialize session");
            return;
        }
    };

    if let Err(e) = fs::write(path, &json) {
        warn!(error = %e, "failed to write session file");
        return;
    }

    // Set restrictive permissions (Unix only)
    #[cfg(unix)]
    {
        let perms = fs::Permissions::from_mode(0o600);
        if let Err(e) = fs::set_permissions(path, perms) {
            warn!(error = %e, "failed to restrict session file permissions");
        }
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self) -> Option<AuthSession> {
        self.cached.read().unwrap().clone()
    }

    fn set(&self, session: AuthSession) {
        // Hold the write lock across the file write so cache and file move
        // together.
        let mut cached = self.cached.write().unwrap();
        persist(&self.path, &session);
        *cached = Some(session);
    }

    fn clear(&self) {
        let mut cached = self.cached.write().unwrap();
        *cached = None;
        if self.path.exists() {
            if let Err(e) = fs::remove_file(&self.path) {
                warn!(error = %e, "failed to remove session file");
            }
        }
    }
}

impl std::fmt::Debug for FileTokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileTokenStore")
            .field("path", &self.path)
            .field("session", &"[REDACTED]")
            .finish()
    }
}
