//! Session lifecycle events surfaced to the host application.

use crate::error::ApiError;

/// A session lifecycle signal.
///
/// Emitted at most once per failure episode, however many callers were
/// queued on it. The host application reacts by navigating to an
/// unauthenticated entry point; this crate only emits the signal.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The stored session was cleared after a terminal refresh failure
    /// (refresh rejected, or no refresh token existed).
    Expired {
        /// The normalized error that ended the session.
        reason: ApiError,
    },
}
