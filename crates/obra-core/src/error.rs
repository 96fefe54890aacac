//! Normalized error types for the obra API client.
//!
//! Every terminal failure a caller can observe is an [`ApiError`]: a uniform
//! `{code, message, status, details}` shape produced regardless of whether the
//! underlying failure was a connection error, an HTTP error response, or a
//! client-side refresh failure. Callers never see raw transport errors.

use std::fmt;

use serde_json::Value;
use thiserror::Error;

/// Error code for failures where no response was received at all.
pub const NETWORK_ERROR: &str = "NETWORK_ERROR";

/// Error code for failures injected by test/mock transports.
pub const MOCK_ERROR: &str = "MOCK_ERROR";

/// Error code used when the session cannot be refreshed (no refresh token,
/// or the refresh episode ended the session).
pub const SESSION_EXPIRED: &str = "SESSION_EXPIRED";

/// Error code used when an in-flight refresh episode was abandoned before
/// settling (e.g. the leading task was cancelled).
pub const REFRESH_ABORTED: &str = "REFRESH_ABORTED";

/// The normalized error surfaced by every client operation.
///
/// `code` is either a server-supplied error code, `HTTP_<status>` when the
/// server supplied none, or one of the transport/refresh codes above.
/// `status` is present only when an HTTP response was actually received.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable message for display.
    pub message: String,
    /// HTTP status code, if a response was received.
    pub status: Option<u16>,
    /// Server-supplied detail payload, if any.
    pub details: Option<Value>,
}

impl ApiError {
    /// A connection-level failure: DNS, TLS, refused connection, timeout.
    /// No response was received, so `status` is absent.
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            code: NETWORK_ERROR.to_string(),
            message: message.into(),
            status: None,
            details: None,
        }
    }

    /// A failure injected by a mock transport in tests.
    pub fn mock(message: impl Into<String>) -> Self {
        Self {
            code: MOCK_ERROR.to_string(),
            message: message.into(),
            status: None,
            details: None,
        }
    }

    /// The session ended without a usable refresh token.
    pub fn session_expired(message: impl Into<String>) -> Self {
        Self {
            code: SESSION_EXPIRED.to_string(),
            message: message.into(),
            status: None,
            details: None,
        }
    }

    /// The refresh episode this caller was queued on never settled.
    pub fn refresh_aborted() -> Self {
        Self {
            code: REFRESH_ABORTED.to_string(),
            message: "token refresh was interrupted before completing".to_string(),
            status: None,
            details: None,
        }
    }

    /// A request that could not be serialized before dispatch.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            code: "INVALID_REQUEST".to_string(),
            message: message.into(),
            status: None,
            details: None,
        }
    }

    /// A successful response whose body did not match the expected shape.
    pub fn decode(message: impl Into<String>) -> Self {
        Self {
            code: "DECODE_ERROR".to_string(),
            message: message.into(),
            status: None,
            details: None,
        }
    }

    /// Normalize an HTTP error response into an [`ApiError`].
    ///
    /// Prefers the server's own `code`/`message` fields; falls back to
    /// `HTTP_<status>` and a fixed default message table. Never panics,
    /// whatever shape the body has.
    pub fn from_response(status: u16, body: Option<&Value>) -> Self {
        let code = body
            .and_then(|b| b.get("code"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("HTTP_{status}"));

        let message = body
            .and_then(|b| {
                b.get("message")
                    .and_then(Value::as_str)
                    .or_else(|| b.get("error").and_then(Value::as_str))
            })
            .map(str::to_string)
            .unwrap_or_else(|| default_message_for(status).to_string());

        let details = body.map(|b| b.get("details").unwrap_or(b).clone());

        Self {
            code,
            message,
            status: Some(status),
            details,
        }
    }

    /// True if this error carries the given HTTP status.
    pub fn is_status(&self, status: u16) -> bool {
        self.status == Some(status)
    }
}

/// Default display message for an HTTP status without a server message.
pub fn default_message_for(status: u16) -> &'static str {
    match status {
        400 => "invalid request",
        401 => "authentication required",
        403 => "forbidden",
        404 => "not found",
        409 => "conflict",
        422 => "validation error",
        500 => "server error",
        503 => "service unavailable",
        _ => "request failed",
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code)?;
        if let Some(status) = self.status {
            write!(f, " ({status})")?;
        }
        write!(f, ": {}", self.message)
    }
}

impl std::error::Error for ApiError {}

/// Error returned when a base URL fails validation.
#[derive(Debug, Error)]
#[error("invalid base URL '{value}': {reason}")]
pub struct InvalidUrlError {
    /// The rejected input.
    pub value: String,
    /// Why it was rejected.
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn response_with_server_code_and_message() {
        let body = json!({
            "code": "PARTNER_NOT_FOUND",
            "message": "no partner with that id",
            "details": {"id": "p-17"}
        });
        let err = ApiError::from_response(404, Some(&body));

        assert_eq!(err.code, "PARTNER_NOT_FOUND");
        assert_eq!(err.message, "no partner with that id");
        assert_eq!(err.status, Some(404));
        assert_eq!(err.details, Some(json!({"id": "p-17"})));
    }

    #[test]
    fn response_without_code_falls_back_to_http_status() {
        let err = ApiError::from_response(500, None);

        assert_eq!(err.code, "HTTP_500");
        assert_eq!(err.message, "server error");
        assert_eq!(err.status, Some(500));
        assert!(err.details.is_none());
    }

    #[test]
    fn response_with_error_field_used_as_message() {
        let body = json!({"error": "Unprocessable Entity"});
        let err = ApiError::from_response(422, Some(&body));

        assert_eq!(err.code, "HTTP_422");
        assert_eq!(err.message, "Unprocessable Entity");
    }

    #[test]
    fn details_fall_back_to_whole_body() {
        let body = json!({"message": "conflict", "existing": "d-3"});
        let err = ApiError::from_response(409, Some(&body));

        assert_eq!(err.details, Some(body));
    }

    #[test]
    fn non_object_body_does_not_panic() {
        let body = json!("plain text error");
        let err = ApiError::from_response(503, Some(&body));

        assert_eq!(err.code, "HTTP_503");
        assert_eq!(err.message, "service unavailable");
        assert_eq!(err.details, Some(body));
    }

    #[test]
    fn default_message_table() {
        assert_eq!(default_message_for(400), "invalid request");
        assert_eq!(default_message_for(401), "authentication required");
        assert_eq!(default_message_for(403), "forbidden");
        assert_eq!(default_message_for(404), "not found");
        assert_eq!(default_message_for(409), "conflict");
        assert_eq!(default_message_for(422), "validation error");
        assert_eq!(default_message_for(500), "server error");
        assert_eq!(default_message_for(503), "service unavailable");
        assert_eq!(default_message_for(418), "request failed");
    }

    #[test]
    fn network_error_has_no_status() {
        let err = ApiError::network("connection refused");
        assert_eq!(err.code, NETWORK_ERROR);
        assert!(err.status.is_none());
        assert_eq!(err.to_string(), "NETWORK_ERROR: connection refused");
    }

    #[test]
    fn display_includes_status_when_present() {
        let err = ApiError::from_response(403, None);
        assert_eq!(err.to_string(), "HTTP_403 (403): forbidden");
    }
}
