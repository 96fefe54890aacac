//! Transport seam between the client and the network.

use async_trait::async_trait;
use serde_json::Value;

use crate::auth::AccessToken;
use crate::error::ApiError;
use crate::request::ApiRequest;

/// A received HTTP response.
///
/// Any HTTP status — including 401 and 5xx — arrives here as `Ok`; only
/// connection-level failures (no response at all) are transport errors.
/// That distinction is what lets the refresh coordinator see expired-token
/// responses without conflating them with network failures.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: u16,
    /// Parsed JSON body, if the response carried one.
    pub body: Option<Value>,
}

impl RawResponse {
    /// True for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Dispatches one request and returns the response.
///
/// Implementations own per-request concerns like timeouts. The token
/// parameter is stamped as a bearer authorization header when present;
/// passing it explicitly (rather than reading shared state inside the
/// transport) is what allows a replay to carry a renewed token.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the request, optionally authenticated.
    ///
    /// # Errors
    ///
    /// Returns an error only when no response was received (connection
    /// failure, timeout). HTTP error statuses are returned as `Ok`.
    async fn send(
        &self,
        request: &ApiRequest,
        token: Option<&AccessToken>,
    ) -> Result<RawResponse, ApiError>;
}
