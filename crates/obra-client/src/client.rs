//! The public API client.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument};

use obra_core::{
    AccessToken, ApiError, ApiRequest, AuthClass, AuthSession, BaseUrl, MemoryTokenStore,
    Principal, RefreshToken, Result, SessionEvent, TokenStore, Transport,
};

use crate::endpoints::{
    AuthResponse, LOGIN, LoginRequest, OTP_REQUEST, OTP_VERIFY, OtpRequest, OtpVerifyRequest,
};
use crate::http::HttpTransport;
use crate::refresh::RefreshCoordinator;

/// Authenticated HTTP client for the obra platform API.
///
/// Every call resolves with the typed response body, or rejects with a
/// normalized [`ApiError`] — callers never see raw transport errors or
/// unrefreshed 401s. Expired access tokens are recovered transparently with
/// a single shared refresh; a failed refresh clears the session and emits
/// one [`SessionEvent::Expired`] to [`subscribe`]rs.
///
/// Construct with [`ApiClient::new`] for the default reqwest transport and
/// in-memory store, or [`ApiClient::with_parts`] to inject either — tests
/// instantiate fresh clients with their own stores rather than sharing a
/// singleton.
///
/// [`subscribe`]: ApiClient::subscribe
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    store: Arc<dyn TokenStore>,
    refresh: RefreshCoordinator,
    events: broadcast::Sender<SessionEvent>,
}

impl ApiClient {
    /// Create a client with the default HTTP transport and an in-memory
    /// session store.
    pub fn new(base: BaseUrl) -> Self {
        Self::with_parts(
            Arc::new(HttpTransport::new(base)),
            Arc::new(MemoryTokenStore::new()),
        )
    }

    /// Create a client from an explicit transport and session store.
    pub fn with_parts(transport: Arc<dyn Transport>, store: Arc<dyn TokenStore>) -> Self {
        let (events, _) = broadcast::channel(16);
        let refresh = RefreshCoordinator::new(
            Arc::clone(&store),
            Arc::clone(&transport),
            events.clone(),
        );
        Self {
            transport,
            store,
            refresh,
            events,
        }
    }

    /// Subscribe to session lifecycle events.
    ///
    /// The host application listens here for [`SessionEvent::Expired`] and
    /// navigates to its unauthenticated entry point.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// The currently authenticated principal, if any.
    pub fn principal(&self) -> Option<Principal> {
        self.store.get().map(|s| s.principal)
    }

    /// True when a session is stored.
    pub fn is_authenticated(&self) -> bool {
        self.store.get().is_some()
    }

    // ========================================================================
    // Authentication
    // ========================================================================

    /// Log in with email and password.
    ///
    /// A 401 here means invalid credentials and is surfaced directly; the
    /// login endpoint never enters the refresh flow.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<Principal> {
        info!("logging in");
        let body = to_body(&LoginRequest { email, password })?;
        let value = self
            .execute(ApiRequest::post(LOGIN).exempt().body(body))
            .await?;
        self.store_session(value)
    }

    /// Request a one-time password for the given phone number.
    #[instrument(skip(self))]
    pub async fn request_otp(&self, phone: &str) -> Result<()> {
        let body = to_body(&OtpRequest { phone })?;
        self.execute(ApiRequest::post(OTP_REQUEST).exempt().body(body))
            .await?;
        Ok(())
    }

    /// Verify a one-time password and establish a session.
    #[instrument(skip(self, code))]
    pub async fn verify_otp(&self, phone: &str, code: &str) -> Result<Principal> {
        let body = to_body(&OtpVerifyRequest { phone, code })?;
        let value = self
            .execute(ApiRequest::post(OTP_VERIFY).exempt().body(body))
            .await?;
        self.store_session(value)
    }

    /// Clear the local session.
    ///
    /// No [`SessionEvent`] is emitted: events signal failure episodes, and a
    /// caller-initiated logout needs no notification.
    pub fn logout(&self) {
        info!("logging out");
        self.store.clear();
    }

    // ========================================================================
    // Typed request helpers
    // ========================================================================

    /// GET a resource.
    pub async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R> {
        self.send(ApiRequest::get(path)).await
    }

    /// GET a resource with query string parameters.
    pub async fn get_with_query<R: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<R> {
        let mut request = ApiRequest::get(path);
        for (key, value) in query {
            request = request.query(*key, *value);
        }
        self.send(request).await
    }

    /// POST a JSON body.
    pub async fn post<B: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R> {
        self.send(ApiRequest::post(path).body(to_body(body)?)).await
    }

    /// PUT a JSON body.
    pub async fn put<B: Serialize, R: DeserializeOwned>(&self, path: &str, body: &B) -> Result<R> {
        self.send(ApiRequest::put(path).body(to_body(body)?)).await
    }

    /// PATCH a JSON body.
    pub async fn patch<B: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R> {
        self.send(ApiRequest::patch(path).body(to_body(body)?))
            .await
    }

    /// DELETE a resource.
    pub async fn delete(&self, path: &str) -> Result<()> {
        self.execute(ApiRequest::delete(path)).await?;
        Ok(())
    }

    /// Dispatch a pre-built request and deserialize the response body.
    pub async fn send<R: DeserializeOwned>(&self, request: ApiRequest) -> Result<R> {
        let value = self.execute(request).await?;
        serde_json::from_value(value)
            .map_err(|e| ApiError::decode(format!("unexpected response shape: {e}")))
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    /// The full request lifecycle: stamp the current token, send, and on an
    /// expired-token 401 perform one shared refresh and one replay.
    async fn execute(&self, request: ApiRequest) -> Result<Value> {
        // Token stamping is a synchronous read of the store; refresh is only
        // ever triggered reactively by a 401, never by token age.
        let token = match request.auth() {
            AuthClass::Required => self.store.get().map(|s| s.access_token),
            AuthClass::Exempt => None,
        };

        let response = self.transport.send(&request, token.as_ref()).await?;

        if response.status != 401 || request.auth() == AuthClass::Exempt {
            return into_result(response);
        }

        // Expired token: join (or start) the refresh episode, then replay
        // the original request once with the renewed token. The replay's
        // outcome is terminal — a second 401 surfaces normalized instead of
        // triggering another refresh.
        debug!(path = request.path(), "401 received, entering refresh flow");
        let renewed = self.refresh.refreshed_token().await?;
        let response = self.transport.send(&request, Some(&renewed)).await?;
        into_result(response)
    }

    fn store_session(&self, value: Value) -> Result<Principal> {
        let auth: AuthResponse = serde_json::from_value(value)
            .map_err(|e| ApiError::decode(format!("malformed auth response: {e}")))?;
        let principal = auth.user.clone();
        self.store.set(AuthSession::new(
            AccessToken::new(auth.access_token),
            RefreshToken::new(auth.refresh_token),
            auth.user,
        ));
        Ok(principal)
    }
}

/// Convert a success response to its body and an error response to the
/// normalized error shape.
fn into_result(response: obra_core::RawResponse) -> Result<Value> {
    if response.is_success() {
        Ok(response.body.unwrap_or(Value::Null))
    } else {
        Err(ApiError::from_response(response.status, response.body.as_ref()))
    }
}

fn to_body<B: Serialize>(body: &B) -> Result<Value> {
    serde_json::to_value(body)
        .map_err(|e| ApiError::invalid_request(format!("failed to serialize request body: {e}")))
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}
