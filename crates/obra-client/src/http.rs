//! reqwest-backed transport implementation.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, trace};

use obra_core::{
    AccessToken, ApiError, ApiRequest, BaseUrl, Method, RawResponse, Transport,
};

/// Default per-request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP transport for the obra API.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base: BaseUrl,
}

impl HttpTransport {
    /// Create a transport for the given base URL with the default timeout.
    pub fn new(base: BaseUrl) -> Self {
        Self::with_timeout(base, DEFAULT_TIMEOUT)
    }

    /// Create a transport with a custom per-request timeout.
    pub fn with_timeout(base: BaseUrl, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("obra-client/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .expect("failed to build HTTP client");

        Self { client, base }
    }

    /// Returns the base URL this transport is configured for.
    pub fn base(&self) -> &BaseUrl {
        &self.base
    }
}

fn reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

/// Map a connection-level reqwest failure to the normalized shape.
fn connection_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::network("request timed out")
    } else if err.is_connect() {
        ApiError::network(format!("connection failed: {err}"))
    } else {
        ApiError::network(err.to_string())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        request: &ApiRequest,
        token: Option<&AccessToken>,
    ) -> Result<RawResponse, ApiError> {
        let url = self.base.endpoint_url(request.path());
        debug!(method = ?request.method(), path = request.path(), "API request");

        let mut builder = self.client.request(reqwest_method(request.method()), &url);

        if !request.query_params().is_empty() {
            builder = builder.query(request.query_params());
        }
        if let Some(body) = request.json_body() {
            builder = builder.json(body);
        }
        if let Some(token) = token {
            builder = builder.bearer_auth(token.as_str());
        }

        let response = builder.send().await.map_err(connection_error)?;
        let status = response.status().as_u16();
        trace!(status, "API response");

        let bytes = response.bytes().await.map_err(connection_error)?;
        let body = if bytes.is_empty() {
            None
        } else {
            // Non-JSON bodies (HTML error pages from proxies) normalize
            // through the status code alone.
            serde_json::from_slice(&bytes).ok()
        };

        Ok(RawResponse { status, body })
    }
}
