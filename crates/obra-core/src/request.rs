//! Transport-agnostic request description.

use serde_json::Value;

/// HTTP method for an API request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

/// How a request participates in authentication.
///
/// The classification is decided where the request is constructed, not by
/// matching URL substrings at interception time. A 401 from an [`Exempt`]
/// endpoint means "credentials invalid" and must never start a token
/// refresh.
///
/// [`Exempt`]: AuthClass::Exempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthClass {
    /// Stamped with the current access token; a 401 triggers the refresh
    /// flow.
    #[default]
    Required,
    /// Sent without a token; a 401 is surfaced directly. Login, OTP, and
    /// refresh endpoints belong here.
    Exempt,
}

/// A description of one outbound API call.
///
/// Built at the call site, dispatched through a [`Transport`], and — when a
/// refresh succeeds — replayed unchanged with the renewed token.
///
/// [`Transport`]: crate::transport::Transport
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<Value>,
    auth: AuthClass,
}

impl ApiRequest {
    /// Create a request for the given method and path.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            auth: AuthClass::Required,
        }
    }

    /// Shorthand for a GET request.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    /// Shorthand for a POST request.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    /// Shorthand for a PUT request.
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    /// Shorthand for a PATCH request.
    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::Patch, path)
    }

    /// Shorthand for a DELETE request.
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    /// Append a query string parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Attach a JSON body.
    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Mark this request as exempt from the refresh flow.
    pub fn exempt(mut self) -> Self {
        self.auth = AuthClass::Exempt;
        self
    }

    /// The request method.
    pub fn method(&self) -> Method {
        self.method
    }

    /// The request path, relative to the base URL.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Query string parameters.
    pub fn query_params(&self) -> &[(String, String)] {
        &self.query
    }

    /// The JSON body, if any.
    pub fn json_body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// The auth classification of this request.
    pub fn auth(&self) -> AuthClass {
        self.auth
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn requests_require_auth_by_default() {
        let request = ApiRequest::get("/partners");
        assert_eq!(request.auth(), AuthClass::Required);
    }

    #[test]
    fn exempt_marks_the_request() {
        let request = ApiRequest::post("/auth/login").exempt();
        assert_eq!(request.auth(), AuthClass::Exempt);
    }

    #[test]
    fn builder_accumulates_query_and_body() {
        let request = ApiRequest::get("/dealers")
            .query("region", "north")
            .query("limit", "20")
            .body(json!({"ignored": true}));

        assert_eq!(request.method(), Method::Get);
        assert_eq!(request.path(), "/dealers");
        assert_eq!(request.query_params().len(), 2);
        assert!(request.json_body().is_some());
    }
}
