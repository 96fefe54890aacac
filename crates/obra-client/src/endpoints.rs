//! Auth endpoint definitions and request/response types.

use serde::{Deserialize, Serialize};

use obra_core::Principal;

// ============================================================================
// Endpoint Paths
// ============================================================================

/// POST /auth/login
pub const LOGIN: &str = "/auth/login";

/// POST /auth/refresh
pub const REFRESH: &str = "/auth/refresh";

/// POST /auth/otp/request
pub const OTP_REQUEST: &str = "/auth/otp/request";

/// POST /auth/otp/verify
pub const OTP_VERIFY: &str = "/auth/otp/verify";

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for login.
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Request body for requesting an OTP code.
#[derive(Debug, Serialize)]
pub struct OtpRequest<'a> {
    pub phone: &'a str,
}

/// Request body for verifying an OTP code.
#[derive(Debug, Serialize)]
pub struct OtpVerifyRequest<'a> {
    pub phone: &'a str,
    pub code: &'a str,
}

/// Request body for the token refresh endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

/// Response from login, OTP verification, and refresh.
///
/// All three return a complete session: both tokens and the principal
/// together, never a partial set.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: Principal,
}
