//! Authenticated session and principal types.

use serde::{Deserialize, Serialize};

use super::tokens::{AccessToken, RefreshToken};

/// The role a principal holds on the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A general user requesting construction services.
    User,
    /// A service partner fulfilling requests.
    Partner,
    /// A materials dealer.
    Dealer,
    /// A platform administrator.
    Admin,
}

/// The authenticated account behind a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    /// Platform account id.
    pub id: String,
    /// Display name, if set.
    #[serde(default)]
    pub name: Option<String>,
    /// Contact email, if set.
    #[serde(default)]
    pub email: Option<String>,
    /// Contact phone, if set.
    #[serde(default)]
    pub phone: Option<String>,
    /// Account role.
    pub role: Role,
}

/// A complete authenticated session.
///
/// Both tokens are mandatory: a session either exists in full or not at all.
/// Partial sessions (one token without the other) cannot be represented.
/// Sessions are created on login/OTP-verify, replaced wholesale on every
/// successful refresh, and destroyed on logout or terminal refresh failure.
#[derive(Clone, PartialEq)]
pub struct AuthSession {
    /// Short-lived bearer token stamped onto requests.
    pub access_token: AccessToken,
    /// Longer-lived token exchanged at the refresh endpoint.
    pub refresh_token: RefreshToken,
    /// The account this session authenticates.
    pub principal: Principal,
}

impl AuthSession {
    /// Assemble a session from its parts.
    pub fn new(
        access_token: AccessToken,
        refresh_token: RefreshToken,
        principal: Principal,
    ) -> Self {
        Self {
            access_token,
            refresh_token,
            principal,
        }
    }
}

// Custom Debug impl that hides token material
impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("principal", &self.principal)
            .field("tokens", &"[REDACTED]")
            .finish()
    }
}
