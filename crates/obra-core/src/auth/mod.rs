//! Authentication types: tokens, sessions, principals.

pub mod session;
pub mod tokens;

pub use session::{AuthSession, Principal, Role};
pub use tokens::{AccessToken, RefreshToken};
