//! obra-core - Core types and traits for the obra platform API client.

pub mod auth;
pub mod error;
pub mod events;
pub mod request;
pub mod store;
pub mod transport;
pub mod types;

pub use auth::{AccessToken, AuthSession, Principal, RefreshToken, Role};
pub use error::{ApiError, InvalidUrlError};
pub use events::SessionEvent;
pub use request::{ApiRequest, AuthClass, Method};
pub use store::{MemoryTokenStore, TokenStore};
pub use transport::{RawResponse, Transport};
pub use types::BaseUrl;

/// Result type alias using the crate's normalized error type.
pub type Result<T> = std::result::Result<T, ApiError>;
