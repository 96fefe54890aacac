//! obra-client - Authenticated HTTP client for the obra platform API.
//!
//! The client stamps a bearer token onto every authenticated request and
//! transparently recovers from expired-token responses: the first 401 on a
//! refreshable request triggers a single token refresh (shared by every
//! concurrent caller that hits a 401 while it is in flight), after which the
//! original request is replayed once with the new token. If the refresh
//! itself fails, the session is cleared and a [`SessionEvent::Expired`]
//! signal is emitted so the host application can return to its login screen.
//!
//! # Example
//!
//! ```no_run
//! use obra_client::ApiClient;
//! use obra_core::BaseUrl;
//!
//! # async fn example() -> obra_core::Result<()> {
//! let base = BaseUrl::new("https://api.obra.example").unwrap();
//! let client = ApiClient::new(base);
//!
//! let principal = client.login("alice@example.com", "password").await?;
//! println!("Logged in as {}", principal.id);
//!
//! let partners: serde_json::Value = client.get("/partners").await?;
//! # Ok(())
//! # }
//! ```
//!
//! [`SessionEvent::Expired`]: obra_core::SessionEvent::Expired

pub mod client;
pub mod endpoints;
pub mod http;
pub mod refresh;
pub mod store;

pub use client::ApiClient;
pub use http::HttpTransport;
pub use store::FileTokenStore;
