//! API base URL type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

use crate::error::InvalidUrlError;

/// A validated API base URL.
///
/// Must use HTTPS, or HTTP for localhost (which keeps mock-server tests and
/// local development working without TLS).
///
/// # Example
///
/// ```
/// use obra_core::BaseUrl;
///
/// let base = BaseUrl::new("https://api.obra.example").unwrap();
/// assert_eq!(base.endpoint_url("/auth/login"),
///            "https://api.obra.example/auth/login");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BaseUrl(Url);

impl BaseUrl {
    /// Create a new base URL from a string, validating the format.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL does not parse or uses a disallowed
    /// scheme.
    pub fn new(s: impl AsRef<str>) -> Result<Self, InvalidUrlError> {
        let s = s.as_ref();
        let url = Url::parse(s).map_err(|e| InvalidUrlError {
            value: s.to_string(),
            reason: e.to_string(),
        })?;

        Self::validate(&url, s)?;

        // Normalize: remove trailing slash
        let normalized = if url.path() == "/" {
            let mut u = url.clone();
            u.set_path("");
            u
        } else {
            url
        };

        Ok(Self(normalized))
    }

    /// Returns the absolute URL for an endpoint path.
    pub fn endpoint_url(&self, path: &str) -> String {
        // The url crate always adds a trailing slash to root paths,
        // so trim it before joining the endpoint path
        let base = self.0.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{path}")
    }

    /// Returns the base URL as a string.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the inner URL.
    pub fn as_url(&self) -> &Url {
        &self.0
    }

    /// Returns the host string.
    pub fn host(&self) -> Option<&str> {
        self.0.host_str()
    }

    fn validate(url: &Url, original: &str) -> Result<(), InvalidUrlError> {
        match url.scheme() {
            "https" => Ok(()),
            "http" => {
                let is_local = matches!(url.host_str(), Some("localhost") | Some("127.0.0.1"));
                if is_local {
                    Ok(())
                } else {
                    Err(InvalidUrlError {
                        value: original.to_string(),
                        reason: "http is only allowed for localhost".to_string(),
                    })
                }
            }
            other => Err(InvalidUrlError {
                value: original.to_string(),
                reason: format!("unsupported scheme '{other}'"),
            }),
        }
    }
}

impl fmt::Display for BaseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BaseUrl {
    type Err = InvalidUrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Serialize for BaseUrl {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.0.as_str())
    }
}

impl<'de> Deserialize<'de> for BaseUrl {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::new(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn https_urls_accepted() {
        let base = BaseUrl::new("https://api.obra.example").unwrap();
        assert_eq!(base.host(), Some("api.obra.example"));
    }

    #[test]
    fn http_localhost_accepted() {
        assert!(BaseUrl::new("http://127.0.0.1:3000").is_ok());
        assert!(BaseUrl::new("http://localhost:3000").is_ok());
    }

    #[test]
    fn http_remote_rejected() {
        assert!(BaseUrl::new("http://api.obra.example").is_err());
    }

    #[test]
    fn other_schemes_rejected() {
        assert!(BaseUrl::new("ftp://api.obra.example").is_err());
    }

    #[test]
    fn endpoint_url_joins_cleanly() {
        let base = BaseUrl::new("https://api.obra.example/").unwrap();
        assert_eq!(
            base.endpoint_url("/partners/p-1"),
            "https://api.obra.example/partners/p-1"
        );
        assert_eq!(
            base.endpoint_url("auth/refresh"),
            "https://api.obra.example/auth/refresh"
        );
    }
}
