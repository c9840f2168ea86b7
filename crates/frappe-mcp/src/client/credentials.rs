//! Credential providers for token authentication.
//!
//! Frappe's token authentication sends `Authorization: token <key>:<secret>`.
//! The client asks a [`CredentialProvider`] for the pair on every request, so
//! callers can plug in rotated or per-tenant credentials without forking the
//! request path.

use super::config::FrappeConfig;
use std::fmt;

/// An API key/secret pair. Either part may be absent.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// API key.
    pub api_key: Option<String>,

    /// API secret.
    pub api_secret: Option<String>,
}

impl Credentials {
    /// Create a complete credential pair.
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            api_secret: Some(api_secret.into()),
        }
    }

    /// Whether both parts are present.
    pub fn is_complete(&self) -> bool {
        self.api_key.is_some() && self.api_secret.is_some()
    }

    /// Value of the `Authorization` header.
    ///
    /// Missing parts are rendered empty; the site rejects the malformed token
    /// and the failure is classified as an authentication error.
    pub fn authorization_header(&self) -> String {
        format!(
            "token {}:{}",
            self.api_key.as_deref().unwrap_or_default(),
            self.api_secret.as_deref().unwrap_or_default()
        )
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &self.api_secret.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Source of credentials for outgoing requests.
pub trait CredentialProvider: Send + Sync {
    /// Current credentials.
    fn credentials(&self) -> Credentials;
}

/// Fixed credentials, typically taken from [`FrappeConfig`].
#[derive(Debug, Clone)]
pub struct StaticCredentials(Credentials);

impl StaticCredentials {
    /// Wrap a credential pair.
    pub fn new(credentials: Credentials) -> Self {
        Self(credentials)
    }

    /// Take the credentials configured for the site.
    pub fn from_config(config: &FrappeConfig) -> Self {
        Self(Credentials {
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
        })
    }
}

impl CredentialProvider for StaticCredentials {
    fn credentials(&self) -> Credentials {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorization_header() {
        let creds = Credentials::new("abc", "xyz");
        assert_eq!(creds.authorization_header(), "token abc:xyz");
        assert!(creds.is_complete());
    }

    #[test]
    fn test_missing_parts_produce_malformed_header() {
        let creds = Credentials {
            api_key: Some("abc".to_string()),
            api_secret: None,
        };
        assert_eq!(creds.authorization_header(), "token abc:");
        assert!(!creds.is_complete());
    }

    #[test]
    fn test_debug_hides_secret() {
        let creds = Credentials::new("abc", "xyz");
        let printed = format!("{:?}", creds);
        assert!(!printed.contains("xyz"));
    }

    #[test]
    fn test_static_from_config() {
        let config = FrappeConfig::new("http://localhost:8000", "k", "s");
        let provider = StaticCredentials::from_config(&config);
        assert_eq!(provider.credentials(), Credentials::new("k", "s"));
    }
}
