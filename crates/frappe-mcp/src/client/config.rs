//! Frappe site configuration.
//!
//! Provides the connection settings for the remote Frappe site: base URL,
//! API credentials and timeout settings. Configuration is loaded from
//! environment variables with sensible defaults for local development.

use super::error::{FrappeError, FrappeResult};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Missing required environment variable.
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    /// Invalid configuration value.
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue {
        /// Configuration key.
        key: String,
        /// Error message.
        message: String,
    },
}

/// Connection settings for a Frappe site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrappeConfig {
    /// Base URL of the site (e.g., "https://erp.example.com").
    pub base_url: String,

    /// API key of the integration user.
    pub api_key: Option<String>,

    /// API secret of the integration user.
    pub api_secret: Option<String>,

    /// Request timeout in seconds.
    pub timeout_secs: u64,

    /// Maximum create attempts used by the verified-create retry path.
    pub max_retries: u32,

    /// Whether to verify TLS certificates (disable only for testing).
    pub verify_tls: bool,
}

impl Default for FrappeConfig {
    /// Returns default configuration suitable for a local bench.
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            api_key: None,
            api_secret: None,
            timeout_secs: 30,
            max_retries: 3,
            verify_tls: true,
        }
    }
}

impl FrappeConfig {
    /// Create a configuration for the given site with credentials.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: Some(api_key.into()),
            api_secret: Some(api_secret.into()),
            ..Self::default()
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `FRAPPE_URL`: Site URL (default: http://localhost:8000)
    /// - `FRAPPE_API_KEY`: API key
    /// - `FRAPPE_API_SECRET`: API secret
    /// - `FRAPPE_TIMEOUT_SECS`: Request timeout in seconds (default: 30)
    /// - `FRAPPE_MAX_RETRIES`: Create attempts for verified creates (default: 3)
    /// - `FRAPPE_VERIFY_TLS`: Whether to verify TLS (default: true)
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            base_url: std::env::var("FRAPPE_URL").unwrap_or(default.base_url),
            api_key: non_empty_env("FRAPPE_API_KEY"),
            api_secret: non_empty_env("FRAPPE_API_SECRET"),
            timeout_secs: std::env::var("FRAPPE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.timeout_secs),
            max_retries: std::env::var("FRAPPE_MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.max_retries),
            verify_tls: std::env::var("FRAPPE_VERIFY_TLS")
                .map(|s| s != "false" && s != "0")
                .unwrap_or(default.verify_tls),
        }
    }

    /// Get the request timeout as a Duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Check that credentials are present and the base URL parses.
    ///
    /// Missing credentials are not fatal for the server: every call will be
    /// rejected by the site and reported as an authentication failure.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Url::parse(&self.base_url).map_err(|e| ConfigError::InvalidValue {
            key: "FRAPPE_URL".to_string(),
            message: e.to_string(),
        })?;
        if self.api_key.is_none() {
            return Err(ConfigError::MissingEnvVar("FRAPPE_API_KEY".to_string()));
        }
        if self.api_secret.is_none() {
            return Err(ConfigError::MissingEnvVar("FRAPPE_API_SECRET".to_string()));
        }
        Ok(())
    }

    /// URL of a DocType collection, or of one record when `name` is given.
    pub fn resource_url(&self, doctype: &str, name: Option<&str>) -> FrappeResult<Url> {
        let mut segments = vec!["api", "resource", doctype];
        if let Some(name) = name {
            segments.push(name);
        }
        self.api_url(&segments)
    }

    /// URL of a whitelisted server method.
    pub fn method_url(&self, method: &str) -> FrappeResult<Url> {
        self.api_url(&["api", "method", method])
    }

    fn api_url(&self, segments: &[&str]) -> FrappeResult<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| FrappeError::Configuration(format!("invalid base URL {}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| FrappeError::Configuration(format!("base URL cannot be a base: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
