//! Reachability check for the Frappe site.
//!
//! ```rust,no_run
//! use frappe_mcp::client::{FrappeClient, FrappeConfig};
//! use frappe_mcp::health::HealthChecker;
//! use std::sync::Arc;
//!
//! async fn check() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = FrappeConfig::from_env();
//!     let site = config.base_url.clone();
//!     let checker = HealthChecker::new(Arc::new(FrappeClient::new(config)?), site);
//!
//!     let health = checker.check().await;
//!     println!("{}: {:?} ({}ms)", health.site, health.status, health.latency_ms);
//!     Ok(())
//! }
//! ```

use crate::backend::{FrappeBackend, MethodVerb};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{instrument, warn};

/// Latency above which a reachable site is reported as degraded.
pub const DEFAULT_DEGRADED_THRESHOLD_MS: u64 = 2000;

/// Site status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteStatus {
    /// Answered within the threshold.
    Up,
    /// Answered, but slowly.
    Degraded,
    /// Did not answer, or answered with an error.
    Down,
}

/// Result of one check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteHealth {
    /// Base URL of the checked site.
    pub site: String,

    /// Probe outcome.
    pub status: RemoteStatus,

    /// Round-trip time in milliseconds.
    pub latency_ms: u64,

    /// Time of the check (RFC 3339).
    pub timestamp: String,

    /// Failure message when the site is down.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Probes a site with `frappe.ping`.
pub struct HealthChecker {
    backend: Arc<dyn FrappeBackend>,
    site: String,
    degraded_threshold_ms: u64,
}

impl HealthChecker {
    /// Probe `site` through `backend` with the default threshold.
    pub fn new(backend: Arc<dyn FrappeBackend>, site: impl Into<String>) -> Self {
        Self {
            backend,
            site: site.into(),
            degraded_threshold_ms: DEFAULT_DEGRADED_THRESHOLD_MS,
        }
    }

    /// Override the degraded threshold, in milliseconds.
    pub fn with_degraded_threshold(mut self, threshold_ms: u64) -> Self {
        self.degraded_threshold_ms = threshold_ms;
        self
    }

    /// Ping the site once.
    #[instrument(skip(self), fields(site = %self.site))]
    pub async fn check(&self) -> RemoteHealth {
        let start = Instant::now();
        let result = self
            .backend
            .call_method("frappe.ping", &serde_json::json!({}), MethodVerb::Get)
            .await;
        let latency_ms = start.elapsed().as_millis() as u64;

        let (status, error) = match result {
            Ok(_) if latency_ms > self.degraded_threshold_ms => {
                warn!(latency_ms, "Site response time exceeds threshold");
                (RemoteStatus::Degraded, None)
            }
            Ok(_) => (RemoteStatus::Up, None),
            Err(e) => {
                warn!(error = %e, "Site ping failed");
                (RemoteStatus::Down, Some(e.to_string()))
            }
        };

        RemoteHealth {
            site: self.site.clone(),
            status,
            latency_ms,
            timestamp: chrono::Utc::now().to_rfc3339(),
            error,
        }
    }
}
