//! MCP tools
//!
//! Each tool deserialises its arguments, calls one service operation and
//! renders the outcome. Operation errors are rendered as error results with a
//! details block; malformed arguments are rejected before any remote call.

pub mod documents;
pub mod methods;
pub mod schema;

pub use documents::*;
pub use methods::*;
pub use schema::*;

use crate::backend::FrappeBackend;
use crate::client::error::FrappeResult;
use crate::documents::DocumentService;
use crate::health::HealthChecker;
use crate::retry::RetryConfig;
use crate::schema::SchemaService;
use crate::server::{McpServerError, McpServerResult, Tool};
use crate::types::ToolResult;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

/// Services shared by the tools.
#[derive(Clone)]
pub struct ToolServices {
    /// Document CRUD and verified creation.
    pub documents: Arc<DocumentService>,

    /// DocType metadata.
    pub schema: Arc<SchemaService>,

    /// Site reachability.
    pub health: Arc<HealthChecker>,

    /// Raw backend, for whitelisted method and report calls.
    pub backend: Arc<dyn FrappeBackend>,
}

impl ToolServices {
    /// Build every service over one backend.
    pub fn new(backend: Arc<dyn FrappeBackend>, site: impl Into<String>, retry: RetryConfig) -> Self {
        Self {
            documents: Arc::new(DocumentService::new(backend.clone(), retry)),
            schema: Arc::new(SchemaService::new(backend.clone())),
            health: Arc::new(HealthChecker::new(backend.clone(), site)),
            backend,
        }
    }
}

/// Get all available MCP tools.
///
/// ```rust,no_run
/// use frappe_mcp::client::{FrappeClient, FrappeConfig};
/// use frappe_mcp::retry::RetryConfig;
/// use frappe_mcp::tools::{all_tools, ToolServices};
/// use std::sync::Arc;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = FrappeConfig::from_env();
/// let site = config.base_url.clone();
/// let services = ToolServices::new(Arc::new(FrappeClient::new(config)?), site, RetryConfig::default());
/// println!("Available tools: {}", all_tools(&services).len());
/// # Ok(())
/// # }
/// ```
pub fn all_tools(services: &ToolServices) -> Vec<Arc<dyn Tool>> {
    let mut tools = Vec::new();
    tools.extend(document_tools(services));
    tools.extend(schema_tools(services));
    tools.extend(method_tools(services));
    tools
}

/// Deserialise tool arguments; a null argument object counts as empty.
pub(crate) fn parse_args<T: DeserializeOwned>(args: serde_json::Value) -> McpServerResult<T> {
    let args = if args.is_null() {
        serde_json::json!({})
    } else {
        args
    };
    serde_json::from_value(args).map_err(|e| McpServerError::InvalidParams(e.to_string()))
}

/// Render an operation outcome as a tool result.
pub(crate) fn render<T: Serialize>(tool: &str, outcome: FrappeResult<T>) -> ToolResult {
    match outcome {
        Ok(value) => match serde_json::to_value(value) {
            Ok(json) => ToolResult::json(json),
            Err(e) => ToolResult::error(format!("Failed to encode result: {}", e)),
        },
        Err(e) => {
            warn!(tool, error = %e, "Tool operation failed");
            ToolResult::from_error(&e)
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::backend::stub::StubBackend;

    pub(crate) fn services(backend: Arc<StubBackend>) -> ToolServices {
        ToolServices::new(backend, "http://erp.test", RetryConfig::creation(1))
    }

    pub(crate) fn text(result: &ToolResult) -> &str {
        result.first_text().unwrap_or_default()
    }

    pub(crate) fn json_of(result: &ToolResult) -> serde_json::Value {
        serde_json::from_str(text(result)).unwrap()
    }
}
