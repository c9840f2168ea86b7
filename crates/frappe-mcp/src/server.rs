//! MCP server implementation
//!
//! Holds the tool registry and answers JSON-RPC requests. Tool failures are
//! reported as tool results with `isError: true`, never as JSON-RPC errors.

use crate::types::*;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

/// MCP server error types.
#[derive(Debug, Error)]
pub enum McpServerError {
    /// Tool not found
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Tool execution failed
    #[error("Tool execution failed: {0}")]
    ExecutionError(String),

    /// Invalid parameters
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for MCP server operations.
pub type McpServerResult<T> = Result<T, McpServerError>;

/// Trait for tool implementations.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool definition.
    fn definition(&self) -> ToolDefinition;

    /// Execute the tool with given arguments.
    async fn execute(
        &self,
        args: serde_json::Value,
        context: &ToolContext,
    ) -> McpServerResult<ToolResult>;
}

/// Context for tool execution.
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    /// Request correlation ID
    pub correlation_id: Option<String>,
}

impl ToolContext {
    /// Create an empty context.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Context carrying the JSON-RPC request id.
    pub fn for_request(id: &RequestId) -> Self {
        let correlation_id = match id {
            RequestId::String(s) => Some(s.clone()),
            RequestId::Number(n) => Some(n.to_string()),
            RequestId::Null => None,
        };
        Self { correlation_id }
    }
}

/// MCP server exposing Frappe tools.
pub struct McpServer {
    info: ServerInfo,
    capabilities: ServerCapabilities,
    tools: Arc<RwLock<HashMap<String, Arc<dyn Tool>>>>,
    categories: Arc<RwLock<Vec<String>>>,
}

impl McpServer {
    /// Create a new MCP server.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            info: ServerInfo {
                name: name.into(),
                version: version.into(),
            },
            capabilities: ServerCapabilities {
                tools: Some(ToolCapabilities { list_changed: false }),
                experimental: HashMap::new(),
            },
            tools: Arc::new(RwLock::new(HashMap::new())),
            categories: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Create with the crate's name and version.
    pub fn frappe() -> Self {
        Self::new("frappe-mcp", env!("CARGO_PKG_VERSION"))
    }

    /// Register a tool, replacing any tool with the same name.
    pub async fn register_tool(&self, tool: Arc<dyn Tool>) {
        let definition = tool.definition();

        if let Some(ref category) = definition.category {
            let mut categories = self.categories.write().await;
            if !categories.contains(category) {
                categories.push(category.clone());
            }
        }

        let mut tools = self.tools.write().await;
        tools.insert(definition.name, tool);
    }

    /// Register multiple tools.
    pub async fn register_tools(&self, tools: Vec<Arc<dyn Tool>>) {
        for tool in tools {
            self.register_tool(tool).await;
        }
    }

    /// All tool definitions, sorted by name.
    pub async fn list_tools(&self) -> Vec<ToolDefinition> {
        let tools = self.tools.read().await;
        let mut definitions: Vec<_> = tools.values().map(|t| t.definition()).collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }

    /// Tool definitions in one category.
    pub async fn list_tools_by_category(&self, category: &str) -> Vec<ToolDefinition> {
        self.list_tools()
            .await
            .into_iter()
            .filter(|d| d.category.as_deref() == Some(category))
            .collect()
    }

    /// Categories in registration order.
    pub async fn list_categories(&self) -> Vec<String> {
        self.categories.read().await.clone()
    }

    /// Execute a tool.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
        context: &ToolContext,
    ) -> McpServerResult<ToolResult> {
        let tool = {
            let tools = self.tools.read().await;
            tools
                .get(name)
                .cloned()
                .ok_or_else(|| McpServerError::ToolNotFound(name.to_string()))?
        };

        tool.execute(arguments, context).await
    }

    /// Handle an MCP request. Returns `None` for notifications.
    #[instrument(skip(self, request), fields(method = %request.method))]
    pub async fn handle_request(&self, request: McpRequest) -> Option<McpResponse> {
        let Some(id) = request.id else {
            debug!("Notification received");
            return None;
        };

        if request.jsonrpc != "2.0" {
            warn!(jsonrpc = %request.jsonrpc, "Unsupported JSON-RPC version");
            return Some(McpResponse::error(id, McpError::invalid_request()));
        }

        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(id),
            "ping" => McpResponse::success(id, serde_json::json!({})),
            "tools/list" => self.handle_tools_list(id).await,
            "tools/call" => self.handle_tools_call(id, request.params).await,
            _ => McpResponse::error(id, McpError::method_not_found(&request.method)),
        };
        Some(response)
    }

    fn handle_initialize(&self, id: RequestId) -> McpResponse {
        McpResponse::success(
            id,
            serde_json::json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": self.capabilities,
                "serverInfo": self.info
            }),
        )
    }

    async fn handle_tools_list(&self, id: RequestId) -> McpResponse {
        let tools = self.list_tools().await;
        McpResponse::success(id, serde_json::json!({ "tools": tools }))
    }

    async fn handle_tools_call(
        &self,
        id: RequestId,
        params: Option<serde_json::Value>,
    ) -> McpResponse {
        let params = match params {
            Some(p) => p,
            None => return McpResponse::error(id, McpError::invalid_params("Missing params")),
        };

        let call: ToolCall = match serde_json::from_value(params) {
            Ok(c) => c,
            Err(e) => return McpResponse::error(id, McpError::invalid_params(e.to_string())),
        };

        let context = ToolContext::for_request(&id);

        let result = match self.call_tool(&call.name, call.arguments, &context).await {
            Ok(result) => result,
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Tool call rejected");
                ToolResult::error(e.to_string())
            }
        };

        match serde_json::to_value(result) {
            Ok(value) => McpResponse::success(id, value),
            Err(e) => McpResponse::error(id, McpError::internal_error(e.to_string())),
        }
    }

    /// Get server info.
    pub fn info(&self) -> &ServerInfo {
        &self.info
    }
}
