//! # Frappe MCP
//!
//! An MCP (Model Context Protocol) server exposing a Frappe site's REST API as
//! tools, so an AI assistant can read and write business records.
//!
//! ## Overview
//!
//! - **Client**: token-authenticated REST adapter, response normalisation and
//!   error classification
//! - **Documents**: CRUD, listing, counts, and verified creation
//! - **Schema**: DocType definitions and field options
//! - **Tools**: MCP tool definitions over the services
//! - **JSON-RPC**: MCP protocol handling and a stdio transport
//!
//! ## Verified creation
//!
//! Some Frappe deployments acknowledge an insert without committing it. Every
//! create is therefore followed by a lookup of the returned record, first by
//! name and then by a filter on the most distinctive submitted field. See
//! [`verify`] and [`documents`].
//!
//! ## Available Tools
//!
//! ### Documents
//! - `create_document`, `get_document`, `update_document`, `delete_document`
//! - `list_documents`, `check_document_exists`, `count_documents`
//!
//! ### Schema
//! - `get_doctype_schema`, `get_field_options`, `list_modules`, `list_doctypes`
//!
//! ### Methods and diagnostics
//! - `call_method`, `run_report`, `ping`
//!
//! ## Usage
//!
//! ```rust,no_run
//! use frappe_mcp::client::{FrappeClient, FrappeConfig};
//! use frappe_mcp::tools::{all_tools, ToolServices};
//! use frappe_mcp::{McpRequest, McpServer, RetryConfig};
//! use std::sync::Arc;
//!
//! async fn handle(json: &str) -> Result<(), Box<dyn std::error::Error>> {
//!     let config = FrappeConfig::new("https://erp.example.com", "key", "secret");
//!     let site = config.base_url.clone();
//!     let client = Arc::new(FrappeClient::new(config)?);
//!
//!     let server = McpServer::frappe();
//!     server
//!         .register_tools(all_tools(&ToolServices::new(client, site, RetryConfig::default())))
//!         .await;
//!
//!     let request: McpRequest = serde_json::from_str(json)?;
//!     if let Some(response) = server.handle_request(request).await {
//!         println!("{}", serde_json::to_string(&response)?);
//!     }
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod client;
pub mod documents;
pub mod filters;
pub mod health;
pub mod retry;
pub mod schema;
pub mod server;
pub mod tools;
pub mod transport;
pub mod types;
pub mod verify;

// Re-export main types
pub use backend::{FrappeBackend, ListQuery, MethodVerb};
pub use client::{FrappeClient, FrappeConfig, FrappeError, FrappeResult};
pub use documents::{CreatedDocument, DocumentService, ListRequest};
pub use filters::FilterCondition;
pub use health::{HealthChecker, RemoteHealth, RemoteStatus};
pub use retry::{with_retry, RetryConfig};
pub use schema::{DocTypeSchema, FieldDef, FieldOption, SchemaService};
pub use server::{McpServer, McpServerError, McpServerResult, Tool, ToolContext};
pub use types::{
    ContentBlock, McpError, McpRequest, McpResponse, RequestId, ServerCapabilities, ServerInfo,
    ToolCall, ToolCapabilities, ToolDefinition, ToolResult,
};
pub use verify::{verify_creation, VerificationResult};
