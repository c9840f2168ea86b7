//! Method tools
//!
//! Whitelisted server methods, query reports and a reachability check.

use super::{parse_args, render, ToolServices};
use crate::backend::{FrappeBackend, MethodVerb};
use crate::client::error::FrappeError;
use crate::health::{HealthChecker, RemoteStatus};
use crate::server::{McpServerError, McpServerResult, Tool, ToolContext};
use crate::types::{ToolDefinition, ToolResult};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Method behind `run_report`.
const QUERY_REPORT_METHOD: &str = "frappe.desk.query_report.run";

/// Tool to call a whitelisted server method.
pub struct CallMethodTool {
    backend: Arc<dyn FrappeBackend>,
}

#[async_trait]
impl Tool for CallMethodTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new("call_method", "Call a whitelisted server method")
            .with_category("methods")
            .with_schema(json!({
                "type": "object",
                "properties": {
                    "method": {
                        "type": "string",
                        "description": "Dotted method path, e.g. 'frappe.client.get_list'"
                    },
                    "params": {"type": "object", "description": "Method arguments"},
                    "http_method": {
                        "type": "string",
                        "enum": ["GET", "POST"],
                        "default": "POST"
                    }
                },
                "required": ["method"]
            }))
    }

    #[instrument(skip(self, args, _context), fields(tool = "call_method"))]
    async fn execute(&self, args: Value, _context: &ToolContext) -> McpServerResult<ToolResult> {
        let params: CallMethodParams = parse_args(args)?;

        let verb = match params.http_method.to_ascii_uppercase().as_str() {
            "GET" => MethodVerb::Get,
            "POST" => MethodVerb::Post,
            other => {
                return Err(McpServerError::InvalidParams(format!(
                    "http_method must be GET or POST, got {}",
                    other
                )))
            }
        };

        if params.method.trim().is_empty() {
            return Ok(ToolResult::from_error(&FrappeError::validation(
                "Missing required parameter: method",
            )));
        }

        debug!(method = %params.method, ?verb, "Calling method");
        let outcome = self
            .backend
            .call_method(&params.method, &Value::Object(params.params), verb)
            .await;
        Ok(render("call_method", outcome))
    }
}

#[derive(Debug, Deserialize)]
struct CallMethodParams {
    method: String,
    #[serde(default)]
    params: Map<String, Value>,
    #[serde(default = "default_http_method")]
    http_method: String,
}

fn default_http_method() -> String {
    "POST".to_string()
}

/// Tool to run a query or script report.
pub struct RunReportTool {
    backend: Arc<dyn FrappeBackend>,
}

#[async_trait]
impl Tool for RunReportTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new("run_report", "Run a query or script report and return its rows")
            .with_category("methods")
            .with_schema(json!({
                "type": "object",
                "properties": {
                    "report_name": {"type": "string", "description": "Report name, e.g. 'General Ledger'"},
                    "filters": {"type": "object", "description": "Report filters"}
                },
                "required": ["report_name"]
            }))
    }

    #[instrument(skip(self, args, _context), fields(tool = "run_report"))]
    async fn execute(&self, args: Value, _context: &ToolContext) -> McpServerResult<ToolResult> {
        let params: RunReportParams = parse_args(args)?;

        if params.report_name.trim().is_empty() {
            return Ok(ToolResult::from_error(&FrappeError::validation(
                "Missing required parameter: report_name",
            )));
        }

        let method_params = json!({
            "report_name": params.report_name,
            "filters": params.filters,
        });
        let outcome = self
            .backend
            .call_method(QUERY_REPORT_METHOD, &method_params, MethodVerb::Get)
            .await;
        Ok(render("run_report", outcome))
    }
}

#[derive(Debug, Deserialize)]
struct RunReportParams {
    report_name: String,
    #[serde(default)]
    filters: Map<String, Value>,
}

/// Tool to check that the site is reachable with the configured credentials.
pub struct PingTool {
    health: Arc<HealthChecker>,
}

#[async_trait]
impl Tool for PingTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new("ping", "Check that the Frappe site is reachable")
            .with_category("diagnostics")
    }

    #[instrument(skip(self, _args, _context), fields(tool = "ping"))]
    async fn execute(&self, _args: Value, _context: &ToolContext) -> McpServerResult<ToolResult> {
        let health = self.health.check().await;
        let is_down = health.status == RemoteStatus::Down;
        let mut result = render("ping", Ok(health));
        result.is_error = is_down;
        Ok(result)
    }
}

/// Get the method and diagnostic tools.
pub fn method_tools(services: &ToolServices) -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(CallMethodTool { backend: services.backend.clone() }),
        Arc::new(RunReportTool { backend: services.backend.clone() }),
        Arc::new(PingTool { health: services.health.clone() }),
    ]
}
