//! Schema tools
//!
//! DocType definitions, field options, and module/DocType discovery.

use super::{parse_args, render, ToolServices};
use crate::schema::SchemaService;
use crate::server::{McpServerResult, Tool, ToolContext};
use crate::types::{ToolDefinition, ToolResult};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::instrument;

const CATEGORY: &str = "schema";

/// Tool to fetch a DocType definition.
pub struct GetDocTypeSchemaTool {
    schema: Arc<SchemaService>,
}

#[async_trait]
impl Tool for GetDocTypeSchemaTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "get_doctype_schema",
            "Get the fields, permissions and naming rule of a DocType",
        )
        .with_category(CATEGORY)
        .with_schema(json!({
            "type": "object",
            "properties": {
                "doctype": {"type": "string", "description": "DocType name, e.g. 'Sales Invoice'"}
            },
            "required": ["doctype"]
        }))
    }

    #[instrument(skip(self, args, _context), fields(tool = "get_doctype_schema"))]
    async fn execute(&self, args: Value, _context: &ToolContext) -> McpServerResult<ToolResult> {
        let params: DocTypeParams = parse_args(args)?;
        Ok(render(
            "get_doctype_schema",
            self.schema.get_schema(&params.doctype).await,
        ))
    }
}

#[derive(Debug, Deserialize)]
struct DocTypeParams {
    doctype: String,
}

/// Tool to list the values a field accepts.
pub struct GetFieldOptionsTool {
    schema: Arc<SchemaService>,
}

#[async_trait]
impl Tool for GetFieldOptionsTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "get_field_options",
            "List the values a Link or Select field accepts",
        )
        .with_category(CATEGORY)
        .with_schema(json!({
            "type": "object",
            "properties": {
                "doctype": {"type": "string"},
                "fieldname": {"type": "string"},
                "filters": {
                    "description": "Filters applied to the linked DocType",
                    "oneOf": [{"type": "object"}, {"type": "array"}, {"type": "string"}]
                }
            },
            "required": ["doctype", "fieldname"]
        }))
    }

    #[instrument(skip(self, args, _context), fields(tool = "get_field_options"))]
    async fn execute(&self, args: Value, _context: &ToolContext) -> McpServerResult<ToolResult> {
        let params: FieldOptionsParams = parse_args(args)?;
        let outcome = self
            .schema
            .get_field_options(&params.doctype, &params.fieldname, params.filters.as_ref())
            .await;
        Ok(render("get_field_options", outcome))
    }
}

#[derive(Debug, Deserialize)]
struct FieldOptionsParams {
    doctype: String,
    fieldname: String,
    filters: Option<Value>,
}

/// Tool to list installed modules.
pub struct ListModulesTool {
    schema: Arc<SchemaService>,
}

#[async_trait]
impl Tool for ListModulesTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new("list_modules", "List the modules installed on the site")
            .with_category(CATEGORY)
    }

    #[instrument(skip(self, _args, _context), fields(tool = "list_modules"))]
    async fn execute(&self, _args: Value, _context: &ToolContext) -> McpServerResult<ToolResult> {
        Ok(render("list_modules", self.schema.list_modules().await))
    }
}

/// Tool to list DocTypes.
pub struct ListDocTypesTool {
    schema: Arc<SchemaService>,
}

#[async_trait]
impl Tool for ListDocTypesTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new("list_doctypes", "List DocTypes, optionally only those of one module")
            .with_category(CATEGORY)
            .with_schema(json!({
                "type": "object",
                "properties": {
                    "module": {"type": "string", "description": "Module name, e.g. 'Accounts'"}
                },
                "required": []
            }))
    }

    #[instrument(skip(self, args, _context), fields(tool = "list_doctypes"))]
    async fn execute(&self, args: Value, _context: &ToolContext) -> McpServerResult<ToolResult> {
        let params: ListDocTypesParams = parse_args(args)?;
        Ok(render(
            "list_doctypes",
            self.schema.list_doctypes(params.module.as_deref()).await,
        ))
    }
}

#[derive(Debug, Deserialize)]
struct ListDocTypesParams {
    module: Option<String>,
}

/// Get all schema tools.
pub fn schema_tools(services: &ToolServices) -> Vec<Arc<dyn Tool>> {
    let schema = &services.schema;
    vec![
        Arc::new(GetDocTypeSchemaTool { schema: schema.clone() }),
        Arc::new(GetFieldOptionsTool { schema: schema.clone() }),
        Arc::new(ListModulesTool { schema: schema.clone() }),
        Arc::new(ListDocTypesTool { schema: schema.clone() }),
    ]
}
