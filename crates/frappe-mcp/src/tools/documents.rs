//! Document tools
//!
//! CRUD, listing, existence checks and counts over Frappe documents.

use super::{parse_args, render, ToolServices};
use crate::documents::{DocumentService, ListRequest};
use crate::server::{McpServerResult, Tool, ToolContext};
use crate::types::{ToolDefinition, ToolResult};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, instrument};

const CATEGORY: &str = "documents";

/// Tool to create a document and verify it was stored.
///
/// Without `retry`, an unverified create is still returned, with the
/// verification outcome under `_verification`. With `retry`, the create is
/// repeated with backoff and a final unverified attempt is an error.
pub struct CreateDocumentTool {
    documents: Arc<DocumentService>,
}

#[async_trait]
impl Tool for CreateDocumentTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "create_document",
            "Create a document and verify that it exists afterwards",
        )
        .with_category(CATEGORY)
        .with_schema(json!({
            "type": "object",
            "properties": {
                "doctype": {
                    "type": "string",
                    "description": "DocType of the new document, e.g. 'ToDo'"
                },
                "values": {
                    "type": "object",
                    "description": "Field values of the new document"
                },
                "retry": {
                    "type": "boolean",
                    "description": "Retry with backoff until the document is verified; may create duplicates",
                    "default": false
                }
            },
            "required": ["doctype", "values"]
        }))
    }

    #[instrument(skip(self, args, context), fields(tool = "create_document", correlation_id = ?context.correlation_id))]
    async fn execute(&self, args: Value, context: &ToolContext) -> McpServerResult<ToolResult> {
        let params: CreateDocumentParams = parse_args(args)?;

        debug!(doctype = %params.doctype, retry = params.retry, "Creating document");

        let outcome = if params.retry {
            self.documents
                .create_transactional(&params.doctype, &params.values)
                .await
        } else {
            self.documents.create(&params.doctype, &params.values).await
        };

        Ok(render("create_document", outcome.map(|created| created.annotated())))
    }
}

#[derive(Debug, Deserialize)]
struct CreateDocumentParams {
    doctype: String,
    #[serde(alias = "data")]
    values: Map<String, Value>,
    #[serde(default)]
    retry: bool,
}

/// Tool to fetch one document.
pub struct GetDocumentTool {
    documents: Arc<DocumentService>,
}

#[async_trait]
impl Tool for GetDocumentTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new("get_document", "Fetch a document by DocType and name")
            .with_category(CATEGORY)
            .with_schema(json!({
                "type": "object",
                "properties": {
                    "doctype": {"type": "string", "description": "DocType of the document"},
                    "name": {"type": "string", "description": "Document name"},
                    "fields": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Fields to return; all fields when omitted"
                    }
                },
                "required": ["doctype", "name"]
            }))
    }

    #[instrument(skip(self, args, _context), fields(tool = "get_document"))]
    async fn execute(&self, args: Value, _context: &ToolContext) -> McpServerResult<ToolResult> {
        let params: DocumentRef = parse_args(args)?;
        let outcome = self
            .documents
            .get(&params.doctype, &params.name, &params.fields)
            .await;
        Ok(render("get_document", outcome))
    }
}

#[derive(Debug, Deserialize)]
struct DocumentRef {
    doctype: String,
    name: String,
    #[serde(default)]
    fields: Vec<String>,
}

/// Tool to update fields of an existing document.
pub struct UpdateDocumentTool {
    documents: Arc<DocumentService>,
}

#[async_trait]
impl Tool for UpdateDocumentTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new("update_document", "Update fields of an existing document")
            .with_category(CATEGORY)
            .with_schema(json!({
                "type": "object",
                "properties": {
                    "doctype": {"type": "string", "description": "DocType of the document"},
                    "name": {"type": "string", "description": "Document name"},
                    "values": {"type": "object", "description": "Fields to change"}
                },
                "required": ["doctype", "name", "values"]
            }))
    }

    #[instrument(skip(self, args, _context), fields(tool = "update_document"))]
    async fn execute(&self, args: Value, _context: &ToolContext) -> McpServerResult<ToolResult> {
        let params: UpdateDocumentParams = parse_args(args)?;
        let outcome = self
            .documents
            .update(&params.doctype, &params.name, &params.values)
            .await;
        Ok(render("update_document", outcome))
    }
}

#[derive(Debug, Deserialize)]
struct UpdateDocumentParams {
    doctype: String,
    name: String,
    #[serde(alias = "data")]
    values: Map<String, Value>,
}

/// Tool to delete a document.
pub struct DeleteDocumentTool {
    documents: Arc<DocumentService>,
}

#[async_trait]
impl Tool for DeleteDocumentTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new("delete_document", "Delete a document")
            .with_category(CATEGORY)
            .with_schema(json!({
                "type": "object",
                "properties": {
                    "doctype": {"type": "string", "description": "DocType of the document"},
                    "name": {"type": "string", "description": "Document name"}
                },
                "required": ["doctype", "name"]
            }))
    }

    #[instrument(skip(self, args, _context), fields(tool = "delete_document"))]
    async fn execute(&self, args: Value, _context: &ToolContext) -> McpServerResult<ToolResult> {
        let params: DocumentRef = parse_args(args)?;
        let outcome = self
            .documents
            .delete(&params.doctype, &params.name)
            .await
            .map(|()| {
                json!({
                    "deleted": true,
                    "doctype": params.doctype,
                    "name": params.name,
                })
            });
        Ok(render("delete_document", outcome))
    }
}

/// Tool to list documents matching filters.
pub struct ListDocumentsTool {
    documents: Arc<DocumentService>,
}

#[async_trait]
impl Tool for ListDocumentsTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new("list_documents", "List documents of a DocType, optionally filtered")
            .with_category(CATEGORY)
            .with_schema(json!({
                "type": "object",
                "properties": {
                    "doctype": {"type": "string", "description": "DocType to list"},
                    "filters": {
                        "description": "Either {field: value | [operator, value]} or a list of [field, operator, value]",
                        "oneOf": [{"type": "object"}, {"type": "array"}, {"type": "string"}]
                    },
                    "fields": {"type": "array", "items": {"type": "string"}},
                    "limit": {"type": "integer", "minimum": 0, "description": "Page length; 0 returns everything"},
                    "order_by": {"type": "string", "description": "e.g. 'modified desc'"},
                    "offset": {"type": "integer", "minimum": 0}
                },
                "required": ["doctype"]
            }))
    }

    #[instrument(skip(self, args, _context), fields(tool = "list_documents"))]
    async fn execute(&self, args: Value, _context: &ToolContext) -> McpServerResult<ToolResult> {
        let params: ListDocumentsParams = parse_args(args)?;
        let request = ListRequest {
            filters: params.filters,
            fields: params.fields,
            limit: params.limit,
            order_by: params.order_by,
            offset: params.offset,
        };
        let outcome = self.documents.list(&params.doctype, &request).await;
        Ok(render("list_documents", outcome))
    }
}

#[derive(Debug, Deserialize)]
struct ListDocumentsParams {
    doctype: String,
    filters: Option<Value>,
    #[serde(default)]
    fields: Vec<String>,
    limit: Option<u32>,
    order_by: Option<String>,
    offset: Option<u32>,
}

/// Tool to check whether a document exists.
pub struct CheckDocumentExistsTool {
    documents: Arc<DocumentService>,
}

#[async_trait]
impl Tool for CheckDocumentExistsTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new("check_document_exists", "Check whether a document exists")
            .with_category(CATEGORY)
            .with_schema(json!({
                "type": "object",
                "properties": {
                    "doctype": {"type": "string"},
                    "name": {"type": "string"}
                },
                "required": ["doctype", "name"]
            }))
    }

    #[instrument(skip(self, args, _context), fields(tool = "check_document_exists"))]
    async fn execute(&self, args: Value, _context: &ToolContext) -> McpServerResult<ToolResult> {
        let params: DocumentRef = parse_args(args)?;
        let outcome = self
            .documents
            .exists(&params.doctype, &params.name)
            .await
            .map(|exists| {
                json!({
                    "doctype": params.doctype,
                    "name": params.name,
                    "exists": exists,
                })
            });
        Ok(render("check_document_exists", outcome))
    }
}

/// Tool to count documents matching filters.
pub struct CountDocumentsTool {
    documents: Arc<DocumentService>,
}

#[async_trait]
impl Tool for CountDocumentsTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new("count_documents", "Count documents of a DocType, optionally filtered")
            .with_category(CATEGORY)
            .with_schema(json!({
                "type": "object",
                "properties": {
                    "doctype": {"type": "string"},
                    "filters": {"oneOf": [{"type": "object"}, {"type": "array"}, {"type": "string"}]}
                },
                "required": ["doctype"]
            }))
    }

    #[instrument(skip(self, args, _context), fields(tool = "count_documents"))]
    async fn execute(&self, args: Value, _context: &ToolContext) -> McpServerResult<ToolResult> {
        let params: CountDocumentsParams = parse_args(args)?;
        let outcome = self
            .documents
            .count(&params.doctype, params.filters.as_ref())
            .await
            .map(|count| json!({"doctype": params.doctype, "count": count}));
        Ok(render("count_documents", outcome))
    }
}

#[derive(Debug, Deserialize)]
struct CountDocumentsParams {
    doctype: String,
    filters: Option<Value>,
}

/// Get all document tools.
pub fn document_tools(services: &ToolServices) -> Vec<Arc<dyn Tool>> {
    let documents = &services.documents;
    vec![
        Arc::new(CreateDocumentTool { documents: documents.clone() }),
        Arc::new(GetDocumentTool { documents: documents.clone() }),
        Arc::new(UpdateDocumentTool { documents: documents.clone() }),
        Arc::new(DeleteDocumentTool { documents: documents.clone() }),
        Arc::new(ListDocumentsTool { documents: documents.clone() }),
        Arc::new(CheckDocumentExistsTool { documents: documents.clone() }),
        Arc::new(CountDocumentsTool { documents: documents.clone() }),
    ]
}
