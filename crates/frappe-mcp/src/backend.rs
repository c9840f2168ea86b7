//! Resource-oriented operations against a Frappe site.
//!
//! [`FrappeBackend`] is the seam between the document/schema services and the
//! HTTP adapter. [`crate::client::FrappeClient`] implements it over the REST
//! API; tests substitute an in-memory stub.

use crate::client::error::FrappeResult;
use crate::filters::FilterCondition;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

/// HTTP verb used for a whitelisted method call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodVerb {
    /// Parameters are sent as the query string.
    Get,
    /// Parameters are sent as a JSON body.
    Post,
}

/// A normalised list request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ListQuery {
    /// Filter triples.
    pub filters: Vec<FilterCondition>,

    /// Fields to return; empty means the site default (`name`).
    pub fields: Vec<String>,

    /// Page length. `Some(0)` asks the site for every record.
    pub limit: Option<u32>,

    /// Order clause, e.g. `"modified desc"`.
    pub order_by: Option<String>,

    /// Number of records to skip.
    pub offset: Option<u32>,
}

/// Remote operations used by the services.
#[async_trait]
pub trait FrappeBackend: Send + Sync {
    /// Fetch one record, optionally projecting `fields`.
    async fn get_doc(&self, doctype: &str, name: &str, fields: &[String]) -> FrappeResult<Value>;

    /// Insert a record and return the site's response record.
    async fn insert_doc(&self, doctype: &str, values: &Map<String, Value>) -> FrappeResult<Value>;

    /// Apply `values` to an existing record and return the updated record.
    async fn update_doc(
        &self,
        doctype: &str,
        name: &str,
        values: &Map<String, Value>,
    ) -> FrappeResult<Value>;

    /// Delete a record.
    async fn delete_doc(&self, doctype: &str, name: &str) -> FrappeResult<()>;

    /// List records matching a query, in the site's order.
    async fn list_docs(&self, doctype: &str, query: &ListQuery) -> FrappeResult<Vec<Value>>;

    /// Call a whitelisted method and return its `message`.
    async fn call_method(&self, method: &str, params: &Value, verb: MethodVerb)
        -> FrappeResult<Value>;
}
