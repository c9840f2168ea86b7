//! REST implementation of [`FrappeBackend`].
//!
//! Maps the backend operations onto `/api/resource/{doctype}[/{name}]` and
//! `/api/method/{name}`. Operation labels such as `create_document(ToDo)`
//! prefix every classified error message.

use super::error::FrappeResult;
use super::http::FrappeClient;
use crate::backend::{FrappeBackend, ListQuery, MethodVerb};
use crate::filters;
use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::instrument;

#[async_trait]
impl FrappeBackend for FrappeClient {
    #[instrument(skip(self, fields))]
    async fn get_doc(&self, doctype: &str, name: &str, fields: &[String]) -> FrappeResult<Value> {
        let url = self.config().resource_url(doctype, Some(name))?;
        let mut query = Vec::new();
        if !fields.is_empty() {
            query.push(("fields".to_string(), json_param(fields)));
        }
        let operation = format!("get_document({})", doctype);
        let doc = self.get(&operation, url, &query).await?.into_object()?;
        Ok(Value::Object(doc))
    }

    #[instrument(skip(self, values))]
    async fn insert_doc(&self, doctype: &str, values: &Map<String, Value>) -> FrappeResult<Value> {
        let url = self.config().resource_url(doctype, None)?;
        let operation = format!("create_document({})", doctype);
        let body = Value::Object(values.clone());
        Ok(self.post(&operation, url, &body).await?.into_value())
    }

    #[instrument(skip(self, values))]
    async fn update_doc(
        &self,
        doctype: &str,
        name: &str,
        values: &Map<String, Value>,
    ) -> FrappeResult<Value> {
        let url = self.config().resource_url(doctype, Some(name))?;
        let operation = format!("update_document({})", doctype);
        let body = Value::Object(values.clone());
        Ok(self.put(&operation, url, &body).await?.into_value())
    }

    #[instrument(skip(self))]
    async fn delete_doc(&self, doctype: &str, name: &str) -> FrappeResult<()> {
        let url = self.config().resource_url(doctype, Some(name))?;
        let operation = format!("delete_document({})", doctype);
        self.delete(&operation, url).await?;
        Ok(())
    }

    #[instrument(skip(self, query))]
    async fn list_docs(&self, doctype: &str, query: &ListQuery) -> FrappeResult<Vec<Value>> {
        let url = self.config().resource_url(doctype, None)?;
        let operation = format!("list_documents({})", doctype);
        self.get(&operation, url, &list_params(query)).await?.into_list()
    }

    #[instrument(skip(self, params))]
    async fn call_method(
        &self,
        method: &str,
        params: &Value,
        verb: MethodVerb,
    ) -> FrappeResult<Value> {
        let url = self.config().method_url(method)?;
        let operation = format!("call_method({})", method);
        let payload = match verb {
            MethodVerb::Get => self.get(&operation, url, &query_params(params)).await?,
            MethodVerb::Post => self.post(&operation, url, params).await?,
        };
        Ok(payload.into_value())
    }
}

/// Query-string parameters for a list request.
pub(crate) fn list_params(query: &ListQuery) -> Vec<(String, String)> {
    let mut params = Vec::new();
    if !query.fields.is_empty() {
        params.push(("fields".to_string(), json_param(&query.fields)));
    }
    if !query.filters.is_empty() {
        params.push(("filters".to_string(), filters::to_query_param(&query.filters)));
    }
    if let Some(limit) = query.limit {
        params.push(("limit_page_length".to_string(), limit.to_string()));
    }
    if let Some(offset) = query.offset {
        params.push(("limit_start".to_string(), offset.to_string()));
    }
    if let Some(ref order_by) = query.order_by {
        params.push(("order_by".to_string(), order_by.clone()));
    }
    params
}

/// Flatten a JSON object into query parameters; non-string values are
/// JSON-encoded.
pub(crate) fn query_params(params: &Value) -> Vec<(String, String)> {
    match params {
        Value::Object(map) => map
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| {
                let value = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), value)
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn json_param(fields: &[String]) -> String {
    serde_json::to_string(fields).unwrap_or_else(|_| "[]".to_string())
}
