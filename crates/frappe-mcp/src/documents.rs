//! Document operations.
//!
//! [`DocumentService`] validates caller input, normalises filters, and runs
//! the post-create verification. It is the only place that retries, and only
//! for creation.
//!
//! ## Verification failures
//!
//! [`DocumentService::create`] annotates: an unverified create is returned
//! as a [`CreatedDocument`] whose `verification.success` is `false`.
//! [`DocumentService::create_with_retry`] and
//! [`DocumentService::create_transactional`] raise: an unverified attempt
//! becomes [`FrappeError::Verification`], is retried with a brand-new insert,
//! and the last error is returned once attempts run out. A retry after an
//! inconclusive verification can therefore create duplicate records.

use crate::backend::{FrappeBackend, ListQuery, MethodVerb};
use crate::client::error::{FrappeError, FrappeResult};
use crate::filters;
use crate::retry::{with_retry, RetryConfig};
use crate::verify::{doc_name, verify_creation, VerificationResult};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Result of a create call together with its verification.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedDocument {
    /// Record returned by the site.
    pub document: Value,

    /// Post-create verification outcome.
    pub verification: VerificationResult,
}

impl CreatedDocument {
    /// Name assigned by the site, if the response carried one.
    pub fn name(&self) -> Option<String> {
        doc_name(&self.document)
    }

    /// Whether the record was confirmed to exist.
    pub fn is_verified(&self) -> bool {
        self.verification.success
    }

    /// The record with the verification attached under `_verification`.
    pub fn annotated(&self) -> Value {
        let mut document = self.document.clone();
        if let Value::Object(ref mut obj) = document {
            obj.insert(
                "_verification".to_string(),
                serde_json::to_value(&self.verification).unwrap_or(Value::Null),
            );
        }
        document
    }
}

/// Parameters of a list call.
#[derive(Debug, Clone, Default)]
pub struct ListRequest {
    /// Filters in any accepted shape (see [`crate::filters`]).
    pub filters: Option<Value>,

    /// Fields to return.
    pub fields: Vec<String>,

    /// Page length.
    pub limit: Option<u32>,

    /// Order clause.
    pub order_by: Option<String>,

    /// Records to skip.
    pub offset: Option<u32>,
}

/// Document CRUD against one Frappe site.
pub struct DocumentService {
    backend: Arc<dyn FrappeBackend>,
    retry: RetryConfig,
}

impl DocumentService {
    /// Create a service with the given backend and creation retry policy.
    pub fn new(backend: Arc<dyn FrappeBackend>, retry: RetryConfig) -> Self {
        Self { backend, retry }
    }

    /// Fetch a record.
    #[instrument(skip(self, fields))]
    pub async fn get(&self, doctype: &str, name: &str, fields: &[String]) -> FrappeResult<Value> {
        require("doctype", doctype)?;
        require("name", name)?;
        self.backend.get_doc(doctype, name, fields).await
    }

    /// Insert a record and verify it exists.
    ///
    /// An unverified create is returned, not raised.
    #[instrument(skip(self, values))]
    pub async fn create(
        &self,
        doctype: &str,
        values: &Map<String, Value>,
    ) -> FrappeResult<CreatedDocument> {
        require_values(doctype, values)?;

        let document = self.backend.insert_doc(doctype, values).await?;
        let verification = verify_creation(self.backend.as_ref(), doctype, values, &document).await;

        if !verification.success {
            warn!(
                doctype,
                name = ?document.get("name"),
                message = %verification.message,
                "Created document could not be verified"
            );
        }

        Ok(CreatedDocument {
            document,
            verification,
        })
    }

    /// Insert and verify, retrying the whole sequence with backoff.
    ///
    /// Uses the service's retry policy unless `retry` is given. Returns
    /// [`FrappeError::Verification`] if the last attempt was unverified.
    pub async fn create_with_retry(
        &self,
        doctype: &str,
        values: &Map<String, Value>,
        retry: Option<&RetryConfig>,
    ) -> FrappeResult<CreatedDocument> {
        require_values(doctype, values)?;
        let config = retry.unwrap_or(&self.retry);
        let operation = format!("create_document({})", doctype);

        with_retry(config, &operation, move || async move {
            let created = self.create(doctype, values).await?;
            if created.is_verified() {
                Ok(created)
            } else {
                Err(FrappeError::Verification {
                    doctype: doctype.to_string(),
                    name: created.name().unwrap_or_else(|| "<none>".to_string()),
                    message: created.verification.message,
                })
            }
        })
        .await
    }

    /// [`Self::create_with_retry`] wrapped in an operation log.
    ///
    /// The log goes to `tracing` only; it is not durable and is not used for
    /// recovery.
    pub async fn create_transactional(
        &self,
        doctype: &str,
        values: &Map<String, Value>,
    ) -> FrappeResult<CreatedDocument> {
        let operation_id = Uuid::now_v7();
        info!(%operation_id, doctype, phase = "start", "Create operation");

        let result = self.create_with_retry(doctype, values, None).await;

        match &result {
            Ok(created) => {
                info!(%operation_id, doctype, name = ?created.name(), phase = "success", "Create operation");
            }
            Err(e @ FrappeError::Verification { .. }) => {
                warn!(%operation_id, doctype, error = %e, phase = "failure", "Create operation");
            }
            Err(e) => {
                error!(%operation_id, doctype, error = %e, phase = "error", "Create operation");
            }
        }

        result
    }

    /// Apply `values` to an existing record. No verification is performed.
    #[instrument(skip(self, values))]
    pub async fn update(
        &self,
        doctype: &str,
        name: &str,
        values: &Map<String, Value>,
    ) -> FrappeResult<Value> {
        require("doctype", doctype)?;
        require("name", name)?;
        if values.is_empty() {
            return Err(FrappeError::validation("values must not be empty"));
        }
        self.backend.update_doc(doctype, name, values).await
    }

    /// Delete a record without checking that it exists.
    #[instrument(skip(self))]
    pub async fn delete(&self, doctype: &str, name: &str) -> FrappeResult<()> {
        require("doctype", doctype)?;
        require("name", name)?;
        self.backend.delete_doc(doctype, name).await
    }

    /// List records in the site's order.
    #[instrument(skip(self, request))]
    pub async fn list(&self, doctype: &str, request: &ListRequest) -> FrappeResult<Vec<Value>> {
        require("doctype", doctype)?;
        let filters = match request.filters {
            Some(ref f) => filters::normalize(f)?,
            None => Vec::new(),
        };

        let query = ListQuery {
            filters,
            fields: request.fields.clone(),
            limit: request.limit,
            order_by: request.order_by.clone(),
            offset: request.offset,
        };

        self.backend.list_docs(doctype, &query).await
    }

    /// Whether a record exists. Only a not-found answer means `false`.
    #[instrument(skip(self))]
    pub async fn exists(&self, doctype: &str, name: &str) -> FrappeResult<bool> {
        match self.get(doctype, name, &["name".to_string()]).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Count records matching `filters`.
    #[instrument(skip(self, raw_filters))]
    pub async fn count(&self, doctype: &str, raw_filters: Option<&Value>) -> FrappeResult<u64> {
        require("doctype", doctype)?;
        let conditions = match raw_filters {
            Some(f) => filters::normalize(f)?,
            None => Vec::new(),
        };

        let params = serde_json::json!({
            "doctype": doctype,
            "filters": conditions,
        });
        let count = self
            .backend
            .call_method("frappe.client.get_count", &params, MethodVerb::Get)
            .await?;

        count.as_u64().ok_or_else(|| {
            FrappeError::InvalidResponse(format!("get_count returned a non-integer: {}", count))
        })
    }
}

fn require(field: &str, value: &str) -> FrappeResult<()> {
    if value.trim().is_empty() {
        return Err(FrappeError::validation(format!("Missing required parameter: {}", field)));
    }
    Ok(())
}

fn require_values(doctype: &str, values: &Map<String, Value>) -> FrappeResult<()> {
    require("doctype", doctype)?;
    if values.is_empty() {
        return Err(FrappeError::validation("values must not be empty"));
    }
    Ok(())
}
