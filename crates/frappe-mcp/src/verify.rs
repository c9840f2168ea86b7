//! Post-create verification.
//!
//! Some Frappe deployments answer an insert with HTTP 200 and a record-like
//! body even though the record was never committed. After every create the
//! claimed record is looked up again, first by name and then by searching
//! for the most distinctive submitted field.
//!
//! This is a heuristic. It cannot tell a failed fetch from a missing record,
//! and a content match under a different name counts as a plain failure.

use crate::backend::{FrappeBackend, ListQuery};
use crate::filters::FilterCondition;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Number of records requested by the filter search.
const SEARCH_LIMIT: u32 = 5;

/// Characters of `description` used for the prefix search.
const DESCRIPTION_PREFIX_CHARS: usize = 20;

/// Outcome of verifying a create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    /// Whether the record was found under the expected name.
    pub success: bool,

    /// What was checked and what was found.
    pub message: String,
}

impl VerificationResult {
    fn verified(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Check that the record described by `response` exists on the site.
///
/// Never returns an error: every failure, including remote errors during the
/// search, becomes an unsuccessful [`VerificationResult`].
pub async fn verify_creation(
    backend: &dyn FrappeBackend,
    doctype: &str,
    submitted: &Map<String, Value>,
    response: &Value,
) -> VerificationResult {
    let Some(name) = doc_name(response) else {
        return VerificationResult::failed("No document name in response");
    };
    let name = name.as_str();

    // Direct fetch. Errors are inconclusive and fall through to the search.
    match backend.get_doc(doctype, name, &[]).await {
        Ok(doc) if doc_name(&doc).as_deref() == Some(name) => {
            debug!(doctype, name, "Creation verified by direct fetch");
            return VerificationResult::verified("Verified by direct fetch");
        }
        Ok(doc) => {
            debug!(doctype, name, fetched = ?doc.get("name"), "Direct fetch returned a different record");
        }
        Err(e) => {
            debug!(doctype, name, error = %e, "Direct fetch inconclusive");
        }
    }

    let Some(condition) = distinguishing_filter(submitted) else {
        return VerificationResult::failed("No suitable filter available for verification");
    };

    let query = ListQuery {
        filters: vec![condition],
        fields: vec!["name".to_string()],
        limit: Some(SEARCH_LIMIT),
        ..ListQuery::default()
    };

    let matches = match backend.list_docs(doctype, &query).await {
        Ok(matches) => matches,
        Err(e) => return VerificationResult::failed(format!("Verification error: {}", e)),
    };

    if matches.is_empty() {
        return VerificationResult::failed("No documents found matching filters");
    }

    let names: Vec<String> = matches.iter().filter_map(doc_name).collect();

    if names.iter().any(|n| n == name) {
        debug!(doctype, name, "Creation verified by filter search");
        return VerificationResult::verified("Verified by filter search");
    }

    warn!(
        doctype,
        expected = name,
        found = ?names,
        "Documents matched the submitted content but not the returned name"
    );
    VerificationResult::failed(format!(
        "Found {} document(s) matching filters but none named {} (found: {})",
        matches.len(),
        name,
        names.join(", ")
    ))
}

/// The `name` of a record. Autoincrement DocTypes report it as a number.
pub fn doc_name(doc: &Value) -> Option<String> {
    match doc.get("name")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// The most distinguishing filter for the submitted values: exact `name`,
/// exact `title`, or a `like` prefix match on `description`.
pub fn distinguishing_filter(submitted: &Map<String, Value>) -> Option<FilterCondition> {
    if let Some(name) = submitted.get("name").filter(|v| is_present(v)) {
        return Some(FilterCondition::equals("name", name.clone()));
    }
    if let Some(title) = submitted.get("title").filter(|v| is_present(v)) {
        return Some(FilterCondition::equals("title", title.clone()));
    }
    submitted
        .get("description")
        .filter(|v| is_present(v))
        .map(|description| {
            let text = match description {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            let prefix: String = text.chars().take(DESCRIPTION_PREFIX_CHARS).collect();
            FilterCondition::new("description", "like", format!("{}%", prefix))
        })
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::stub::{not_found, server_error, StubBackend};
    use serde_json::json;

    fn values(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_missing_name_makes_no_calls() {
        let backend = StubBackend::new();

        let result = verify_creation(
            &backend,
            "ToDo",
            &values(json!({"description": "x"})),
            &json!({"description": "x"}),
        )
        .await;

        assert!(!result.success);
        assert_eq!(result.message, "No document name in response");
        assert_eq!(backend.network_calls(), 0);
    }

    #[tokio::test]
    async fn test_direct_fetch_skips_search() {
        let backend = StubBackend::new().with_fetch(Ok(json!({"name": "DOC-1"})));

        let result = verify_creation(
            &backend,
            "ToDo",
            &values(json!({"description": "x"})),
            &json!({"name": "DOC-1"}),
        )
        .await;

        assert!(result.success);
        assert_eq!(result.message, "Verified by direct fetch");
        assert_eq!(StubBackend::count(&backend.fetches), 1);
        assert_eq!(StubBackend::count(&backend.searches), 0);
    }

    #[tokio::test]
    async fn test_numeric_name_is_fetched_directly() {
        let backend = StubBackend::new().with_fetch(Ok(json!({"name": 42, "log": "x"})));

        let result = verify_creation(&backend, "Task Log", &Map::new(), &json!({"name": 42})).await;

        assert!(result.success);
        assert_eq!(result.message, "Verified by direct fetch");
        assert_eq!(StubBackend::count(&backend.fetches), 1);
    }

    #[tokio::test]
    async fn test_numeric_name_found_by_search() {
        let backend = StubBackend::new()
            .with_fetch(Err(server_error("timeout")))
            .with_search(Ok(vec![json!({"name": 41}), json!({"name": 42})]));

        let result = verify_creation(
            &backend,
            "Task Log",
            &values(json!({"title": "Nightly import"})),
            &json!({"name": 42}),
        )
        .await;

        assert!(result.success);
        assert_eq!(result.message, "Verified by filter search");
    }

    #[test]
    fn test_doc_name() {
        assert_eq!(doc_name(&json!({"name": "TODO-1"})).as_deref(), Some("TODO-1"));
        assert_eq!(doc_name(&json!({"name": 7})).as_deref(), Some("7"));
        assert_eq!(doc_name(&json!({"name": ""})), None);
        assert_eq!(doc_name(&json!({"name": null})), None);
        assert_eq!(doc_name(&json!({})), None);
    }

    #[tokio::test]
    async fn test_search_mismatch_fails() {
        let backend = StubBackend::new()
            .with_fetch(Err(not_found("ToDo", "DOC-1")))
            .with_search(Ok(vec![json!({"name": "DOC-2"}), json!({"name": "DOC-3"})]));

        let result = verify_creation(
            &backend,
            "ToDo",
            &values(json!({"title": "Quarterly report"})),
            &json!({"name": "DOC-1"}),
        )
        .await;

        assert!(!result.success);
        assert!(result.message.contains("none named DOC-1"));
        assert!(result.message.contains("DOC-2, DOC-3"));
    }

    #[tokio::test]
    async fn test_search_match_succeeds() {
        let backend = StubBackend::new()
            .with_fetch(Err(server_error("timeout")))
            .with_search(Ok(vec![json!({"name": "DOC-9"}), json!({"name": "DOC-1"})]));

        let result = verify_creation(
            &backend,
            "ToDo",
            &values(json!({"description": "Call the supplier about the delayed shipment"})),
            &json!({"name": "DOC-1"}),
        )
        .await;

        assert!(result.success);
        assert_eq!(result.message, "Verified by filter search");

        let query = backend.last_query.lock().unwrap().clone().unwrap();
        assert_eq!(
            query.filters,
            vec![FilterCondition::new("description", "like", "Call the supplier ab%")]
        );
        assert_eq!(query.limit, Some(5));
    }

    #[tokio::test]
    async fn test_fetched_record_with_other_name_is_inconclusive() {
        let backend = StubBackend::new()
            .with_fetch(Ok(json!({"name": "DOC-7"})))
            .with_search(Ok(vec![json!({"name": "DOC-1"})]));

        let result = verify_creation(
            &backend,
            "ToDo",
            &values(json!({"name": "DOC-1"})),
            &json!({"name": "DOC-1"}),
        )
        .await;

        assert!(result.success);
        assert_eq!(result.message, "Verified by filter search");
    }

    #[tokio::test]
    async fn test_no_filter_available() {
        let backend = StubBackend::new();

        let result = verify_creation(
            &backend,
            "ToDo",
            &values(json!({"priority": "High"})),
            &json!({"name": "DOC-1"}),
        )
        .await;

        assert!(!result.success);
        assert_eq!(result.message, "No suitable filter available for verification");
        assert_eq!(StubBackend::count(&backend.searches), 0);
    }

    #[tokio::test]
    async fn test_no_matches() {
        let backend = StubBackend::new().with_search(Ok(Vec::new()));

        let result = verify_creation(
            &backend,
            "ToDo",
            &values(json!({"title": "T"})),
            &json!({"name": "DOC-1"}),
        )
        .await;

        assert!(!result.success);
        assert_eq!(result.message, "No documents found matching filters");
    }

    #[tokio::test]
    async fn test_search_error_is_reported() {
        let backend = StubBackend::new().with_search(Err(server_error("Error during list: boom")));

        let result = verify_creation(
            &backend,
            "ToDo",
            &values(json!({"title": "T"})),
            &json!({"name": "DOC-1"}),
        )
        .await;

        assert!(!result.success);
        assert_eq!(result.message, "Verification error: Error during list: boom");
    }

    #[test]
    fn test_filter_priority() {
        let submitted = values(json!({"name": "N", "title": "T", "description": "D"}));
        assert_eq!(distinguishing_filter(&submitted), Some(FilterCondition::equals("name", "N")));

        let submitted = values(json!({"title": "T", "description": "D"}));
        assert_eq!(distinguishing_filter(&submitted), Some(FilterCondition::equals("title", "T")));

        let submitted = values(json!({"title": "", "description": "D"}));
        assert_eq!(
            distinguishing_filter(&submitted),
            Some(FilterCondition::new("description", "like", "D%"))
        );

        assert_eq!(distinguishing_filter(&Map::new()), None);
    }

    #[test]
    fn test_description_prefix_counts_characters() {
        let submitted = values(json!({"description": "Überprüfung der Lieferantenrechnung"}));
        let condition = distinguishing_filter(&submitted).unwrap();
        assert_eq!(condition.value, json!("Überprüfung der Lief%"));
    }
}
