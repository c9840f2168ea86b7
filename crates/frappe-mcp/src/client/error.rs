//! Error types and classification of failed Frappe exchanges.
//!
//! Frappe reports failures in several shapes: HTTP status codes, an
//! `exception` string, a doubly JSON-encoded `_server_messages` list, or a
//! plain `message`. [`classify`] folds all of them into a [`FrappeError`]
//! carrying an [`ApiError`] with a human-readable message.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Result type for Frappe operations.
pub type FrappeResult<T> = Result<T, FrappeError>;

/// Frappe client errors.
#[derive(Debug, Clone, Error)]
pub enum FrappeError {
    /// Missing or malformed caller arguments. Never reaches the network.
    #[error("{0}")]
    Validation(String),

    /// Rejected credentials, or a connection failure with missing credentials.
    #[error("{}", .0.message)]
    Authentication(ApiError),

    /// The remote reported that the record or resource does not exist.
    #[error("{}", .0.message)]
    NotFound(ApiError),

    /// Any other failed exchange.
    #[error("{}", .0.message)]
    Api(ApiError),

    /// The create call succeeded but the record could not be confirmed.
    #[error("Verification failed for {doctype} {name}: {message}")]
    Verification {
        /// DocType of the created record.
        doctype: String,
        /// Name reported by the create call, if any.
        name: String,
        /// Verification message.
        message: String,
    },

    /// The response could not be interpreted.
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    /// Invalid client configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl FrappeError {
    /// Build a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// The classified API error, for variants that carry one.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Authentication(e) | Self::NotFound(e) | Self::Api(e) => Some(e),
            _ => None,
        }
    }

    /// HTTP status code of the failed exchange, if there was a response.
    pub fn status_code(&self) -> Option<u16> {
        self.api_error().and_then(|e| e.status_code)
    }

    /// Whether this error means the record does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Structured details suitable for a verbose error report.
    pub fn details(&self) -> Value {
        match self {
            Self::Authentication(e) | Self::NotFound(e) | Self::Api(e) => serde_json::json!({
                "statusCode": e.status_code,
                "endpoint": e.endpoint,
                "details": e.details,
            }),
            Self::Verification { doctype, name, message } => serde_json::json!({
                "doctype": doctype,
                "name": name,
                "verification": message,
            }),
            Self::Validation(_) | Self::InvalidResponse(_) | Self::Configuration(_) => Value::Null,
        }
    }
}

/// A classified remote error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Operation-prefixed human message.
    pub message: String,

    /// HTTP status, if a response was received.
    pub status_code: Option<u16>,

    /// Request URL, or "unknown".
    pub endpoint: String,

    /// Best-effort extracted payload.
    pub details: Value,
}

/// A failed HTTP exchange, as seen by the classifier.
#[derive(Debug, Clone, Default)]
pub struct FailedExchange {
    /// Request URL.
    pub endpoint: Option<String>,

    /// HTTP status, or `None` when no response was received.
    pub status: Option<u16>,

    /// Response body parsed as JSON (or a JSON string of the raw text).
    pub body: Option<Value>,

    /// Message of the underlying transport or decoding error.
    pub cause: String,

    /// Whether an API key was configured.
    pub api_key_present: bool,

    /// Whether an API secret was configured.
    pub api_secret_present: bool,
}

/// Classify a failed exchange into a [`FrappeError`].
///
/// The first matching rule wins: no response, auth status, `exception`,
/// `_server_messages`, `message`, generic. An auth status always wins over
/// the body.
pub fn classify(exchange: &FailedExchange, operation: &str) -> FrappeError {
    let endpoint = exchange
        .endpoint
        .clone()
        .unwrap_or_else(|| "unknown".to_string());

    let Some(status) = exchange.status else {
        let credentials_missing = !exchange.api_key_present || !exchange.api_secret_present;
        let auth_endpoint = endpoint.contains("auth") || endpoint.contains("login");

        if credentials_missing || auth_endpoint {
            return FrappeError::Authentication(ApiError {
                message: auth_message(operation, exchange),
                status_code: None,
                endpoint,
                details: credential_details(exchange),
            });
        }

        return FrappeError::Api(ApiError {
            message: format!("Connection failed during {}: {}", operation, exchange.cause),
            status_code: None,
            endpoint,
            details: Value::String(exchange.cause.clone()),
        });
    };

    if status == 401 || status == 403 {
        return FrappeError::Authentication(ApiError {
            message: auth_message(operation, exchange),
            status_code: Some(status),
            endpoint,
            details: credential_details(exchange),
        });
    }

    let body = exchange.body.as_ref();
    let message = body
        .and_then(|b| b.get("exception"))
        .map(|exc| format!("Server exception during {}: {}", operation, text_of(exc)))
        .or_else(|| {
            body.and_then(|b| b.get("_server_messages")).map(|raw| {
                format!("Error during {}: {}", operation, server_messages(raw).join("; "))
            })
        })
        .or_else(|| {
            body.and_then(|b| b.get("message"))
                .map(|msg| format!("Error during {}: {}", operation, text_of(msg)))
        })
        .unwrap_or_else(|| format!("API error during {}: {}", operation, exchange.cause));

    let error = ApiError {
        message,
        status_code: Some(status),
        endpoint,
        details: body.cloned().unwrap_or(Value::Null),
    };

    if status == 404 {
        FrappeError::NotFound(error)
    } else {
        FrappeError::Api(error)
    }
}

/// Extract the message texts from a `_server_messages` value.
///
/// The field is a JSON-encoded list whose entries are themselves JSON-encoded
/// objects with a `message` key, or plain strings. If the outer decoding
/// fails the raw string is returned as the only message.
pub fn server_messages(raw: &Value) -> Vec<String> {
    let entries: Vec<Value> = match raw {
        Value::String(s) => match serde_json::from_str::<Vec<Value>>(s) {
            Ok(entries) => entries,
            Err(_) => return vec![s.clone()],
        },
        Value::Array(entries) => entries.clone(),
        other => return vec![other.to_string()],
    };

    entries
        .iter()
        .map(|entry| match entry {
            Value::String(s) => match serde_json::from_str::<Value>(s) {
                Ok(Value::Object(obj)) => obj
                    .get("message")
                    .map(text_of)
                    .unwrap_or_else(|| s.clone()),
                Ok(Value::String(inner)) => inner,
                _ => s.clone(),
            },
            Value::Object(obj) => obj
                .get("message")
                .map(text_of)
                .unwrap_or_else(|| entry.to_string()),
            other => other.to_string(),
        })
        .collect()
}

fn auth_message(operation: &str, exchange: &FailedExchange) -> String {
    let problem = match (exchange.api_key_present, exchange.api_secret_present) {
        (false, false) => "API key and API secret are missing",
        (false, true) => "API key is missing",
        (true, false) => "API secret is missing",
        (true, true) => "API key or API secret is invalid",
    };
    format!(
        "Authentication failed during {}: {}. Check FRAPPE_API_KEY and FRAPPE_API_SECRET.",
        operation, problem
    )
}

fn credential_details(exchange: &FailedExchange) -> Value {
    serde_json::json!({
        "api_key_present": exchange.api_key_present,
        "api_secret_present": exchange.api_secret_present,
        "cause": exchange.cause,
        "response": exchange.body,
    })
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn exchange(status: Option<u16>, body: Option<Value>) -> FailedExchange {
        FailedExchange {
            endpoint: Some("http://erp.test/api/resource/ToDo".to_string()),
            status,
            body,
            cause: "request failed".to_string(),
            api_key_present: true,
            api_secret_present: true,
        }
    }

    #[test]
    fn test_forbidden_wins_over_exception_body() {
        let ex = exchange(
            Some(403),
            Some(json!({"exception": "frappe.exceptions.ValidationError: bad value"})),
        );

        let err = classify(&ex, "create_document(ToDo)");

        assert!(matches!(err, FrappeError::Authentication(_)));
        assert!(err.to_string().starts_with("Authentication failed during create_document(ToDo)"));
        assert_eq!(err.status_code(), Some(403));
    }

    #[test]
    fn test_unauthorized_reports_credential_presence() {
        let mut ex = exchange(Some(401), None);
        ex.api_secret_present = false;

        let err = classify(&ex, "get_document(ToDo)");

        assert!(err.to_string().contains("API secret is missing"));
        let api = err.api_error().unwrap();
        assert_eq!(api.details["api_key_present"], json!(true));
        assert_eq!(api.details["api_secret_present"], json!(false));
    }

    #[test]
    fn test_no_response_with_missing_credentials_is_auth() {
        let mut ex = exchange(None, None);
        ex.api_key_present = false;
        ex.cause = "connection refused".to_string();

        let err = classify(&ex, "list_documents(ToDo)");

        assert!(matches!(err, FrappeError::Authentication(_)));
        assert!(err.to_string().contains("API key is missing"));
        assert_eq!(err.status_code(), None);
    }

    #[test]
    fn test_no_response_with_credentials_is_network() {
        let ex = FailedExchange {
            cause: "connection refused".to_string(),
            api_key_present: true,
            api_secret_present: true,
            ..FailedExchange::default()
        };

        let err = classify(&ex, "list_documents(ToDo)");

        assert!(matches!(err, FrappeError::Api(_)));
        assert_eq!(
            err.to_string(),
            "Connection failed during list_documents(ToDo): connection refused"
        );
        assert_eq!(err.api_error().unwrap().endpoint, "unknown");
    }

    #[test]
    fn test_exception_body() {
        let ex = exchange(
            Some(417),
            Some(json!({
                "exception": "frappe.exceptions.MandatoryError: description",
                "message": "ignored"
            })),
        );

        let err = classify(&ex, "create_document(ToDo)");

        assert_eq!(
            err.to_string(),
            "Server exception during create_document(ToDo): frappe.exceptions.MandatoryError: description"
        );
    }

    #[test]
    fn test_server_messages_nested_decoding() {
        let inner_a = json!({"message": "Value missing for ToDo: Description"}).to_string();
        let inner_b = "\"Please retry\"".to_string();
        let raw = serde_json::to_string(&vec![inner_a, inner_b]).unwrap();
        let ex = exchange(Some(417), Some(json!({ "_server_messages": raw })));

        let err = classify(&ex, "create_document(ToDo)");

        assert_eq!(
            err.to_string(),
            "Error during create_document(ToDo): Value missing for ToDo: Description; Please retry"
        );
    }

    #[test]
    fn test_server_messages_undecodable_falls_back_to_raw() {
        let ex = exchange(Some(500), Some(json!({ "_server_messages": "not json" })));

        let err = classify(&ex, "update_document(ToDo)");

        assert_eq!(err.to_string(), "Error during update_document(ToDo): not json");
    }

    #[test]
    fn test_message_body() {
        let ex = exchange(Some(400), Some(json!({"message": "Invalid filter"})));
        let err = classify(&ex, "list_documents(ToDo)");
        assert_eq!(err.to_string(), "Error during list_documents(ToDo): Invalid filter");
    }

    #[test]
    fn test_generic_fallback() {
        let ex = exchange(Some(502), Some(json!("Bad Gateway")));
        let err = classify(&ex, "get_document(ToDo)");
        assert_eq!(err.to_string(), "API error during get_document(ToDo): request failed");
    }

    #[test]
    fn test_not_found_variant() {
        let ex = exchange(
            Some(404),
            Some(json!({"exception": "frappe.exceptions.DoesNotExistError: ToDo X not found"})),
        );

        let err = classify(&ex, "get_document(ToDo)");

        assert!(err.is_not_found());
        assert_eq!(err.status_code(), Some(404));
    }

    #[test]
    fn test_details_shape() {
        let ex = exchange(Some(500), Some(json!({"message": "boom"})));
        let details = classify(&ex, "op").details();

        assert_eq!(details["statusCode"], json!(500));
        assert_eq!(details["endpoint"], json!("http://erp.test/api/resource/ToDo"));
        assert_eq!(details["details"]["message"], json!("boom"));
    }
}
