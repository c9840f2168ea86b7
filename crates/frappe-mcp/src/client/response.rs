//! Normalisation of successful Frappe response bodies.
//!
//! Resource endpoints wrap results in `data`, method endpoints in `message`,
//! and the form-load endpoints return a top-level `docs` list. The adapter
//! turns every body into an [`ApiPayload`] once, so operations never inspect
//! raw shapes.

use super::error::{FrappeError, FrappeResult};
use serde_json::{Map, Value};

/// A successful response body, tagged by envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiPayload {
    /// `{"data": ...}` from `/api/resource`.
    Data(Value),

    /// `{"message": ...}` from `/api/method`.
    Message(Value),

    /// `{"docs": [...]}` from form-load methods.
    Docs(Vec<Value>),

    /// Any other JSON body.
    Other(Value),

    /// Empty body.
    Empty,
}

impl ApiPayload {
    /// Tag a raw response body.
    pub fn from_body(body: &str) -> Result<Self, serde_json::Error> {
        if body.trim().is_empty() {
            return Ok(Self::Empty);
        }
        serde_json::from_str(body).map(Self::from_value)
    }

    /// Tag an already-parsed body.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(mut obj) => {
                if let Some(data) = obj.remove("data") {
                    Self::Data(data)
                } else if let Some(Value::Array(docs)) = obj.get("docs") {
                    Self::Docs(docs.clone())
                } else if let Some(message) = obj.remove("message") {
                    Self::Message(message)
                } else {
                    Self::Other(Value::Object(obj))
                }
            }
            Value::Null => Self::Empty,
            other => Self::Other(other),
        }
    }

    /// The unwrapped value.
    pub fn into_value(self) -> Value {
        match self {
            Self::Data(v) | Self::Message(v) | Self::Other(v) => v,
            Self::Docs(docs) => Value::Array(docs),
            Self::Empty => Value::Null,
        }
    }

    /// The unwrapped value, which must be a JSON object.
    pub fn into_object(self) -> FrappeResult<Map<String, Value>> {
        match self.into_value() {
            Value::Object(obj) => Ok(obj),
            other => Err(FrappeError::InvalidResponse(format!(
                "Expected a JSON object in response, got: {}",
                other
            ))),
        }
    }

    /// The unwrapped value as a list; `null` and empty bodies are empty lists.
    pub fn into_list(self) -> FrappeResult<Vec<Value>> {
        match self.into_value() {
            Value::Array(items) => Ok(items),
            Value::Null => Ok(Vec::new()),
            other => Err(FrappeError::InvalidResponse(format!(
                "Expected a JSON list in response, got: {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_data_envelope() {
        let payload = ApiPayload::from_body(r#"{"data": {"name": "TODO-001"}}"#).unwrap();
        assert_eq!(payload, ApiPayload::Data(json!({"name": "TODO-001"})));
        assert_eq!(payload.into_object().unwrap()["name"], json!("TODO-001"));
    }

    #[test]
    fn test_message_envelope() {
        let payload = ApiPayload::from_body(r#"{"message": 42}"#).unwrap();
        assert_eq!(payload.into_value(), json!(42));
    }

    #[test]
    fn test_docs_envelope() {
        let payload = ApiPayload::from_value(json!({"docs": [{"name": "ToDo"}], "user_settings": "{}"}));
        assert_eq!(payload.into_list().unwrap().len(), 1);
    }

    #[test]
    fn test_empty_body() {
        assert_eq!(ApiPayload::from_body("  ").unwrap(), ApiPayload::Empty);
        assert!(ApiPayload::Empty.into_list().unwrap().is_empty());
    }

    #[test]
    fn test_wrong_shape() {
        let payload = ApiPayload::Data(json!("text"));
        assert!(payload.into_object().is_err());
    }
}
