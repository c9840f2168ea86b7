//! Filter normalisation.
//!
//! Callers may express filters as a mapping (`{"status": "Open"}` or
//! `{"date": [">", "2024-01-01"]}`), as a list of `[field, operator, value]`
//! triples, as Frappe's four-element `[doctype, field, operator, value]`
//! form, or as a JSON string of any of these. Everything is normalised to
//! triples before it is sent. Normalising triples is a no-op, so
//! normalisation is idempotent.

use crate::client::error::{FrappeError, FrappeResult};
use serde::de::{self, Deserializer};
use serde::ser::{SerializeTuple, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single `[field, operator, value]` condition.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCondition {
    /// Field name.
    pub field: String,
    /// Operator, e.g. `=`, `like`, `in`, `>`.
    pub operator: String,
    /// Operand.
    pub value: Value,
}

impl FilterCondition {
    /// Build a condition.
    pub fn new(field: impl Into<String>, operator: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator: operator.into(),
            value: value.into(),
        }
    }

    /// Build an equality condition.
    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, "=", value)
    }
}

impl Serialize for FilterCondition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(3)?;
        tuple.serialize_element(&self.field)?;
        tuple.serialize_element(&self.operator)?;
        tuple.serialize_element(&self.value)?;
        tuple.end()
    }
}

impl<'de> Deserialize<'de> for FilterCondition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        condition_from_list(&value).map_err(de::Error::custom)
    }
}

/// Normalise any accepted filter shape into triples.
///
/// `null` and empty inputs produce no conditions.
pub fn normalize(filters: &Value) -> FrappeResult<Vec<FilterCondition>> {
    match filters {
        Value::Null => Ok(Vec::new()),
        Value::String(s) if s.trim().is_empty() => Ok(Vec::new()),
        Value::String(s) => {
            let parsed: Value = serde_json::from_str(s).map_err(|e| {
                FrappeError::validation(format!("Filters string is not valid JSON: {}", e))
            })?;
            if parsed.is_string() {
                return Err(FrappeError::validation("Filters must be an object or a list"));
            }
            normalize(&parsed)
        }
        Value::Object(map) => Ok(map
            .iter()
            .map(|(field, condition)| match condition {
                Value::Array(pair) if pair.len() == 2 && pair[0].is_string() => FilterCondition {
                    field: field.clone(),
                    operator: pair[0].as_str().unwrap_or("=").to_string(),
                    value: pair[1].clone(),
                },
                other => FilterCondition::equals(field.clone(), other.clone()),
            })
            .collect()),
        Value::Array(items) => items
            .iter()
            .map(|item| condition_from_list(item).map_err(FrappeError::Validation))
            .collect(),
        other => Err(FrappeError::validation(format!(
            "Filters must be an object or a list, got: {}",
            other
        ))),
    }
}

/// Serialise conditions as the JSON string Frappe expects in query strings.
pub fn to_query_param(conditions: &[FilterCondition]) -> String {
    serde_json::to_string(conditions).unwrap_or_else(|_| "[]".to_string())
}

fn condition_from_list(item: &Value) -> Result<FilterCondition, String> {
    let parts = item
        .as_array()
        .ok_or_else(|| format!("Filter entry must be a list, got: {}", item))?;

    let (field, operator, value) = match parts.as_slice() {
        [field, operator, value] => (field, operator, value),
        [_doctype, field, operator, value] => (field, operator, value),
        _ => {
            return Err(format!(
                "Filter entry must have 3 or 4 elements, got {}: {}",
                parts.len(),
                item
            ))
        }
    };

    let field = field
        .as_str()
        .ok_or_else(|| format!("Filter field must be a string, got: {}", field))?;
    let operator = operator
        .as_str()
        .ok_or_else(|| format!("Filter operator must be a string, got: {}", operator))?;

    Ok(FilterCondition::new(field, operator, value.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn renormalize(conditions: &[FilterCondition]) -> Vec<FilterCondition> {
        normalize(&serde_json::to_value(conditions).unwrap()).unwrap()
    }

    #[test]
    fn test_mapping_with_plain_values() {
        let conditions = normalize(&json!({"status": "Open", "priority": "High"})).unwrap();
        assert_eq!(conditions.len(), 2);
        assert!(conditions.contains(&FilterCondition::equals("status", "Open")));
        assert!(conditions.contains(&FilterCondition::equals("priority", "High")));
    }

    #[test]
    fn test_mapping_with_operator_pairs() {
        let conditions = normalize(&json!({
            "date": [">=", "2024-01-01"],
            "status": ["in", ["Open", "Closed"]]
        }))
        .unwrap();

        assert!(conditions.contains(&FilterCondition::new("date", ">=", "2024-01-01")));
        assert!(conditions.contains(&FilterCondition::new("status", "in", json!(["Open", "Closed"]))));
    }

    #[test]
    fn test_mapping_normalisation_is_idempotent() {
        let mappings = [
            json!({"module": "Core"}),
            json!({"date": [">", "2024-01-01"], "owner": "admin@example.com"}),
            json!({"tags": ["not in", ["a", "b"]], "count": 3, "flag": null}),
            json!({}),
        ];

        for mapping in mappings {
            let once = normalize(&mapping).unwrap();
            assert_eq!(renormalize(&once), once, "not idempotent for {}", mapping);
        }
    }

    #[test]
    fn test_triples_are_unchanged() {
        let triples = json!([
            ["status", "=", "Open"],
            ["description", "like", "%invoice%"],
            ["idx", ">", 3]
        ]);

        let conditions = normalize(&triples).unwrap();

        assert_eq!(serde_json::to_value(&conditions).unwrap(), triples);
    }

    #[test]
    fn test_four_element_form_drops_doctype() {
        let conditions = normalize(&json!([["ToDo", "status", "=", "Open"]])).unwrap();
        assert_eq!(conditions, vec![FilterCondition::equals("status", "Open")]);
    }

    #[test]
    fn test_json_string_input() {
        let conditions = normalize(&json!(r#"{"status": "Open"}"#)).unwrap();
        assert_eq!(conditions, vec![FilterCondition::equals("status", "Open")]);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(normalize(&Value::Null).unwrap().is_empty());
        assert!(normalize(&json!("")).unwrap().is_empty());
        assert!(normalize(&json!([])).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_inputs() {
        assert!(normalize(&json!(42)).is_err());
        assert!(normalize(&json!([["status", "="]])).is_err());
        assert!(normalize(&json!([[1, "=", "x"]])).is_err());
        assert!(normalize(&json!("not json")).is_err());
    }

    #[test]
    fn test_query_param() {
        let conditions = vec![FilterCondition::new("description", "like", "Buy milk%")];
        assert_eq!(
            to_query_param(&conditions),
            r#"[["description","like","Buy milk%"]]"#
        );
    }

    #[test]
    fn test_condition_deserialize() {
        let condition: FilterCondition = serde_json::from_value(json!(["name", "=", "X"])).unwrap();
        assert_eq!(condition, FilterCondition::equals("name", "X"));
    }
}
