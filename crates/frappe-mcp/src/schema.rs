//! DocType metadata and field options.

use crate::backend::{FrappeBackend, ListQuery, MethodVerb};
use crate::client::error::{FrappeError, FrappeResult};
use crate::filters::{self, FilterCondition};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Candidate records returned for a `Link` field.
const LINK_OPTIONS_LIMIT: u32 = 50;

/// Form-load method returning a DocType and its child tables.
const GETDOCTYPE_METHOD: &str = "frappe.desk.form.load.getdoctype";

/// A DocType definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocTypeSchema {
    /// DocType name.
    pub name: String,

    /// Owning module.
    pub module: Option<String>,

    /// Naming descriptor, e.g. `hash`, `field:title` or `naming_series:`.
    pub autoname: Option<String>,
    pub naming_rule: Option<String>,

    /// Field shown as the record's label in links.
    pub title_field: Option<String>,

    /// Records go through draft, submitted and cancelled states.
    #[serde(deserialize_with = "flag")]
    pub is_submittable: bool,
    /// Child table, only stored inside a parent record.
    #[serde(deserialize_with = "flag")]
    pub istable: bool,
    /// Exactly one record exists.
    #[serde(deserialize_with = "flag")]
    pub issingle: bool,
    #[serde(deserialize_with = "flag")]
    pub is_tree: bool,
    #[serde(deserialize_with = "flag")]
    pub allow_import: bool,
    #[serde(deserialize_with = "flag")]
    pub track_changes: bool,
    /// Defined on the site rather than shipped by an app.
    #[serde(deserialize_with = "flag")]
    pub custom: bool,

    /// Field definitions in form order.
    pub fields: Vec<FieldDef>,

    /// Role permission rules.
    pub permissions: Vec<Permission>,
}

impl DocTypeSchema {
    /// Look up a field by `fieldname`.
    pub fn field(&self, fieldname: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.fieldname == fieldname)
    }

    /// Fields that must be set on insert.
    pub fn required_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| f.reqd)
    }
}

/// A field of a DocType.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldDef {
    /// Column name.
    pub fieldname: String,

    /// Form label.
    pub label: Option<String>,

    /// Type tag: `Data`, `Link`, `Select`, `Table`, ...
    pub fieldtype: String,

    /// Link target, or newline-separated choices for `Select`.
    pub options: Option<String>,

    /// Default value applied on insert.
    pub default: Option<Value>,

    /// Mandatory.
    #[serde(deserialize_with = "flag")]
    pub reqd: bool,
    #[serde(deserialize_with = "flag")]
    pub read_only: bool,
    #[serde(deserialize_with = "flag")]
    pub hidden: bool,
    #[serde(deserialize_with = "flag")]
    pub in_list_view: bool,
}

/// A permission rule of a DocType.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Permission {
    /// Role the rule applies to.
    pub role: Option<String>,

    /// Field level the rule covers; 0 is the document itself.
    pub permlevel: u32,

    #[serde(deserialize_with = "flag")]
    pub read: bool,
    #[serde(deserialize_with = "flag")]
    pub write: bool,
    #[serde(deserialize_with = "flag")]
    pub create: bool,
    #[serde(deserialize_with = "flag")]
    pub delete: bool,
    #[serde(deserialize_with = "flag")]
    pub submit: bool,
    #[serde(deserialize_with = "flag")]
    pub cancel: bool,
}

/// A selectable value for a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOption {
    /// Stored value.
    pub value: String,

    /// Display label; the value when no title is available.
    pub label: String,
}

impl FieldOption {
    fn same(value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            label: value.clone(),
            value,
        }
    }
}

/// Metadata lookups against one Frappe site.
pub struct SchemaService {
    backend: Arc<dyn FrappeBackend>,
}

impl SchemaService {
    /// Create a service over `backend`.
    pub fn new(backend: Arc<dyn FrappeBackend>) -> Self {
        Self { backend }
    }

    /// Fetch a DocType definition.
    ///
    /// Tries the form-load method first and falls back to reading the
    /// `DocType` record itself when that call fails, returns no matching
    /// definition, or returns one that does not parse.
    #[instrument(skip(self))]
    pub async fn get_schema(&self, doctype: &str) -> FrappeResult<DocTypeSchema> {
        if doctype.trim().is_empty() {
            return Err(FrappeError::validation("Missing required parameter: doctype"));
        }

        let params = serde_json::json!({ "doctype": doctype });
        match self.backend.call_method(GETDOCTYPE_METHOD, &params, MethodVerb::Get).await {
            Ok(docs) => match pick_doctype(docs, doctype).map(parse_schema) {
                Some(Ok(schema)) => return Ok(schema),
                Some(Err(e)) => {
                    debug!(doctype, error = %e, "Form-load definition unusable, reading DocType record");
                }
                None => {
                    debug!(doctype, "Form-load returned no definition, reading DocType record");
                }
            },
            Err(e) => {
                debug!(doctype, error = %e, "Form-load failed, reading DocType record");
            }
        }

        let doc = self.backend.get_doc("DocType", doctype, &[]).await?;
        parse_schema(doc)
    }

    /// Values a caller may pick for `fieldname`.
    ///
    /// `Link` fields list up to 50 records of the target DocType, `Select`
    /// fields split their options. Every other type has no options.
    #[instrument(skip(self, raw_filters))]
    pub async fn get_field_options(
        &self,
        doctype: &str,
        fieldname: &str,
        raw_filters: Option<&Value>,
    ) -> FrappeResult<Vec<FieldOption>> {
        if fieldname.trim().is_empty() {
            return Err(FrappeError::validation("Missing required parameter: fieldname"));
        }

        let schema = self.get_schema(doctype).await?;
        let field = schema.field(fieldname).ok_or_else(|| {
            FrappeError::validation(format!("Field {} not found in {}", fieldname, doctype))
        })?;

        let options = field.options.as_deref().unwrap_or("");
        match field.fieldtype.as_str() {
            "Link" if !options.trim().is_empty() => {
                let conditions = match raw_filters {
                    Some(f) => filters::normalize(f)?,
                    None => Vec::new(),
                };
                self.link_options(options.trim(), conditions).await
            }
            "Select" => Ok(select_options(options)),
            _ => Ok(Vec::new()),
        }
    }

    async fn link_options(
        &self,
        target: &str,
        conditions: Vec<FilterCondition>,
    ) -> FrappeResult<Vec<FieldOption>> {
        let title_field = match self.get_schema(target).await {
            Ok(schema) => schema.title_field.filter(|t| !t.is_empty() && t != "name"),
            Err(e) => {
                debug!(link_target = target, error = %e, "Link target schema unavailable");
                None
            }
        };

        let mut query = ListQuery {
            filters: conditions,
            fields: vec!["name".to_string()],
            limit: Some(LINK_OPTIONS_LIMIT),
            ..ListQuery::default()
        };

        if let Some(ref title) = title_field {
            query.fields.push(title.clone());
            match self.backend.list_docs(target, &query).await {
                Ok(records) => return Ok(link_entries(&records, Some(title.as_str()))),
                Err(e) => {
                    debug!(link_target = target, error = %e, "Titled listing failed, listing names only");
                    query.fields.truncate(1);
                }
            }
        }

        let records = self.backend.list_docs(target, &query).await?;
        Ok(link_entries(&records, None))
    }

    /// All `Module Def` records.
    pub async fn list_modules(&self) -> FrappeResult<Vec<Value>> {
        let query = ListQuery {
            fields: vec!["name".to_string(), "app_name".to_string()],
            limit: Some(0),
            order_by: Some("name asc".to_string()),
            ..ListQuery::default()
        };
        self.backend.list_docs("Module Def", &query).await
    }

    /// DocTypes, optionally restricted to one module.
    pub async fn list_doctypes(&self, module: Option<&str>) -> FrappeResult<Vec<Value>> {
        let fields = ["name", "module", "istable", "issingle", "is_submittable", "custom"];
        let query = ListQuery {
            filters: module
                .filter(|m| !m.is_empty())
                .map(|m| vec![FilterCondition::equals("module", m)])
                .unwrap_or_default(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
            limit: Some(0),
            order_by: Some("name asc".to_string()),
            ..ListQuery::default()
        };
        self.backend.list_docs("DocType", &query).await
    }
}

fn pick_doctype(docs: Value, doctype: &str) -> Option<Value> {
    let named = |d: &Value| d.get("name").and_then(Value::as_str) == Some(doctype);
    match docs {
        Value::Array(list) => list.into_iter().find(|d| named(d)),
        doc @ Value::Object(_) if named(&doc) => Some(doc),
        _ => None,
    }
}

fn parse_schema(doc: Value) -> FrappeResult<DocTypeSchema> {
    serde_json::from_value(doc)
        .map_err(|e| FrappeError::InvalidResponse(format!("Malformed DocType definition: {}", e)))
}

fn select_options(options: &str) -> Vec<FieldOption> {
    options
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(FieldOption::same)
        .collect()
}

fn link_entries(records: &[Value], title_field: Option<&str>) -> Vec<FieldOption> {
    records
        .iter()
        .filter_map(|record| {
            let name = record.get("name").and_then(Value::as_str)?;
            let label = title_field
                .and_then(|t| record.get(t))
                .and_then(Value::as_str)
                .filter(|l| !l.is_empty())
                .unwrap_or(name);
            Some(FieldOption {
                value: name.to_string(),
                label: label.to_string(),
            })
        })
        .collect()
}

/// Frappe flags arrive as `0`/`1`, booleans, or numeric strings.
fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Null => Ok(false),
        Value::Bool(b) => Ok(b),
        Value::Number(n) => Ok(n.as_f64().map(|f| f != 0.0).unwrap_or(false)),
        Value::String(s) => Ok(matches!(s.trim(), "1" | "true" | "True")),
        other => Err(serde::de::Error::custom(format!("invalid flag: {}", other))),
    }
}
