//! Record schemas - the shape of a needle

use crate::error::SchemaError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use std::fmt;

/// Primitive type of a schema field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Free text
    String,
    /// Whole number
    Integer,
    /// Decimal number
    Float,
    /// true / false
    Boolean,
}

impl FieldKind {
    /// Short type name used in prompts
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::String => "str",
            FieldKind::Integer => "int",
            FieldKind::Float => "float",
            FieldKind::Boolean => "bool",
        }
    }

    /// JSON Schema type keyword
    fn json_type(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Integer => "integer",
            FieldKind::Float => "number",
            FieldKind::Boolean => "boolean",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single named, typed field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Field name, unique within its schema
    pub name: String,

    /// Value type
    pub kind: FieldKind,

    /// Human-readable description shown to the model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FieldSpec {
    /// Create a field with a description
    pub fn new(name: impl Into<String>, kind: FieldKind, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            description: Some(description.into()),
        }
    }

    /// Create a field without a description
    pub fn bare(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            description: None,
        }
    }

    /// `"(type): description"` as used in prompts
    pub fn describe(&self) -> String {
        format!(
            "({}): {}",
            self.kind,
            self.description.as_deref().unwrap_or("No description provided")
        )
    }
}

/// A named set of typed, documented fields describing one kind of needle
///
/// Field names are unique and their order is fixed for the lifetime of the
/// schema; records, dedup keys and CSV columns all follow that order.
///
/// # Examples
///
/// ```
/// use needle_domain::{FieldKind, FieldSpec, RecordSchema};
///
/// let schema = RecordSchema::new(
///     "TechCompany",
///     vec![
///         FieldSpec::new("name", FieldKind::String, "The company name"),
///         FieldSpec::new("location", FieldKind::String, "Where it is based"),
///     ],
/// )
/// .unwrap();
///
/// assert_eq!(schema.field_names(), vec!["name", "location"]);
/// assert_eq!(schema.describe_fields()[0].1, "(str): The company name");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordSchema {
    name: String,
    fields: Vec<FieldSpec>,
}

impl RecordSchema {
    /// Create a schema, rejecting empty or duplicate field lists
    pub fn new(name: impl Into<String>, fields: Vec<FieldSpec>) -> Result<Self, SchemaError> {
        let name = name.into();
        if fields.is_empty() {
            return Err(SchemaError::NoFields(name));
        }

        let mut seen = HashSet::new();
        for field in &fields {
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateField {
                    schema: name,
                    field: field.name.clone(),
                });
            }
        }

        Ok(Self { name, fields })
    }

    /// Schema name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields in declaration order
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Always false for a constructed schema
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field names in declaration order
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Position of a field
    pub fn index_of(&self, field: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == field)
    }

    /// `(name, "(type): description")` pairs in declaration order
    pub fn describe_fields(&self) -> Vec<(String, String)> {
        self.fields
            .iter()
            .map(|f| (f.name.clone(), f.describe()))
            .collect()
    }

    /// Name of the item-list wrapper used for structured output
    pub fn list_name(&self) -> String {
        format!("{}List", self.name)
    }

    /// Strict JSON Schema for `{ "items": [record, ...] }`
    ///
    /// Every field is required but nullable, so the model can say "not
    /// present" without inventing a value.
    pub fn list_json_schema(&self) -> Value {
        let mut properties = Map::new();
        for field in &self.fields {
            let mut property = Map::new();
            property.insert("type".into(), json!([field.kind.json_type(), "null"]));
            if let Some(description) = &field.description {
                property.insert("description".into(), Value::String(description.clone()));
            }
            properties.insert(field.name.clone(), Value::Object(property));
        }

        json!({
            "type": "object",
            "properties": {
                "items": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": properties,
                        "required": self.field_names(),
                        "additionalProperties": false
                    }
                }
            },
            "required": ["items"],
            "additionalProperties": false
        })
    }
}

/// Unchecked mirror used so deserialized schemas go through `RecordSchema::new`
#[derive(Deserialize)]
struct RawSchema {
    name: String,
    fields: Vec<FieldSpec>,
}

impl<'de> Deserialize<'de> for RecordSchema {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawSchema::deserialize(deserializer)?;
        RecordSchema::new(raw.name, raw.fields).map_err(serde::de::Error::custom)
    }
}
