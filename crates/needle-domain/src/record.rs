//! Records - schema-shaped needles and their field values

use crate::error::SchemaError;
use crate::schema::{FieldKind, RecordSchema};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A single extracted field value
///
/// Floats compare and hash by bit pattern so that values can be used
/// directly inside deduplication keys.
#[derive(Debug, Clone)]
pub enum FieldValue {
    /// No information
    Null,
    /// Text value
    Text(String),
    /// Whole number
    Integer(i64),
    /// Decimal number
    Float(f64),
    /// Boolean flag
    Boolean(bool),
}

impl FieldValue {
    /// Whether the value carries information
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Convert a JSON value as produced by the model
    ///
    /// Arrays and objects have no field kind of their own and are kept as
    /// their JSON text.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => FieldValue::Null,
            Value::Bool(b) => FieldValue::Boolean(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => FieldValue::Integer(i),
                None => n.as_f64().map(FieldValue::Float).unwrap_or(FieldValue::Null),
            },
            Value::String(s) => FieldValue::Text(s.clone()),
            other => FieldValue::Text(other.to_string()),
        }
    }

    /// Settle a numeric value on the field's declared kind
    ///
    /// `Float` fields widen integers; `Integer` fields narrow integral
    /// floats. Everything else is returned unchanged.
    pub fn coerce(self, kind: FieldKind) -> Self {
        match (kind, self) {
            (FieldKind::Float, FieldValue::Integer(i)) => FieldValue::Float(i as f64),
            (FieldKind::Integer, FieldValue::Float(f))
                if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 =>
            {
                FieldValue::Integer(f as i64)
            }
            (_, value) => value,
        }
    }

    /// Convert back to JSON
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Null => Value::Null,
            FieldValue::Text(s) => Value::String(s.clone()),
            FieldValue::Integer(i) => Value::from(*i),
            FieldValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            FieldValue::Boolean(b) => Value::Bool(*b),
        }
    }
}

impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FieldValue::Null, FieldValue::Null) => true,
            (FieldValue::Text(a), FieldValue::Text(b)) => a == b,
            (FieldValue::Integer(a), FieldValue::Integer(b)) => a == b,
            (FieldValue::Float(a), FieldValue::Float(b)) => a.to_bits() == b.to_bits(),
            (FieldValue::Boolean(a), FieldValue::Boolean(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for FieldValue {}

impl Hash for FieldValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            FieldValue::Null => {}
            FieldValue::Text(s) => s.hash(state),
            FieldValue::Integer(i) => i.hash(state),
            FieldValue::Float(f) => f.to_bits().hash(state),
            FieldValue::Boolean(b) => b.hash(state),
        }
    }
}

/// Display text; empty for `Null`
impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => Ok(()),
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Integer(i) => write!(f, "{}", i),
            FieldValue::Float(x) => write!(f, "{}", x),
            FieldValue::Boolean(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Integer(i)
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        FieldValue::Float(f)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Boolean(b)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(FieldValue::Null)
    }
}

/// Ordered tuple of all field values; two records are duplicates iff their keys match
pub type DedupKey = Vec<FieldValue>;

/// One schema-shaped needle
///
/// Fields are stored in schema order. Every schema field is always present,
/// possibly as `Null`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, FieldValue)>,
}

impl Record {
    /// An all-null record for the schema
    pub fn empty(schema: &RecordSchema) -> Self {
        Self {
            fields: schema
                .fields()
                .iter()
                .map(|f| (f.name.clone(), FieldValue::Null))
                .collect(),
        }
    }

    /// Build a record from the model's JSON object
    ///
    /// Missing keys become `Null`, unknown keys are ignored. Numbers are
    /// coerced to the field's kind.
    pub fn from_json(schema: &RecordSchema, value: &Value) -> Result<Self, SchemaError> {
        let object = value.as_object().ok_or_else(|| {
            SchemaError::InvalidRecord(format!("expected a JSON object, got {}", value))
        })?;

        let mut record = Self::empty(schema);
        for ((name, slot), spec) in record.fields.iter_mut().zip(schema.fields()) {
            if let Some(v) = object.get(name.as_str()) {
                *slot = FieldValue::from_json(v).coerce(spec.kind);
            }
        }
        Ok(record)
    }

    /// Field names in schema order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// Values in schema order
    pub fn values(&self) -> impl Iterator<Item = &FieldValue> {
        self.fields.iter().map(|(_, value)| value)
    }

    /// `(name, value)` pairs in schema order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Get a field value by name
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    /// Set a field value by name
    pub fn set(&mut self, field: &str, value: impl Into<FieldValue>) -> Result<(), SchemaError> {
        let slot = self
            .fields
            .iter_mut()
            .find(|(name, _)| name == field)
            .ok_or_else(|| SchemaError::InvalidRecord(format!("unknown field '{}'", field)))?;
        slot.1 = value.into();
        Ok(())
    }

    /// Apply `f` to every value in place
    pub fn map_values(&mut self, mut f: impl FnMut(FieldValue) -> FieldValue) {
        for (_, value) in self.fields.iter_mut() {
            let current = std::mem::replace(value, FieldValue::Null);
            *value = f(current);
        }
    }

    /// Total number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True for a record with no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of non-null fields
    pub fn populated_count(&self) -> usize {
        self.values().filter(|v| !v.is_null()).count()
    }

    /// Deduplication key
    pub fn dedup_key(&self) -> DedupKey {
        self.values().cloned().collect()
    }

    /// JSON object in schema order
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|(name, value)| (name.clone(), value.to_json()))
                .collect(),
        )
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, &value.to_json())?;
        }
        map.end()
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (name, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match value {
                FieldValue::Null => write!(f, "{}: null", name)?,
                FieldValue::Text(s) => write!(f, "{}: {:?}", name, s)?,
                other => write!(f, "{}: {}", name, other)?,
            }
        }
        write!(f, "}}")
    }
}
