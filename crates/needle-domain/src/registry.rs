//! Schema registry - explicit name → schema lookup

use crate::error::SchemaError;
use crate::schema::{FieldKind, FieldSpec, RecordSchema};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Registry of known record schemas, populated at startup
///
/// # Examples
///
/// ```
/// use needle_domain::SchemaRegistry;
///
/// let registry = SchemaRegistry::with_builtins();
/// assert!(registry.get("TechCompany").is_ok());
/// assert!(registry.get("Unicorn").is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: BTreeMap<String, RecordSchema>,
}

/// Shape of a schema definitions file
#[derive(Debug, Deserialize)]
struct SchemaFile {
    #[serde(default)]
    schemas: Vec<RecordSchema>,
}

impl SchemaRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in schemas
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(tech_company());
        registry
    }

    /// Add or replace a schema
    pub fn register(&mut self, schema: RecordSchema) -> Option<RecordSchema> {
        self.schemas.insert(schema.name().to_string(), schema)
    }

    /// Register every schema in a TOML document of `[[schemas]]` tables
    ///
    /// Returns how many schemas were registered.
    pub fn register_toml(&mut self, toml_str: &str) -> Result<usize, SchemaError> {
        let file: SchemaFile =
            toml::from_str(toml_str).map_err(|e| SchemaError::Parse(e.to_string()))?;
        let count = file.schemas.len();
        for schema in file.schemas {
            self.register(schema);
        }
        Ok(count)
    }

    /// Look up a schema by name
    pub fn get(&self, name: &str) -> Result<&RecordSchema, SchemaError> {
        self.schemas
            .get(name)
            .ok_or_else(|| SchemaError::NotFound(name.to_string()))
    }

    /// Registered names, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    /// Registered schemas, sorted by name
    pub fn iter(&self) -> impl Iterator<Item = &RecordSchema> {
        self.schemas.values()
    }

    /// Number of registered schemas
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// True when nothing is registered
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

fn tech_company() -> RecordSchema {
    let fields = vec![
        FieldSpec::new("name", FieldKind::String, "The name of the technology company"),
        FieldSpec::new(
            "location",
            FieldKind::String,
            "The city or region where the company is located",
        ),
        FieldSpec::new(
            "employee_count",
            FieldKind::Integer,
            "The number of people the company employs",
        ),
        FieldSpec::new("founding_year", FieldKind::Integer, "The year the company was founded"),
    ];
    // Static field list with unique names
    match RecordSchema::new("TechCompany", fields) {
        Ok(schema) => schema,
        Err(e) => unreachable!("built-in schema is invalid: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins() {
        let registry = SchemaRegistry::with_builtins();
        let schema = registry.get("TechCompany").unwrap();
        assert_eq!(schema.field_names()[..2], ["name", "location"]);
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["TechCompany"]);
    }

    #[test]
    fn test_not_found() {
        let registry = SchemaRegistry::new();
        assert_eq!(
            registry.get("Nope").unwrap_err(),
            SchemaError::NotFound("Nope".to_string())
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn test_register_toml() {
        let mut registry = SchemaRegistry::with_builtins();
        let added = registry
            .register_toml(
                r#"
                [[schemas]]
                name = "Person"

                [[schemas.fields]]
                name = "full_name"
                kind = "string"
                description = "The person's full name"

                [[schemas.fields]]
                name = "age"
                kind = "integer"
                "#,
            )
            .unwrap();

        assert_eq!(added, 1);
        assert_eq!(registry.len(), 2);
        let person = registry.get("Person").unwrap();
        assert_eq!(person.describe_fields()[1].1, "(int): No description provided");
    }

    #[test]
    fn test_register_toml_rejects_duplicates() {
        let mut registry = SchemaRegistry::new();
        let result = registry.register_toml(
            r#"
            [[schemas]]
            name = "Bad"
            fields = [{ name = "a", kind = "string" }, { name = "a", kind = "string" }]
            "#,
        );
        assert!(matches!(result, Err(SchemaError::Parse(_))));
    }
}
