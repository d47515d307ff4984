//! Error types for schemas and records

use thiserror::Error;

/// Errors raised while defining, resolving or filling schemas
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// No schema registered under this name
    #[error("Schema '{0}' not found")]
    NotFound(String),

    /// Two fields share a name
    #[error("Schema '{schema}' declares field '{field}' more than once")]
    DuplicateField {
        /// Schema being built
        schema: String,
        /// Repeated field name
        field: String,
    },

    /// Schema declares no fields
    #[error("Schema '{0}' has no fields")]
    NoFields(String),

    /// Value does not fit the schema
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// Schema file could not be parsed
    #[error("Failed to parse schema definitions: {0}")]
    Parse(String),
}
