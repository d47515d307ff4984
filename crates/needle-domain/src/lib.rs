//! Needle Domain Layer
//!
//! Core types shared by every Needle crate: record schemas, schema-shaped
//! records, the schema registry, and the trait boundary to language-model
//! backends.
//!
//! ## Key Concepts
//!
//! - **Schema**: a named set of typed, documented fields
//! - **Record**: one needle, holding a value for every schema field
//! - **Dedup key**: the ordered tuple of a record's values
//! - **ChatBackend**: the only way the pipeline reaches a model

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod record;
pub mod registry;
pub mod schema;
pub mod traits;

// Re-exports for convenience
pub use error::SchemaError;
pub use record::{DedupKey, FieldValue, Record};
pub use registry::SchemaRegistry;
pub use schema::{FieldKind, FieldSpec, RecordSchema};
pub use traits::{ChatBackend, ChatMessage, CompletionRequest, ResponseFormat, Role};
