//! Error types for the Extractor
//!
//! Only configuration-time problems surface as errors. Failures while a run
//! is in flight degrade to empty contributions instead.

use needle_domain::SchemaError;
use thiserror::Error;

/// Errors that can occur while setting up or parsing an extraction
#[derive(Error, Debug)]
pub enum ExtractorError {
    /// Schema could not be resolved or built
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Model output does not have the expected shape
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    JsonParse(String),
}

impl From<serde_json::Error> for ExtractorError {
    fn from(e: serde_json::Error) -> Self {
        ExtractorError::JsonParse(e.to_string())
    }
}
