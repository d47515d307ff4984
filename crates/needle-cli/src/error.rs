//! Error types for the CLI application.

use needle_domain::SchemaError;
use needle_extractor::ExtractorError;
use needle_llm::LlmError;
use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI-specific errors.
///
/// Everything here is raised before the pipeline starts or after it
/// finishes; the pipeline itself does not fail.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// CSV writing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Unknown or malformed schema
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Extractor could not be built
    #[error(transparent)]
    Extractor(#[from] ExtractorError),

    /// Backend could not be built
    #[error(transparent)]
    Llm(#[from] LlmError),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
