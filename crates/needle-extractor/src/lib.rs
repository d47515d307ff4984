//! Needle Extractor
//!
//! Finds small pieces of structured information ("needles") hidden in a
//! large text corpus (the "haystack") by fanning chunked extraction calls
//! out to a language model.
//!
//! # Architecture
//!
//! ```text
//! Haystack → Chunker → Gateway (per chunk) → Sanitizer → [Verifier] → Deduplicator → Needles
//! ```
//!
//! # Key Features
//!
//! - **Token-bounded chunking**: paragraphs packed under a token budget
//! - **Admission control**: one semaphore bounds in-flight model calls
//! - **Retries**: per-attempt timeout and randomized exponential backoff
//! - **Completeness gate**: sparse records are dropped
//! - **Optional verification**: a second model call confirms each candidate
//! - **Deduplication**: structural, first occurrence wins
//!
//! # Example Usage
//!
//! ```no_run
//! use needle_domain::SchemaRegistry;
//! use needle_extractor::{ExtractionRequest, Extractor, ExtractorConfig};
//! use needle_llm::MockProvider;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = SchemaRegistry::with_builtins();
//! let schema = registry.get("TechCompany")?.clone();
//!
//! let llm = MockProvider::new(r#"{"items": []}"#);
//! let extractor = Extractor::new(llm, ExtractorConfig::default())?;
//!
//! let request = ExtractionRequest::new("Acme Corp is a tech company.", schema);
//! let result = extractor.extract(request).await;
//!
//! println!("Found {} needles", result.needles.len());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod chunking;
mod config;
mod dedupe;
mod dialogue;
mod error;
mod extractor;
mod gateway;
mod parser;
mod progress;
mod prompt;
mod retry;
mod sanitize;
mod types;
mod verify;

#[cfg(test)]
mod tests;

pub use chunking::{split_paragraphs, TextChunker, TiktokenCounter, TokenCounter, WordCounter};
pub use config::{ExtractorConfig, GatewayConfig};
pub use dedupe::{dedupe, Deduplicator};
pub use dialogue::remove_dialogue;
pub use error::ExtractorError;
pub use extractor::Extractor;
pub use gateway::{Attempt, CallOutcome, ModelGateway};
pub use parser::parse_items;
pub use progress::ProgressReporter;
pub use prompt::PromptBuilder;
pub use retry::RetryPolicy;
pub use sanitize::{
    clean, clean_record, has_any_populated_field, has_sufficient_populated_fields,
    DEFAULT_POPULATED_THRESHOLD,
};
pub use types::{ExtractionMetadata, ExtractionRequest, ExtractionResult, PipelineStage};
pub use verify::{interpret_answer, relevant_text, Verifier};
