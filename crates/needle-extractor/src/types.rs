//! Request and response types for extraction

use needle_domain::{Record, RecordSchema};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Request to extract needles from a haystack
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    /// Full text to search
    pub haystack: String,

    /// Shape of the needles
    pub schema: RecordSchema,

    /// Example needles shown to the model
    pub example_needles: Vec<String>,

    /// Strip quoted dialogue before chunking
    pub remove_dialogue: bool,

    /// Re-ask the model to confirm each candidate
    pub verify: bool,
}

impl ExtractionRequest {
    /// Request with no examples, no dialogue removal and no verification
    pub fn new(haystack: impl Into<String>, schema: RecordSchema) -> Self {
        Self {
            haystack: haystack.into(),
            schema,
            example_needles: Vec::new(),
            remove_dialogue: false,
            verify: false,
        }
    }

    /// Attach example needles
    pub fn with_examples(mut self, examples: Vec<String>) -> Self {
        self.example_needles = examples;
        self
    }

    /// Enable or disable verification
    pub fn with_verification(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    /// Enable or disable dialogue removal
    pub fn with_dialogue_removed(mut self, remove: bool) -> Self {
        self.remove_dialogue = remove;
        self
    }
}

/// Result of an extraction run
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    /// Unique needles, earliest chunk first
    pub needles: Vec<Record>,

    /// Metadata about the run
    pub metadata: ExtractionMetadata,
}

/// Metadata about an extraction run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractionMetadata {
    /// Schema the needles follow
    pub schema_name: String,

    /// Model used for extraction calls
    pub model_name: String,

    /// Chunks dispatched
    pub chunks_total: usize,

    /// Chunks whose call was exhausted or whose task died
    pub chunks_failed: usize,

    /// Records returned by the model before filtering
    pub candidates_total: usize,

    /// Records dropped by the completeness gate
    pub filtered_out: usize,

    /// Records rejected by verification
    pub rejected_by_verification: usize,

    /// Duplicates removed
    pub duplicates_removed: usize,

    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

/// A record still tied to the chunk it came from
#[derive(Debug, Clone)]
pub(crate) struct Candidate {
    pub record: Record,
    pub chunk: Arc<str>,
}

/// Stages of one extraction run, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    /// Splitting the haystack
    Chunking,
    /// Spawning one extraction task per chunk
    Dispatching,
    /// Gathering task results
    Collecting,
    /// Cleaning and gating candidates
    Filtering,
    /// Confirming candidates with the model
    Verifying,
    /// Removing duplicates
    Deduplicating,
    /// Finished
    Done,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Chunking => "chunking",
            PipelineStage::Dispatching => "dispatching",
            PipelineStage::Collecting => "collecting",
            PipelineStage::Filtering => "filtering",
            PipelineStage::Verifying => "verifying",
            PipelineStage::Deduplicating => "deduplicating",
            PipelineStage::Done => "done",
        };
        f.write_str(name)
    }
}
