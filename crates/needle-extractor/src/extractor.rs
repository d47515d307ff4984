//! Core Extractor implementation

use crate::chunking::{TextChunker, TiktokenCounter, TokenCounter};
use crate::config::ExtractorConfig;
use crate::dedupe::Deduplicator;
use crate::dialogue::remove_dialogue;
use crate::error::ExtractorError;
use crate::gateway::{CallOutcome, ModelGateway};
use crate::progress::ProgressReporter;
use crate::prompt::PromptBuilder;
use crate::sanitize::{clean_record, has_sufficient_populated_fields};
use crate::types::{Candidate, ExtractionMetadata, ExtractionRequest, ExtractionResult, PipelineStage};
use crate::verify::Verifier;
use needle_domain::{ChatBackend, Record};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// The Extractor finds schema-shaped needles in a haystack
///
/// One run walks through [`PipelineStage`]s in order. Failures inside a run
/// never abort it: a chunk whose model call is exhausted contributes no
/// records, and a run may legitimately return nothing.
pub struct Extractor<B>
where
    B: ChatBackend,
{
    gateway: Arc<ModelGateway<B>>,
    counter: Arc<dyn TokenCounter>,
    progress: Option<Arc<dyn ProgressReporter>>,
    config: ExtractorConfig,
}

impl<B> Extractor<B>
where
    B: ChatBackend + 'static,
{
    /// Create a new Extractor counting tokens with `o200k_base`
    pub fn new(backend: B, config: ExtractorConfig) -> Result<Self, ExtractorError> {
        let counter = Arc::new(TiktokenCounter::new()?);
        Self::with_token_counter(backend, config, counter)
    }

    /// Create a new Extractor with a custom token counter
    pub fn with_token_counter(
        backend: B,
        config: ExtractorConfig,
        counter: Arc<dyn TokenCounter>,
    ) -> Result<Self, ExtractorError> {
        config.validate().map_err(ExtractorError::Config)?;
        Ok(Self {
            gateway: Arc::new(ModelGateway::new(backend, config.gateway.clone())),
            counter,
            progress: None,
            config,
        })
    }

    /// Report chunk completion to `progress` during every run
    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// The shared model gateway
    pub fn gateway(&self) -> &ModelGateway<B> {
        &self.gateway
    }

    /// Extractor configuration
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    fn enter(&self, stage: PipelineStage) {
        info!("Pipeline stage: {}", stage);
    }

    /// Run the whole pipeline over one haystack
    pub async fn extract(&self, request: ExtractionRequest) -> ExtractionResult {
        let start_time = Instant::now();
        let ExtractionRequest {
            haystack,
            schema,
            example_needles,
            remove_dialogue: strip_dialogue,
            verify,
        } = request;

        let mut metadata = ExtractionMetadata {
            schema_name: schema.name().to_string(),
            model_name: self.gateway.extraction_model().to_string(),
            ..ExtractionMetadata::default()
        };

        self.enter(PipelineStage::Chunking);
        let text = if strip_dialogue {
            remove_dialogue(&haystack)
        } else {
            haystack
        };
        let chunker = TextChunker::new(Arc::clone(&self.counter), self.config.max_chunk_tokens);
        let chunks: Vec<Arc<str>> = chunker
            .chunk_text(&text)
            .into_iter()
            .map(Arc::from)
            .collect();
        metadata.chunks_total = chunks.len();
        info!(
            "Split {} bytes into {} chunks (budget {} tokens)",
            text.len(),
            chunks.len(),
            self.config.max_chunk_tokens
        );

        self.enter(PipelineStage::Dispatching);
        let schema = Arc::new(schema);
        let prompts = Arc::new(PromptBuilder::new(&schema, &example_needles));
        let mut tasks = JoinSet::new();
        for (index, chunk) in chunks.iter().enumerate() {
            let gateway = Arc::clone(&self.gateway);
            let prompts = Arc::clone(&prompts);
            let schema = Arc::clone(&schema);
            let chunk = Arc::clone(chunk);
            tasks.spawn(async move {
                let messages = prompts.extraction_messages(&chunk);
                (index, gateway.extract_records(messages, &schema).await)
            });
        }

        self.enter(PipelineStage::Collecting);
        if let Some(progress) = &self.progress {
            progress.start(chunks.len());
        }
        let mut contributions: Vec<(usize, Vec<Record>)> = Vec::with_capacity(chunks.len());
        while let Some(joined) = tasks.join_next().await {
            if let Some(progress) = &self.progress {
                progress.chunk_done();
            }
            match joined {
                Ok((index, CallOutcome::Success(records))) => {
                    debug!("Chunk {} yielded {} candidates", index, records.len());
                    contributions.push((index, records));
                }
                Ok((index, CallOutcome::Exhausted { attempts, last_error })) => {
                    warn!(
                        "Chunk {} contributes nothing after {} attempts: {}",
                        index, attempts, last_error
                    );
                    metadata.chunks_failed += 1;
                }
                Err(e) => {
                    warn!("Extraction task failed: {}", e);
                    metadata.chunks_failed += 1;
                }
            }
        }

        if let Some(progress) = &self.progress {
            progress.finish();
        }

        // Completion order is arbitrary; chunk order makes the output stable
        contributions.sort_by_key(|(index, _)| *index);
        let candidates: Vec<Candidate> = contributions
            .into_iter()
            .flat_map(|(index, records)| {
                let chunk = Arc::clone(&chunks[index]);
                records.into_iter().map(move |record| Candidate {
                    record,
                    chunk: Arc::clone(&chunk),
                })
            })
            .collect();
        metadata.candidates_total = candidates.len();

        self.enter(PipelineStage::Filtering);
        let mut survivors = Vec::with_capacity(candidates.len());
        for mut candidate in candidates {
            clean_record(&mut candidate.record);
            if has_sufficient_populated_fields(&candidate.record, self.config.populated_threshold) {
                survivors.push(candidate);
            } else {
                debug!("Dropping sparse record: {}", candidate.record);
                metadata.filtered_out += 1;
            }
        }

        let records = if verify {
            self.enter(PipelineStage::Verifying);
            let (kept, rejected) = self.verify_all(survivors, prompts).await;
            metadata.rejected_by_verification = rejected;
            kept
        } else {
            survivors.into_iter().map(|c| c.record).collect()
        };

        self.enter(PipelineStage::Deduplicating);
        let mut deduplicator = Deduplicator::new();
        let needles: Vec<Record> = records
            .into_iter()
            .filter(|record| deduplicator.insert(record))
            .collect();
        metadata.duplicates_removed = deduplicator.removed();
        metadata.processing_time_ms = start_time.elapsed().as_millis() as u64;

        self.enter(PipelineStage::Done);
        info!(
            "Extraction complete: {} needles from {} candidates ({} chunks, {} failed, {} filtered, {} rejected, {} duplicates)",
            needles.len(),
            metadata.candidates_total,
            metadata.chunks_total,
            metadata.chunks_failed,
            metadata.filtered_out,
            metadata.rejected_by_verification,
            metadata.duplicates_removed
        );

        ExtractionResult { needles, metadata }
    }

    /// Verify every candidate concurrently, keeping input order
    ///
    /// Returns the confirmed records and the number rejected.
    async fn verify_all(
        &self,
        candidates: Vec<Candidate>,
        prompts: Arc<PromptBuilder>,
    ) -> (Vec<Record>, usize) {
        let verifier = Verifier::new(
            Arc::clone(&self.gateway),
            prompts,
            self.config.context_paragraphs,
        );

        let mut tasks = JoinSet::new();
        for (index, candidate) in candidates.iter().enumerate() {
            let verifier = verifier.clone();
            let candidate = candidate.clone();
            tasks.spawn(async move {
                (index, verifier.verify(&candidate.record, &candidate.chunk).await)
            });
        }

        let mut verdicts = vec![false; candidates.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, confirmed)) => verdicts[index] = confirmed,
                Err(e) => warn!("Verification task failed: {}", e),
            }
        }

        let mut kept = Vec::with_capacity(candidates.len());
        let mut rejected = 0;
        for (candidate, confirmed) in candidates.into_iter().zip(verdicts) {
            if confirmed {
                kept.push(candidate.record);
            } else {
                info!("Verification failed for: {}", candidate.record);
                rejected += 1;
            }
        }
        (kept, rejected)
    }
}
