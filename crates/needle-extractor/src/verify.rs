//! Second-pass verification of candidate records

use crate::chunking::{split_paragraphs, PARAGRAPH_SEPARATOR};
use crate::gateway::{CallOutcome, ModelGateway};
use crate::prompt::PromptBuilder;
use needle_domain::{ChatBackend, Record};
use std::sync::Arc;
use tracing::{debug, warn};

/// Paragraph window `[start, end)` of `2k+1` paragraphs around `index`
///
/// Near either edge the window slides inward instead of shrinking.
fn window_bounds(index: usize, total: usize, k: usize) -> (usize, usize) {
    let span = k.saturating_mul(2).saturating_add(1).min(total);
    let start = index.saturating_sub(k).min(total - span);
    (start, start + span)
}

/// Paragraphs of `chunk` surrounding mentions of the record's values
///
/// Every non-null value is matched case-insensitively against each
/// paragraph. Matching windows are deduplicated by exact text, keeping
/// first-seen order, and joined with blank lines. Returns an empty string
/// when nothing matches.
pub fn relevant_text(chunk: &str, record: &Record, k: usize) -> String {
    let paragraphs = split_paragraphs(chunk);
    let lowered: Vec<String> = paragraphs.iter().map(|p| p.to_lowercase()).collect();
    let mut windows: Vec<String> = Vec::new();

    for value in record.values().filter(|v| !v.is_null()) {
        let needle = value.to_string().to_lowercase();
        if needle.is_empty() {
            continue;
        }
        for (i, paragraph) in lowered.iter().enumerate() {
            if !paragraph.contains(&needle) {
                continue;
            }
            let (start, end) = window_bounds(i, paragraphs.len(), k);
            let window = paragraphs[start..end].join(PARAGRAPH_SEPARATOR);
            if !windows.contains(&window) {
                windows.push(window);
            }
        }
    }

    windows.join(PARAGRAPH_SEPARATOR)
}

/// Read a one-token verdict
///
/// Only an explicit negative rejects; anything unclear keeps the record.
pub fn interpret_answer(answer: &str) -> bool {
    let word = answer
        .trim()
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase();
    !matches!(word.as_str(), "false" | "no")
}

/// Asks the model whether a candidate really appears in its source chunk
pub struct Verifier<B> {
    gateway: Arc<ModelGateway<B>>,
    prompts: Arc<PromptBuilder>,
    context_paragraphs: usize,
}

impl<B> Clone for Verifier<B> {
    fn clone(&self) -> Self {
        Self {
            gateway: Arc::clone(&self.gateway),
            prompts: Arc::clone(&self.prompts),
            context_paragraphs: self.context_paragraphs,
        }
    }
}

impl<B: ChatBackend> Verifier<B> {
    /// Create a verifier sharing the run's gateway and prompts
    pub fn new(
        gateway: Arc<ModelGateway<B>>,
        prompts: Arc<PromptBuilder>,
        context_paragraphs: usize,
    ) -> Self {
        Self {
            gateway,
            prompts,
            context_paragraphs,
        }
    }

    /// Whether `record` is confirmed by `chunk`
    ///
    /// Ambiguous answers confirm. A call that exhausts its retries rejects.
    pub async fn verify(&self, record: &Record, chunk: &str) -> bool {
        let text = relevant_text(chunk, record, self.context_paragraphs);
        if text.is_empty() {
            debug!("No paragraph mentions {}", record);
        }

        let messages = self.prompts.verification_messages(&text, record);
        match self.gateway.complete_text(messages, Some(1)).await {
            CallOutcome::Success(answer) => interpret_answer(&answer),
            CallOutcome::Exhausted { last_error, .. } => {
                warn!("Verification call failed for {}: {}", record, last_error);
                false
            }
        }
    }
}
