//! Paragraph-aligned, token-bounded chunking

use crate::error::ExtractorError;
use std::sync::Arc;

/// Separator placed after every paragraph in a chunk
pub const PARAGRAPH_SEPARATOR: &str = "\n\n";

/// Counts tokens the way the target model does
pub trait TokenCounter: Send + Sync {
    /// Number of tokens in `text`
    fn count_tokens(&self, text: &str) -> usize;
}

/// BPE token counter backed by tiktoken's `o200k_base` encoding
pub struct TiktokenCounter {
    bpe: tiktoken_rs::CoreBPE,
}

impl TiktokenCounter {
    /// Load the `o200k_base` encoding (GPT-4o family)
    pub fn new() -> Result<Self, ExtractorError> {
        let bpe = tiktoken_rs::o200k_base()
            .map_err(|e| ExtractorError::Config(format!("Failed to load tokenizer: {}", e)))?;
        Ok(Self { bpe })
    }
}

impl TokenCounter for TiktokenCounter {
    fn count_tokens(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }
}

/// Counts whitespace-separated words; predictable, needs no vocabulary
#[derive(Debug, Clone, Copy, Default)]
pub struct WordCounter;

impl TokenCounter for WordCounter {
    fn count_tokens(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }
}

/// Split text into paragraphs on blank lines, dropping empty ones
pub fn split_paragraphs(text: &str) -> Vec<&str> {
    text.split(PARAGRAPH_SEPARATOR)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

/// Packs paragraphs into chunks under a token budget
pub struct TextChunker {
    counter: Arc<dyn TokenCounter>,
    max_tokens: usize,
}

impl TextChunker {
    /// Create a new text chunker
    pub fn new(counter: Arc<dyn TokenCounter>, max_tokens: usize) -> Self {
        Self {
            counter,
            max_tokens,
        }
    }

    /// Split raw text into paragraphs, then chunk them
    pub fn chunk_text(&self, text: &str) -> Vec<String> {
        self.chunk_paragraphs(&split_paragraphs(text))
    }

    /// Chunk paragraphs in order
    ///
    /// A chunk is closed when the next paragraph would push its running
    /// token total past the budget. A paragraph that alone exceeds the
    /// budget still gets a chunk of its own; text is never split below
    /// paragraph granularity.
    pub fn chunk_paragraphs<S: AsRef<str>>(&self, paragraphs: &[S]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current_chunk = String::new();
        let mut current_tokens = 0;

        for paragraph in paragraphs {
            let paragraph = paragraph.as_ref();
            let paragraph_tokens = self.counter.count_tokens(paragraph);

            if !current_chunk.is_empty() && current_tokens + paragraph_tokens > self.max_tokens {
                chunks.push(std::mem::take(&mut current_chunk));
                current_tokens = 0;
            }

            current_chunk.push_str(paragraph);
            current_chunk.push_str(PARAGRAPH_SEPARATOR);
            current_tokens += paragraph_tokens;
        }

        if !current_chunk.is_empty() {
            chunks.push(current_chunk);
        }

        chunks
    }
}
