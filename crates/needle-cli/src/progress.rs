//! Terminal progress bar for extraction runs.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use needle_extractor::ProgressReporter;

const TEMPLATE: &str = "{spinner} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}";

/// Chunk progress drawn on stderr.
///
/// The bar stays hidden when stderr is not a terminal, so piped output is
/// unaffected.
pub struct ChunkProgressBar {
    bar: ProgressBar,
}

impl ChunkProgressBar {
    /// Create a bar on stderr.
    pub fn new() -> Self {
        Self::with_draw_target(ProgressDrawTarget::stderr())
    }

    /// Create a bar that never draws.
    pub fn hidden() -> Self {
        Self::with_draw_target(ProgressDrawTarget::hidden())
    }

    fn with_draw_target(target: ProgressDrawTarget) -> Self {
        let bar = ProgressBar::with_draw_target(Some(0), target);
        let style = ProgressStyle::with_template(TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-");
        bar.set_style(style);
        bar.set_message("Extracting Needles");
        Self { bar }
    }

    /// Chunks collected so far.
    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    /// Total chunks in the run.
    pub fn length(&self) -> Option<u64> {
        self.bar.length()
    }
}

impl Default for ChunkProgressBar {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for ChunkProgressBar {
    fn start(&self, total_chunks: usize) {
        self.bar.set_length(total_chunks as u64);
        self.bar.set_position(0);
    }

    fn chunk_done(&self) {
        self.bar.inc(1);
    }

    fn finish(&self) {
        self.bar.finish_with_message("done");
    }
}
