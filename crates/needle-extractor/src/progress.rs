//! Progress reporting for long extraction runs

/// Receives chunk-level progress while a run is collecting results
///
/// Implementations must be cheap; they are called from the collecting loop.
pub trait ProgressReporter: Send + Sync {
    /// All chunk tasks are dispatched
    fn start(&self, total_chunks: usize);

    /// One chunk finished, successfully or not
    fn chunk_done(&self);

    /// Every chunk has been collected
    fn finish(&self);
}
