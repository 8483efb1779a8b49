//! Progress-callback trait for chunk-tagging events.
//!
//! Tagging makes one model call per chunk, strictly in order, so a subject
//! with a few hundred chunks runs for minutes. Pass an
//! [`Arc<dyn TaggingProgressCallback>`] to [`crate::ingest::tag_chunks`] to
//! drive a progress bar or forward events elsewhere.
//!
//! # Example
//!
//! ```rust
//! use studygen::TaggingProgressCallback;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! struct Fallbacks(AtomicUsize);
//!
//! impl TaggingProgressCallback for Fallbacks {
//!     fn on_chunk_fallback(&self, chunk: usize, _total: usize, error: &str) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("chunk {chunk} tagged General: {error}");
//!     }
//! }
//! ```

use crate::output::ChunkTag;
use std::sync::Arc;

/// Called by [`crate::ingest::tag_chunks`] as it works through the chunks.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Chunk numbers are 1-indexed.
pub trait TaggingProgressCallback: Send + Sync {
    /// Called once before the first chunk.
    fn on_tagging_start(&self, total_chunks: usize) {
        let _ = total_chunks;
    }

    /// Called when a chunk received a tag from the model.
    fn on_chunk_tagged(&self, chunk: usize, total_chunks: usize, tag: &ChunkTag) {
        let _ = (chunk, total_chunks, tag);
    }

    /// Called when a chunk fell back to the general tag after a failure.
    fn on_chunk_fallback(&self, chunk: usize, total_chunks: usize, error: &str) {
        let _ = (chunk, total_chunks, error);
    }

    /// Called once after every chunk has a tag.
    ///
    /// `model_tagged` counts chunks whose tag came from the model.
    fn on_tagging_complete(&self, total_chunks: usize, model_tagged: usize) {
        let _ = (total_chunks, model_tagged);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl TaggingProgressCallback for NoopProgressCallback {}

/// Shared handle to a callback.
pub type ProgressCallback = Arc<dyn TaggingProgressCallback>;
