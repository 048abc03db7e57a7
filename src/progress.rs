//! Progress-callback trait for per-stage and per-chunk events.
//!
//! Inject an [`Arc<dyn SummaryProgressCallback>`] via
//! [`crate::config::SummaryConfigBuilder::progress_callback`] to receive
//! events as the run moves through its stages.
//!
//! # Example
//!
//! ```rust
//! use evalsum::{SummaryConfig, SummaryProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl SummaryProgressCallback for CountingCallback {
//!     fn on_chunk_complete(&self, part: usize, total: usize, output_len: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Part {}/{} done ({} bytes)", part, total, output_len);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { completed: AtomicUsize::new(0) });
//!
//! let config = SummaryConfig::builder()
//!     .progress_callback(counter as Arc<dyn SummaryProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::output::{ExtractionMethod, Stage};
use std::sync::Arc;

/// Called by the pipeline as it processes a document.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Chunks are processed sequentially, so events for a
/// single run never overlap.
pub trait SummaryProgressCallback: Send + Sync {
    /// Called on every state-machine transition.
    fn on_stage(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called once text extraction finishes.
    ///
    /// # Arguments
    /// * `method` — which path produced the text
    /// * `chars`  — character count of the extracted text
    fn on_text_extracted(&self, method: ExtractionMethod, chars: usize) {
        let _ = (method, chars);
    }

    /// Called when a candidate model has been pinned.
    ///
    /// # Arguments
    /// * `model`    — the pinned identifier
    /// * `attempts` — trial calls issued, including the successful one
    fn on_model_selected(&self, model: &str, attempts: usize) {
        let _ = (model, attempts);
    }

    /// Called just before a chunk request is sent (1-indexed `part`).
    fn on_chunk_start(&self, part: usize, total: usize) {
        let _ = (part, total);
    }

    /// Called when a chunk's analysis arrives.
    fn on_chunk_complete(&self, part: usize, total: usize, output_len: usize) {
        let _ = (part, total, output_len);
    }

    /// Called when a chunk fails with a recoverable error.
    fn on_chunk_error(&self, part: usize, total: usize, error: &str) {
        let _ = (part, total, error);
    }

    /// Called once when the run reaches `Done` or `Failed`.
    fn on_complete(&self, success: bool) {
        let _ = success;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl SummaryProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::SummaryConfig`].
pub type ProgressCallback = Arc<dyn SummaryProgressCallback>;
