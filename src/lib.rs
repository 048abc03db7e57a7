//! # evalsum
//!
//! Summarise course-evaluation PDFs into constructive suggestions and
//! supportive student comments using a hosted large language model.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input       resolve local file, URL, or uploaded bytes
//!  ├─ 2. Extract     pdfium text layer; tesseract OCR when it looks scanned
//!  ├─ 3. Chunk       word-aligned packing under a character budget
//!  ├─ 4. Select      try candidate models on the first chunk, pin the first that exists
//!  ├─ 5. Summarize   one request per remaining chunk, failures recorded inline
//!  ├─ 6. Synthesize  merge part analyses (or list them if the merge fails)
//!  └─ 7. Output      Markdown report + metadata line + stats
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use evalsum::{summarize, SummaryConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SummaryConfig::default();
//!     let key = std::env::var("EVALSUM_API_KEY").ok();
//!     let report = summarize("evaluations.pdf", key.as_deref(), &config).await?;
//!     println!("{}", report.markdown);
//!     eprintln!("model: {}, chunks: {}", report.model, report.stats.chunk_count);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `evalsum` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! evalsum = { version = "0.1", default-features = false }
//! ```
//!
//! ## Runtime Requirements
//!
//! pdfium is resolved through `pdfium-auto`: `PDFIUM_LIB_PATH` if set,
//! otherwise a per-user cache that is filled by a one-time download. OCR
//! additionally needs the `tesseract` binary on `PATH`; without it scanned
//! documents fail with "no extractable text".

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod summarize;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ProviderKind, SummaryConfig, SummaryConfigBuilder};
pub use error::{ApiFailure, ChunkError, SummarizeError};
pub use output::{ChunkResult, ExtractedText, ExtractionMethod, Report, ReportStats, Stage, SynthesisOutcome};
pub use pipeline::extract::TextLayer;
pub use pipeline::llm::{Completion, CompletionClient, CompletionRequest};
pub use pipeline::ocr::OcrEngine;
pub use progress::{NoopProgressCallback, ProgressCallback, SummaryProgressCallback};
pub use summarize::{
    extract_text, render_outcome, summarize, summarize_bytes, summarize_document, summarize_request,
    summarize_sync, summarize_to_file, SummaryRequest, FAILURE_MARKER,
};
