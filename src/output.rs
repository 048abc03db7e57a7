//! Result types returned by a summarisation run.
//!
//! Everything here is `Serialize` so the CLI's `--json` mode can dump the
//! whole [`Report`] without a parallel DTO layer.

use crate::error::ChunkError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// States of a single run.
///
/// ```text
/// Idle → Extracting → (OcrFallback) → Chunking → SelectingModel
///      → Summarizing → (Synthesizing) → Done
/// ```
///
/// `Failed` is reachable from `Extracting`, `SelectingModel`, and
/// `Summarizing`. A failed synthesis still ends in `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Idle,
    Extracting,
    OcrFallback,
    Chunking,
    SelectingModel,
    Summarizing,
    Synthesizing,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Idle => "idle",
            Stage::Extracting => "extracting text",
            Stage::OcrFallback => "running OCR",
            Stage::Chunking => "chunking",
            Stage::SelectingModel => "selecting model",
            Stage::Summarizing => "summarizing",
            Stage::Synthesizing => "synthesizing",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Which path produced the document text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// Embedded text layer.
    TextLayer,
    /// Character recognition over rendered pages.
    Ocr,
    /// Nothing recovered.
    None,
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionMethod::TextLayer => f.write_str("text layer"),
            ExtractionMethod::Ocr => f.write_str("OCR"),
            ExtractionMethod::None => f.write_str("none"),
        }
    }
}

/// Text recovered from a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    pub text: String,
    pub method: ExtractionMethod,
}

impl ExtractedText {
    pub fn empty() -> Self {
        Self {
            text: String::new(),
            method: ExtractionMethod::None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// Outcome for one chunk (one slot of the report).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkResult {
    /// 1-indexed position in the chunk sequence.
    pub part: usize,
    /// Character count of the chunk text that was sent.
    pub input_chars: usize,
    /// Cleaned model output; empty when `error` is set.
    pub markdown: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub duration_ms: u64,
    pub error: Option<ChunkError>,
}

impl ChunkResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Text shown for this slot in a multi-part report.
    pub fn slot_text(&self) -> String {
        match &self.error {
            None => self.markdown.clone(),
            Some(e) => format!("> ⚠️ This part could not be analyzed: {e}"),
        }
    }
}

/// What happened at the synthesis step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum SynthesisOutcome {
    /// Fewer than two chunks produced output.
    NotNeeded,
    /// The model merged the parts.
    Merged,
    /// The merge call failed; the report lists the parts.
    Degraded(String),
}

/// Aggregate numbers for a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportStats {
    pub word_count: usize,
    pub chunk_count: usize,
    pub failed_chunks: usize,
    pub extraction_method: ExtractionMethod,
    /// Calls issued while picking the model (includes the successful one).
    pub selection_attempts: usize,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub extraction_duration_ms: u64,
    pub llm_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// The final product of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Markdown returned to the caller, metadata line included.
    pub markdown: String,
    /// The pinned model identifier.
    pub model: String,
    pub chunks: Vec<ChunkResult>,
    pub synthesis: SynthesisOutcome,
    pub stats: ReportStats,
}
