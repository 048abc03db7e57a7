//! Error types for the evalsum library.
//!
//! Four error types reflect four distinct failure modes:
//!
//! * [`SummarizeError`] — **Fatal**: the run cannot produce a report (bad
//!   input, no extractable text, rejected credentials, no usable model).
//!   Returned as `Err(SummarizeError)` from the top-level `summarize*`
//!   functions and rendered with the failure marker by
//!   [`crate::summarize::render_outcome`].
//!
//! * [`ApiFailure`] — the typed classification of a single LLM call. The
//!   model selector and chunk summarizer branch on its variant, never on
//!   the provider's message wording.
//!
//! * [`ChunkError`] — **Non-fatal**: one chunk could not be analysed (rate
//!   limit, transient API error). Stored inside
//!   [`crate::output::ChunkResult`] so the rest of the report survives.
//!
//! * [`ExtractionError`] — internal to the text extractor. Logged and turned
//!   into an empty string; the caller only ever sees "no extractable text".

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the evalsum library.
#[derive(Debug, Error)]
pub enum SummarizeError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// No PDF was supplied with the request.
    #[error("No PDF supplied. Upload a course evaluation PDF.")]
    MissingDocument,

    /// No API key was supplied with the request.
    #[error("No API key supplied. Provide it with --api-key or EVALSUM_API_KEY.")]
    MissingCredential,

    /// An API key was supplied but it is empty or whitespace.
    #[error("The API key is empty. Provide a valid key.")]
    EmptyCredential,

    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The bytes were read, but they are not a PDF.
    #[error("'{source_name}' is not a valid PDF (first bytes: {magic:?})")]
    NotAPdf { source_name: String, magic: Vec<u8> },

    // ── Extraction errors ─────────────────────────────────────────────────
    /// Neither the text layer nor OCR recovered any text.
    #[error("No extractable text found in '{source_name}' (text layer and OCR both came back empty).")]
    NoExtractableText { source_name: String },

    // ── Model errors ──────────────────────────────────────────────────────
    /// The provider rejected the API key.
    #[error("Invalid API key: the provider rejected the credentials ({detail}).")]
    InvalidCredentials { detail: String },

    /// Every candidate model was reported as not found.
    #[error("No compatible model available. Tried: {}", tried.join(", "))]
    NoCompatibleModel { tried: Vec<String> },

    /// The pinned model disappeared mid-run.
    #[error("Model '{model}' became unavailable during processing: {detail}")]
    ModelUnavailable { model: String, detail: String },

    /// Model selection hit a failure other than "model not found".
    #[error("Model selection stopped at '{model}': {failure}")]
    SelectionFailed { model: String, failure: ApiFailure },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output Markdown file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Typed outcome of a failed LLM call.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ApiFailure {
    /// HTTP 429 or provider-side throttling.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// 401/403: the key is wrong, revoked, or lacks access.
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    /// The model identifier does not exist for this key.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// Anything else: 5xx, network, malformed response.
    #[error("{0}")]
    Other(String),
}

impl ApiFailure {
    /// Failures that will recur on every later call, so the run must stop.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ApiFailure::InvalidCredentials(_) | ApiFailure::ModelNotFound(_)
        )
    }

    /// Short label used in progress output and inline notes.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiFailure::RateLimited(_) => "rate limit",
            ApiFailure::InvalidCredentials(_) => "invalid credentials",
            ApiFailure::ModelNotFound(_) => "model not found",
            ApiFailure::Other(_) => "API error",
        }
    }
}

/// A non-fatal error for a single chunk.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum ChunkError {
    /// The provider throttled this chunk's request.
    #[error("Part {part}: rate limited by the provider ({detail})")]
    RateLimited { part: usize, detail: String },

    /// Any other recoverable failure.
    #[error("Part {part}: request failed ({detail})")]
    RequestFailed { part: usize, detail: String },
}

impl ChunkError {
    /// Wrap a non-fatal [`ApiFailure`] for chunk `part` (1-indexed).
    pub fn from_failure(part: usize, failure: &ApiFailure) -> Self {
        match failure {
            ApiFailure::RateLimited(detail) => ChunkError::RateLimited {
                part,
                detail: detail.clone(),
            },
            other => ChunkError::RequestFailed {
                part,
                detail: other.to_string(),
            },
        }
    }
}

/// Failures inside the text extractor. Never leaves the extraction stage.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("failed to bind to pdfium: {0}")]
    PdfiumBinding(String),

    #[error("PDF could not be opened: {0}")]
    Load(String),

    #[error("page {page}: {detail}")]
    Page { page: usize, detail: String },

    #[error("OCR engine '{engine}' unavailable: {detail}")]
    EngineUnavailable { engine: String, detail: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
