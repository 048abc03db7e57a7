//! Top-level summarisation entry points.
//!
//! A run walks one state machine, start to finish, with sequential awaits:
//!
//! ```text
//! Idle → Extracting → (OcrFallback) → Chunking → SelectingModel
//!      → Summarizing → (Synthesizing) → Done
//! ```
//!
//! Every transition is logged and forwarded to the configured
//! [`crate::progress::SummaryProgressCallback`]. Fatal conditions return
//! `Err(SummarizeError)`; [`render_outcome`] turns either outcome into the
//! single string a front end shows.

use crate::config::SummaryConfig;
use crate::error::SummarizeError;
use crate::output::{ChunkResult, ExtractedText, ExtractionMethod, Report, ReportStats, Stage, SynthesisOutcome};
use crate::pipeline::chunk::chunk_text;
use crate::pipeline::extract::{extract_document, PdfiumTextLayer, TextExtractor, TextLayer};
use crate::pipeline::input::{self, Document};
use crate::pipeline::llm::{self, CompletionClient};
use crate::pipeline::ocr::{OcrEngine, TesseractOcr};
use crate::pipeline::select::select_model;
use crate::pipeline::{postprocess, synthesize};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Prefix of every rendered failure.
pub const FAILURE_MARKER: &str = "❌";

/// The two parameters of a summarisation request, as a form would submit
/// them. Either may be missing.
#[derive(Clone, Default)]
pub struct SummaryRequest {
    pub pdf: Option<Vec<u8>>,
    pub api_key: Option<String>,
}

impl std::fmt::Debug for SummaryRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SummaryRequest")
            .field("pdf_bytes", &self.pdf.as_ref().map(Vec::len))
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Summarise a PDF file or URL.
///
/// # Arguments
/// * `input`   — local path or HTTP/HTTPS URL
/// * `api_key` — provider credential; `None` or blank is rejected before any
///   download or model call
/// * `config`  — run configuration
///
/// # Errors
/// Any [`SummarizeError`]. A rate-limited chunk or a failed synthesis is
/// not an error: it shows up in the report.
pub async fn summarize(
    input: impl AsRef<str>,
    api_key: Option<&str>,
    config: &SummaryConfig,
) -> Result<Report, SummarizeError> {
    let input = input.as_ref();
    if input.trim().is_empty() {
        return Err(SummarizeError::MissingDocument);
    }
    let api_key = input::validate_api_key(api_key)?;
    let document = input::load_document(input, config.download_timeout_secs).await?;
    summarize_document(document, &api_key, config).await
}

/// Summarise PDF bytes already in memory.
///
/// `source` labels the document in logs and errors.
pub async fn summarize_bytes(
    bytes: Vec<u8>,
    source: impl Into<String>,
    api_key: Option<&str>,
    config: &SummaryConfig,
) -> Result<Report, SummarizeError> {
    let document = Document::from_bytes(bytes, source)?;
    let api_key = input::validate_api_key(api_key)?;
    summarize_document(document, &api_key, config).await
}

/// Summarise a loaded [`Document`] with a validated key.
pub async fn summarize_document(
    document: Document,
    api_key: &str,
    config: &SummaryConfig,
) -> Result<Report, SummarizeError> {
    let result = run(document, api_key, config).await;
    match &result {
        Ok(report) => {
            info!(
                "Summary complete: {} chunk(s), {} failed, {}ms",
                report.stats.chunk_count, report.stats.failed_chunks, report.stats.total_duration_ms
            );
            emit_stage(config, Stage::Done);
        }
        Err(e) => {
            warn!("Summary failed: {}", e);
            emit_stage(config, Stage::Failed);
        }
    }
    if let Some(ref cb) = config.progress_callback {
        cb.on_complete(result.is_ok());
    }
    result
}

/// Summarise and write the report Markdown to `output_path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn summarize_to_file(
    input: impl AsRef<str>,
    api_key: Option<&str>,
    output_path: impl AsRef<Path>,
    config: &SummaryConfig,
) -> Result<Report, SummarizeError> {
    let report = summarize(input, api_key, config).await?;
    write_report(&report.markdown, output_path.as_ref()).await?;
    Ok(report)
}

/// Synchronous wrapper around [`summarize`].
///
/// Creates a temporary tokio runtime internally.
pub fn summarize_sync(
    input: impl AsRef<str>,
    api_key: Option<&str>,
    config: &SummaryConfig,
) -> Result<Report, SummarizeError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| SummarizeError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(summarize(input, api_key, config))
}

/// Form-style entry point: always returns displayable text.
///
/// The PDF is checked before the key, matching the order a user fills the
/// form in.
pub async fn summarize_request(request: SummaryRequest, config: &SummaryConfig) -> String {
    let outcome = async {
        let bytes = request.pdf.ok_or(SummarizeError::MissingDocument)?;
        summarize_bytes(bytes, "upload", request.api_key.as_deref(), config).await
    }
    .await;
    render_outcome(&outcome)
}

/// Extract a document's text without calling a model.
///
/// Does not require an API key. An empty result is returned as-is rather
/// than as [`SummarizeError::NoExtractableText`].
pub async fn extract_text(
    input: impl AsRef<str>,
    config: &SummaryConfig,
) -> Result<ExtractedText, SummarizeError> {
    let document = input::load_document(input.as_ref(), config.download_timeout_secs).await?;
    extract_document(build_extractor(config), document.into_bytes()).await
}

/// The report Markdown, or the failure marker and the error message.
pub fn render_outcome(outcome: &Result<Report, SummarizeError>) -> String {
    match outcome {
        Ok(report) => report.markdown.clone(),
        Err(e) => format!("{FAILURE_MARKER} {e}"),
    }
}

/// The closing annotation of every report.
pub fn metadata_line(words: usize, chunks: usize, model: &str, method: ExtractionMethod) -> String {
    format!("*Processed {words} words in {chunks} chunk(s) using {model} (text via {method})*")
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn run(
    document: Document,
    api_key: &str,
    config: &SummaryConfig,
) -> Result<Report, SummarizeError> {
    let total_start = Instant::now();
    let source = document.source().to_string();
    info!("Summarizing '{}' ({} bytes)", source, document.byte_len());

    // ── Step 1: Extract text ─────────────────────────────────────────────
    emit_stage(config, Stage::Extracting);
    let extraction_start = Instant::now();
    let extracted = extract_document(build_extractor(config), document.into_bytes()).await?;
    let extraction_duration_ms = extraction_start.elapsed().as_millis() as u64;

    if extracted.is_empty() {
        return Err(SummarizeError::NoExtractableText { source_name: source });
    }
    let text_chars = extracted.text.chars().count();
    info!(
        "Extracted {} chars via {} in {}ms",
        text_chars, extracted.method, extraction_duration_ms
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_text_extracted(extracted.method, text_chars);
    }

    // ── Step 2: Chunk ────────────────────────────────────────────────────
    emit_stage(config, Stage::Chunking);
    let chunks = chunk_text(&extracted.text, config.chunk_chars);
    let total = chunks.len();
    let Some(first_chunk) = chunks.first() else {
        return Err(SummarizeError::NoExtractableText { source_name: source });
    };
    debug!("Split {} words into {} chunk(s)", extracted.word_count(), total);

    // ── Step 3: Select model on the first chunk ──────────────────────────
    emit_stage(config, Stage::SelectingModel);
    let client = llm::resolve_client(config, api_key);
    let llm_start = Instant::now();
    if let Some(ref cb) = config.progress_callback {
        cb.on_chunk_start(1, total);
    }
    let template = llm::chunk_request("", first_chunk, config);
    let selection = select_model(client.as_ref(), &config.effective_models(), &template).await?;
    if let Some(ref cb) = config.progress_callback {
        cb.on_model_selected(&selection.model, selection.attempts);
    }
    let model = selection.model;
    let first = llm::chunk_success(
        1,
        first_chunk,
        selection.completion,
        llm_start.elapsed().as_millis() as u64,
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_chunk_complete(1, total, first.markdown.len());
    }

    // ── Step 4: Remaining chunks ─────────────────────────────────────────
    emit_stage(config, Stage::Summarizing);
    let mut results = Vec::with_capacity(total);
    results.push(first);
    if total > 1 {
        let rest =
            llm::summarize_chunks(client.as_ref(), &model, &chunks[1..], 2, total, config).await?;
        results.extend(rest);
    }
    // Part 1 came from a successful selection, so at least one slot has output.
    let succeeded = results.iter().filter(|r| r.is_success()).count();

    // ── Step 5: Synthesize ───────────────────────────────────────────────
    let (body, synthesis, synthesis_tokens) =
        assemble_body(client.as_ref(), &model, &results, succeeded, config).await;
    let llm_duration_ms = llm_start.elapsed().as_millis() as u64;

    // ── Step 6: Annotate ─────────────────────────────────────────────────
    let word_count = extracted.word_count();
    let markdown = format!(
        "{}\n\n---\n\n{}\n",
        body.trim_end(),
        metadata_line(word_count, total, &model, extracted.method)
    );

    let stats = ReportStats {
        word_count,
        chunk_count: total,
        failed_chunks: total - succeeded,
        extraction_method: extracted.method,
        selection_attempts: selection.attempts,
        total_input_tokens: results.iter().map(|r| r.input_tokens as u64).sum::<u64>()
            + synthesis_tokens.0,
        total_output_tokens: results.iter().map(|r| r.output_tokens as u64).sum::<u64>()
            + synthesis_tokens.1,
        extraction_duration_ms,
        llm_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    Ok(Report {
        markdown,
        model,
        chunks: results,
        synthesis,
        stats,
    })
}

/// Report body plus the synthesis outcome and its (input, output) tokens.
async fn assemble_body(
    client: &dyn CompletionClient,
    model: &str,
    results: &[ChunkResult],
    succeeded: usize,
    config: &SummaryConfig,
) -> (String, SynthesisOutcome, (u64, u64)) {
    if succeeded < 2 {
        let body = if results.len() == 1 {
            results[0].markdown.clone()
        } else {
            synthesize::parts_report(results, None)
        };
        return (body, SynthesisOutcome::NotNeeded, (0, 0));
    }

    emit_stage(config, Stage::Synthesizing);
    match synthesize::synthesize(client, model, results, config).await {
        Ok(completion) => (
            synthesize::merged_report(&postprocess::clean_markdown(&completion.text), results),
            SynthesisOutcome::Merged,
            (completion.input_tokens as u64, completion.output_tokens as u64),
        ),
        Err(failure) => (
            synthesize::parts_report(results, Some(&failure)),
            SynthesisOutcome::Degraded(failure.to_string()),
            (0, 0),
        ),
    }
}

fn build_extractor(config: &SummaryConfig) -> TextExtractor {
    let text_layer: Arc<dyn TextLayer> = match config.text_layer {
        Some(ref layer) => Arc::clone(layer),
        None => Arc::new(PdfiumTextLayer),
    };
    let ocr: Option<Arc<dyn OcrEngine>> = if !config.ocr_enabled {
        None
    } else if let Some(ref engine) = config.ocr_engine {
        Some(Arc::clone(engine))
    } else {
        Some(Arc::new(TesseractOcr::new(
            config.ocr_language.clone(),
            config.ocr_max_pixels,
        )))
    };
    TextExtractor::new(text_layer, ocr, config.min_text_chars)
        .with_progress(config.progress_callback.clone())
}

fn emit_stage(config: &SummaryConfig, stage: Stage) {
    info!("Stage: {}", stage);
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage(stage);
    }
}

async fn write_report(markdown: &str, path: &Path) -> Result<(), SummarizeError> {
    let write_err = |e: std::io::Error| SummarizeError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }
    }

    let tmp_path = path.with_extension("md.tmp");
    tokio::fs::write(&tmp_path, markdown).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    Ok(())
}
