//! Offline integration tests for the summarisation pipeline.
//!
//! The text layer, the OCR engine and the completion client are replaced
//! with in-process doubles through `SummaryConfig`, so these run without
//! pdfium, tesseract, or network access.

use async_trait::async_trait;
use evalsum::{
    summarize_bytes, summarize_request, ApiFailure, ChunkError, Completion, CompletionClient,
    CompletionRequest, ExtractionMethod, OcrEngine, Stage, SummarizeError, SummaryConfig,
    SummaryProgressCallback, SummaryRequest, SynthesisOutcome, TextLayer, FAILURE_MARKER,
};
use evalsum::error::ExtractionError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

const PDF: &[u8] = b"%PDF-1.7\nfixture";
const CHUNK_PROMPT: &str = "SUMMARIZE:";
const MERGE_PROMPT: &str = "MERGE:";

// ── Test doubles ─────────────────────────────────────────────────────────────

struct FixedLayer(String);

impl TextLayer for FixedLayer {
    fn extract(&self, _pdf: &[u8]) -> Result<String, ExtractionError> {
        Ok(self.0.clone())
    }
}

struct CountingOcr {
    text: String,
    calls: AtomicUsize,
}

impl CountingOcr {
    fn new(text: &str) -> Arc<Self> {
        Arc::new(Self {
            text: text.to_string(),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl OcrEngine for CountingOcr {
    fn recognize(&self, _pdf: &[u8]) -> Result<String, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.text.clone())
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Chunk { model: String, payload: String },
    Merge { model: String },
}

type Responder = dyn Fn(&Call, usize) -> Result<Completion, ApiFailure> + Send + Sync;

/// Records every request and answers through `respond(call, chunk_call_index)`.
struct ScriptedClient {
    calls: Mutex<Vec<Call>>,
    chunk_calls: AtomicUsize,
    respond: Box<Responder>,
}

impl ScriptedClient {
    fn new(
        respond: impl Fn(&Call, usize) -> Result<Completion, ApiFailure> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            chunk_calls: AtomicUsize::new(0),
            respond: Box::new(respond),
        })
    }

    /// Answers chunk call N with "analysis N" and merges successfully.
    fn echo() -> Arc<Self> {
        Self::new(|call, i| match call {
            Call::Chunk { .. } => ok(&format!("analysis {}", i + 1)),
            Call::Merge { .. } => ok("## Summary\n- merged"),
        })
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn chunk_models(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Chunk { model, .. } => Some(model),
                Call::Merge { .. } => None,
            })
            .collect()
    }

    fn merge_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Merge { .. }))
            .count()
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, ApiFailure> {
        let (call, index) = if let Some(rest) = request.prompt.strip_prefix(CHUNK_PROMPT) {
            let i = self.chunk_calls.fetch_add(1, Ordering::SeqCst);
            let call = Call::Chunk {
                model: request.model.clone(),
                payload: rest.trim_start_matches('\n').to_string(),
            };
            (call, i)
        } else {
            assert!(request.prompt.starts_with(MERGE_PROMPT), "unexpected prompt");
            let call = Call::Merge {
                model: request.model.clone(),
            };
            (call, 0)
        };
        self.calls.lock().unwrap().push(call.clone());
        (self.respond)(&call, index)
    }
}

#[derive(Default)]
struct RecordingProgress {
    stages: Mutex<Vec<Stage>>,
    completed: Mutex<Option<bool>>,
}

impl SummaryProgressCallback for RecordingProgress {
    fn on_stage(&self, stage: Stage) {
        self.stages.lock().unwrap().push(stage);
    }

    fn on_complete(&self, success: bool) {
        *self.completed.lock().unwrap() = Some(success);
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn ok(text: &str) -> Result<Completion, ApiFailure> {
    Ok(Completion {
        text: text.to_string(),
        input_tokens: 10,
        output_tokens: 5,
    })
}

/// `n` three-character words; seven of them fill a 30-char chunk.
fn words(n: usize) -> String {
    (0..n)
        .map(|i| format!("w{:02}", i % 100))
        .collect::<Vec<_>>()
        .join(" ")
}

fn config(
    text: &str,
    ocr: Option<Arc<CountingOcr>>,
    client: Arc<ScriptedClient>,
    chunk_chars: usize,
) -> SummaryConfig {
    let mut builder = SummaryConfig::builder()
        .text_layer(Arc::new(FixedLayer(text.to_string())))
        .client(client)
        .candidate_models(["m1"])
        .chunk_chars(chunk_chars)
        .min_text_chars(20)
        .instruction_prompt(CHUNK_PROMPT)
        .synthesis_prompt(MERGE_PROMPT);
    match ocr {
        Some(engine) => builder = builder.ocr_engine(engine),
        None => builder = builder.ocr_enabled(false),
    }
    builder.build().unwrap()
}

async fn run(config: &SummaryConfig) -> Result<evalsum::Report, SummarizeError> {
    summarize_bytes(PDF.to_vec(), "fixture.pdf", Some("test-key"), config).await
}

// ── Extraction ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn long_text_layer_never_invokes_ocr() {
    let ocr = CountingOcr::new("ocr text that should not be used at all");
    let client = ScriptedClient::echo();
    let cfg = config(&words(10), Some(ocr.clone()), client, 1_000);

    let report = run(&cfg).await.unwrap();
    assert_eq!(ocr.calls(), 0);
    assert_eq!(report.stats.extraction_method, ExtractionMethod::TextLayer);
    assert!(report.markdown.contains("(text via text layer)"));
}

#[tokio::test]
async fn short_text_layer_invokes_ocr_exactly_once() {
    let ocr = CountingOcr::new(&words(12));
    let client = ScriptedClient::echo();
    let cfg = config("scan", Some(ocr.clone()), client, 1_000);

    let report = run(&cfg).await.unwrap();
    assert_eq!(ocr.calls(), 1);
    assert_eq!(report.stats.extraction_method, ExtractionMethod::Ocr);
    assert!(report.markdown.contains("(text via OCR)"));
}

#[tokio::test]
async fn empty_text_layer_invokes_ocr_exactly_once() {
    let ocr = CountingOcr::new(&words(12));
    let client = ScriptedClient::echo();
    let cfg = config("", Some(ocr.clone()), client, 1_000);

    run(&cfg).await.unwrap();
    assert_eq!(ocr.calls(), 1);
}

#[tokio::test]
async fn no_text_anywhere_fails_before_any_model_call() {
    let ocr = CountingOcr::new("   ");
    let client = ScriptedClient::echo();
    let cfg = config("", Some(ocr.clone()), client.clone(), 1_000);

    let err = run(&cfg).await.unwrap_err();
    assert!(matches!(err, SummarizeError::NoExtractableText { .. }));
    assert_eq!(ocr.calls(), 1);
    assert!(client.calls().is_empty());
}

// ── Chunking ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn chunks_respect_budget_and_preserve_words() {
    let text = words(40);
    let client = ScriptedClient::echo();
    let cfg = config(&text, None, client.clone(), 30);

    let report = run(&cfg).await.unwrap();
    let payloads: Vec<String> = client
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            Call::Chunk { payload, .. } => Some(payload),
            Call::Merge { .. } => None,
        })
        .collect();

    assert!(payloads.len() > 1);
    assert_eq!(report.stats.chunk_count, payloads.len());
    for p in &payloads {
        assert!(p.chars().count() <= 30, "chunk {p:?} exceeds budget");
    }
    let rejoined: Vec<&str> = payloads.iter().flat_map(|p| p.split_whitespace()).collect();
    assert_eq!(rejoined, text.split_whitespace().collect::<Vec<_>>());
}

// ── Model selection ──────────────────────────────────────────────────────────

#[tokio::test]
async fn selection_pins_third_candidate_for_every_later_chunk() {
    let client = ScriptedClient::new(|call, _| match call {
        Call::Chunk { model, .. } if model == "m1" || model == "m2" => {
            Err(ApiFailure::ModelNotFound(model.clone()))
        }
        Call::Chunk { .. } => ok("analysis"),
        Call::Merge { .. } => ok("merged"),
    });
    let cfg = SummaryConfig {
        candidate_models: vec!["m1".into(), "m2".into(), "m3".into(), "m4".into()],
        ..config(&words(30), None, client.clone(), 30)
    };

    let report = run(&cfg).await.unwrap();
    let models = client.chunk_models();
    assert_eq!(&models[..3], &["m1", "m2", "m3"]);
    assert!(models[3..].iter().all(|m| m == "m3"));
    assert_eq!(models.len(), 3 + report.stats.chunk_count - 1);
    assert_eq!(report.model, "m3");
    assert_eq!(report.stats.selection_attempts, 3);
    assert!(client.calls().iter().all(|c| !matches!(c, Call::Merge { model } if model != "m3")));
}

#[tokio::test]
async fn no_candidate_exists() {
    let client = ScriptedClient::new(|_, _| Err(ApiFailure::ModelNotFound("404".into())));
    let cfg = SummaryConfig {
        candidate_models: vec!["a".into(), "b".into()],
        ..config(&words(10), None, client.clone(), 1_000)
    };

    let err = run(&cfg).await.unwrap_err();
    assert!(matches!(err, SummarizeError::NoCompatibleModel { ref tried } if tried == &["a", "b"]));
    assert_eq!(client.calls().len(), 2);
}

#[tokio::test]
async fn rejected_key_during_selection_is_terminal() {
    let client =
        ScriptedClient::new(|_, _| Err(ApiFailure::InvalidCredentials("401 invalid x-api-key".into())));
    let cfg = SummaryConfig {
        candidate_models: vec!["a".into(), "b".into()],
        ..config(&words(10), None, client.clone(), 1_000)
    };

    let err = run(&cfg).await.unwrap_err();
    assert!(matches!(err, SummarizeError::InvalidCredentials { .. }));
    assert_eq!(client.calls().len(), 1);
}

// ── Chunk failures ───────────────────────────────────────────────────────────

#[tokio::test]
async fn rejected_key_mid_run_halts_further_chunks() {
    let client = ScriptedClient::new(|call, i| match call {
        Call::Chunk { .. } if i == 1 => Err(ApiFailure::InvalidCredentials("revoked".into())),
        Call::Chunk { .. } => ok("analysis"),
        Call::Merge { .. } => ok("merged"),
    });
    let cfg = config(&words(40), None, client.clone(), 30);

    let err = run(&cfg).await.unwrap_err();
    assert!(matches!(err, SummarizeError::InvalidCredentials { .. }));
    assert_eq!(client.chunk_models().len(), 2);
    assert_eq!(client.merge_count(), 0);
}

#[tokio::test]
async fn vanished_model_mid_run_halts_further_chunks() {
    let client = ScriptedClient::new(|call, i| match call {
        Call::Chunk { .. } if i == 1 => Err(ApiFailure::ModelNotFound("gone".into())),
        Call::Chunk { .. } => ok("analysis"),
        Call::Merge { .. } => ok("merged"),
    });
    let cfg = config(&words(40), None, client.clone(), 30);

    let err = run(&cfg).await.unwrap_err();
    assert!(matches!(err, SummarizeError::ModelUnavailable { ref model, .. } if model == "m1"));
    assert_eq!(client.chunk_models().len(), 2);
}

#[tokio::test]
async fn rate_limited_chunk_does_not_stop_the_next() {
    let client = ScriptedClient::new(|call, i| match call {
        Call::Chunk { .. } if i == 1 => Err(ApiFailure::RateLimited("429".into())),
        Call::Chunk { .. } => ok(&format!("analysis {}", i + 1)),
        Call::Merge { .. } => ok("merged"),
    });
    let cfg = config(&words(21), None, client.clone(), 30);

    let report = run(&cfg).await.unwrap();
    assert_eq!(report.stats.chunk_count, 3);
    assert_eq!(client.chunk_models().len(), 3);
    assert!(matches!(
        report.chunks[1].error,
        Some(ChunkError::RateLimited { part: 2, .. })
    ));
    assert!(report.chunks[2].is_success());
    assert_eq!(report.stats.failed_chunks, 1);
    assert_eq!(report.synthesis, SynthesisOutcome::Merged);
}

#[tokio::test]
async fn lone_surviving_chunk_lists_parts_without_merging() {
    let client = ScriptedClient::new(|call, i| match call {
        Call::Chunk { .. } if i == 0 => ok("only analysis"),
        Call::Chunk { .. } => Err(ApiFailure::Other("overloaded".into())),
        Call::Merge { .. } => ok("merged"),
    });
    let cfg = config(&words(14), None, client.clone(), 30);

    let report = run(&cfg).await.unwrap();
    assert_eq!(client.merge_count(), 0);
    assert_eq!(report.synthesis, SynthesisOutcome::NotNeeded);
    assert!(report.markdown.contains("## Analysis Part 1\n\nonly analysis"));
    assert!(report.markdown.contains("## Analysis Part 2"));
    assert!(report.markdown.contains("overloaded"));
}

// ── Synthesis ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn single_chunk_skips_synthesis() {
    let client = ScriptedClient::new(|_, _| ok("## Summary\n- Students liked the labs"));
    let cfg = config(&words(10), None, client.clone(), 1_000);

    let report = run(&cfg).await.unwrap();
    assert_eq!(client.calls().len(), 1);
    assert_eq!(report.synthesis, SynthesisOutcome::NotNeeded);
    assert_eq!(
        report.markdown,
        "## Summary\n- Students liked the labs\n\n---\n\n\
         *Processed 10 words in 1 chunk(s) using m1 (text via text layer)*\n"
    );
}

#[tokio::test]
async fn multiple_chunks_are_merged() {
    let client = ScriptedClient::echo();
    let cfg = config(&words(14), None, client.clone(), 30);

    let report = run(&cfg).await.unwrap();
    assert_eq!(client.merge_count(), 1);
    assert_eq!(client.calls().last(), Some(&Call::Merge { model: "m1".into() }));
    assert_eq!(report.synthesis, SynthesisOutcome::Merged);
    assert!(report.markdown.starts_with("## Summary\n- merged"));
    assert!(!report.markdown.contains("Analysis Part"));
    assert!(report.markdown.contains("in 2 chunk(s) using m1"));
    assert_eq!(report.stats.total_input_tokens, 30);
}

#[tokio::test]
async fn merged_report_keeps_note_for_failed_part() {
    let client = ScriptedClient::new(|call, i| match call {
        Call::Chunk { .. } if i == 1 => Err(ApiFailure::RateLimited("429".into())),
        Call::Chunk { .. } => ok(&format!("analysis {}", i + 1)),
        Call::Merge { .. } => ok("## Summary\n- merged"),
    });
    let cfg = config(&words(21), None, client.clone(), 30);

    let report = run(&cfg).await.unwrap();
    assert_eq!(report.synthesis, SynthesisOutcome::Merged);
    assert_eq!(report.stats.failed_chunks, 1);
    let md = &report.markdown;
    assert!(md.starts_with("## Summary\n- merged\n\n> ⚠️"), "got {md:?}");
    assert!(md.contains("Part 2: rate limited by the provider (429)"));
    assert_eq!(md.matches("⚠️").count(), 1);
    let note = md.find("Part 2: rate limited").unwrap();
    let footer = md.find("*Processed 21 words in 3 chunk(s)").unwrap();
    assert!(note < footer);
}

#[tokio::test]
async fn failed_synthesis_degrades_to_parts() {
    let client = ScriptedClient::new(|call, i| match call {
        Call::Chunk { .. } => ok(&format!("analysis {}", i + 1)),
        Call::Merge { .. } => Err(ApiFailure::RateLimited("429 too many requests".into())),
    });
    let cfg = config(&words(14), None, client.clone(), 30);

    let report = run(&cfg).await.unwrap();
    assert!(matches!(report.synthesis, SynthesisOutcome::Degraded(_)));
    let md = &report.markdown;
    let p1 = md.find("## Analysis Part 1").unwrap();
    let p2 = md.find("## Analysis Part 2").unwrap();
    assert!(p1 < p2);
    assert!(md.contains("analysis 1"));
    assert!(md.contains("analysis 2"));
    assert!(md.contains("could not be merged"));
    assert!(md.contains("429 too many requests"));
    assert!(md.trim_end().ends_with("(text via text layer)*"));
}

// ── Request surface ──────────────────────────────────────────────────────────

#[tokio::test]
async fn request_with_non_pdf_renders_failure() {
    let client = ScriptedClient::echo();
    let cfg = config(&words(10), None, client.clone(), 1_000);
    let out = summarize_request(
        SummaryRequest {
            pdf: Some(b"GIF89a....".to_vec()),
            api_key: Some("k".into()),
        },
        &cfg,
    )
    .await;

    assert!(out.starts_with(FAILURE_MARKER));
    assert!(out.contains("not a valid PDF"));
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn request_with_blank_key_makes_no_calls() {
    let client = ScriptedClient::echo();
    let cfg = config(&words(10), None, client.clone(), 1_000);
    let out = summarize_request(
        SummaryRequest {
            pdf: Some(PDF.to_vec()),
            api_key: Some("   ".into()),
        },
        &cfg,
    )
    .await;

    assert!(out.starts_with(FAILURE_MARKER));
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn request_success_returns_report_markdown() {
    let client = ScriptedClient::echo();
    let cfg = config(&words(10), None, client, 1_000);
    let out = summarize_request(
        SummaryRequest {
            pdf: Some(PDF.to_vec()),
            api_key: Some("k".into()),
        },
        &cfg,
    )
    .await;

    assert!(!out.starts_with(FAILURE_MARKER));
    assert!(out.starts_with("analysis 1"));
}

// ── Progress ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn stages_are_reported_in_order() {
    let progress = Arc::new(RecordingProgress::default());
    let ocr = CountingOcr::new(&words(16));
    let client = ScriptedClient::echo();
    let cfg = SummaryConfig {
        progress_callback: Some(progress.clone()),
        ..config("", Some(ocr), client, 30)
    };

    run(&cfg).await.unwrap();
    assert_eq!(
        *progress.stages.lock().unwrap(),
        vec![
            Stage::Extracting,
            Stage::OcrFallback,
            Stage::Chunking,
            Stage::SelectingModel,
            Stage::Summarizing,
            Stage::Synthesizing,
            Stage::Done,
        ]
    );
    assert_eq!(*progress.completed.lock().unwrap(), Some(true));
}

#[tokio::test]
async fn failure_stage_is_reported() {
    let progress = Arc::new(RecordingProgress::default());
    let client = ScriptedClient::echo();
    let cfg = SummaryConfig {
        progress_callback: Some(progress.clone()),
        ..config("", None, client, 30)
    };

    run(&cfg).await.unwrap_err();
    let stages = progress.stages.lock().unwrap().clone();
    assert_eq!(stages, vec![Stage::Extracting, Stage::Failed]);
    assert_eq!(*progress.completed.lock().unwrap(), Some(false));
}

#[tokio::test]
async fn single_chunk_run_passes_through_summarizing() {
    let progress = Arc::new(RecordingProgress::default());
    let client = ScriptedClient::echo();
    let cfg = SummaryConfig {
        progress_callback: Some(progress.clone()),
        ..config(&words(10), None, client, 1_000)
    };

    run(&cfg).await.unwrap();
    assert_eq!(
        *progress.stages.lock().unwrap(),
        vec![
            Stage::Extracting,
            Stage::Chunking,
            Stage::SelectingModel,
            Stage::Summarizing,
            Stage::Done,
        ]
    );
}
