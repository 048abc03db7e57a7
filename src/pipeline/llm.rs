//! LLM interaction: the completion-client seam and per-chunk requests.
//!
//! [`CompletionClient`] is the one place the pipeline touches a hosted
//! model. The default [`ProviderClient`] drives an `edgequake-llm` provider
//! built from the request's API key and converts the provider's typed
//! [`LlmError`] into an [`ApiFailure`]. Every decision downstream (try the
//! next model, abort the run, record the failure inline) branches on that
//! enum.
//!
//! There is no retry or backoff here: a rate-limited chunk is recorded and
//! the run moves on.

use crate::config::{ProviderKind, SummaryConfig};
use crate::error::{ApiFailure, ChunkError, SummarizeError};
use crate::output::ChunkResult;
use crate::pipeline::postprocess;
use crate::prompts;
use async_trait::async_trait;
use edgequake_llm::{
    AnthropicProvider, ChatMessage, CompletionOptions, LLMProvider, LlmError, OpenAIProvider,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// One completion call.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub prompt: String,
    pub max_tokens: usize,
    pub temperature: f32,
}

/// Text and token usage returned by a successful call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

/// A hosted model endpoint.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, ApiFailure>;
}

/// [`CompletionClient`] backed by an `edgequake-llm` provider.
///
/// A provider is bound to one model, so a fresh one is built per call; this
/// is what lets the selector walk several candidate models with one key.
pub struct ProviderClient {
    kind: ProviderKind,
    api_key: String,
    base_url: Option<String>,
}

impl ProviderClient {
    pub fn new(kind: ProviderKind, api_key: impl Into<String>) -> Self {
        Self {
            kind,
            api_key: api_key.into(),
            base_url: None,
        }
    }

    /// Send requests to `url` instead of the provider's public endpoint.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    fn provider_for(&self, model: &str) -> Arc<dyn LLMProvider> {
        let key = self.api_key.clone();
        match (self.kind, self.base_url.clone()) {
            (ProviderKind::Anthropic, None) => {
                Arc::new(AnthropicProvider::new(key).with_model(model))
            }
            (ProviderKind::Anthropic, Some(url)) => Arc::new(
                AnthropicProvider::new(key)
                    .with_base_url(url)
                    .with_model(model),
            ),
            (ProviderKind::OpenAi, None) => Arc::new(OpenAIProvider::new(key).with_model(model)),
            (ProviderKind::OpenAi, Some(url)) => {
                Arc::new(OpenAIProvider::compatible(key, url).with_model(model))
            }
        }
    }
}

impl std::fmt::Debug for ProviderClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderClient")
            .field("kind", &self.kind)
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[async_trait]
impl CompletionClient for ProviderClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, ApiFailure> {
        let provider = self.provider_for(&request.model);
        let messages = vec![ChatMessage::user(request.prompt.as_str())];
        let options = CompletionOptions {
            temperature: Some(request.temperature),
            max_tokens: Some(request.max_tokens),
            ..Default::default()
        };

        let response = provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| classify(&request.model, e))?;

        Ok(Completion {
            text: response.content,
            input_tokens: response.prompt_tokens,
            output_tokens: response.completion_tokens,
        })
    }
}

/// What an untyped provider error actually was.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ErrorShape {
    Credentials,
    NotFound,
    RateLimit,
}

/// `"<error type>: <message>"`, as the Anthropic provider reports any status
/// it has no variant for.
static ERROR_TYPE_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([a-z_]+_error):").unwrap());

/// `"HTTP <status> ...: <body>"`, used when the error body is not JSON.
static HTTP_STATUS_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^HTTP (\d{3})\b").unwrap());

/// Recover the failure kind from an `LlmError::ApiError` payload.
///
/// Anthropic's error `type` token and the HTTP status are read from the
/// prefix the provider writes. OpenAI's error code is dropped before it
/// reaches us, so its two fixed sentences for a missing model and a bad key
/// are matched instead.
fn api_error_shape(detail: &str) -> Option<ErrorShape> {
    if let Some(caps) = ERROR_TYPE_PREFIX.captures(detail) {
        return match &caps[1] {
            "authentication_error" | "permission_error" => Some(ErrorShape::Credentials),
            "not_found_error" => Some(ErrorShape::NotFound),
            "rate_limit_error" => Some(ErrorShape::RateLimit),
            _ => None,
        };
    }
    if let Some(caps) = HTTP_STATUS_PREFIX.captures(detail) {
        return match &caps[1] {
            "401" | "403" => Some(ErrorShape::Credentials),
            "404" => Some(ErrorShape::NotFound),
            "429" => Some(ErrorShape::RateLimit),
            _ => None,
        };
    }
    if detail.starts_with("The model `") && detail.contains("does not exist") {
        return Some(ErrorShape::NotFound);
    }
    if detail.starts_with("Incorrect API key provided") {
        return Some(ErrorShape::Credentials);
    }
    None
}

/// Map the provider's error onto the pipeline's failure kinds.
pub fn classify(model: &str, err: LlmError) -> ApiFailure {
    match err {
        LlmError::RateLimited(detail) => ApiFailure::RateLimited(detail),
        LlmError::AuthError(detail) => ApiFailure::InvalidCredentials(detail),
        LlmError::ModelNotFound(detail) => {
            ApiFailure::ModelNotFound(format!("{model}: {detail}"))
        }
        LlmError::ApiError(detail) => match api_error_shape(&detail) {
            Some(ErrorShape::Credentials) => ApiFailure::InvalidCredentials(detail),
            Some(ErrorShape::NotFound) => ApiFailure::ModelNotFound(format!("{model}: {detail}")),
            Some(ErrorShape::RateLimit) => ApiFailure::RateLimited(detail),
            None => ApiFailure::Other(LlmError::ApiError(detail).to_string()),
        },
        other => ApiFailure::Other(other.to_string()),
    }
}

/// Build the default client for a config and key.
pub fn resolve_client(config: &SummaryConfig, api_key: &str) -> Arc<dyn CompletionClient> {
    if let Some(ref client) = config.client {
        return Arc::clone(client);
    }
    let client = ProviderClient::new(config.provider, api_key);
    match config.base_url {
        Some(ref url) => Arc::new(client.with_base_url(url.clone())),
        None => Arc::new(client),
    }
}

/// The request for one chunk against `model`.
pub fn chunk_request(model: &str, chunk: &str, config: &SummaryConfig) -> CompletionRequest {
    CompletionRequest {
        model: model.to_string(),
        prompt: prompts::with_payload(config.effective_instruction(), chunk),
        max_tokens: config.max_tokens,
        temperature: config.temperature,
    }
}

/// Turn a successful completion into a report slot.
pub fn chunk_success(part: usize, chunk: &str, completion: Completion, duration_ms: u64) -> ChunkResult {
    ChunkResult {
        part,
        input_chars: chunk.chars().count(),
        markdown: postprocess::clean_markdown(&completion.text),
        input_tokens: completion.input_tokens,
        output_tokens: completion.output_tokens,
        duration_ms,
        error: None,
    }
}

/// Summarise chunks `first_part..` with the pinned model.
///
/// `chunks` holds the texts still to send; `first_part` is the 1-indexed
/// part number of `chunks[0]` and `total` the overall chunk count.
///
/// Credential and model-not-found failures stop the loop at once and return
/// `Err`. Rate limits and other failures are stored in that chunk's slot and
/// the loop continues.
pub async fn summarize_chunks(
    client: &dyn CompletionClient,
    model: &str,
    chunks: &[String],
    first_part: usize,
    total: usize,
    config: &SummaryConfig,
) -> Result<Vec<ChunkResult>, SummarizeError> {
    let mut results = Vec::with_capacity(chunks.len());

    for (offset, chunk) in chunks.iter().enumerate() {
        let part = first_part + offset;
        if let Some(ref cb) = config.progress_callback {
            cb.on_chunk_start(part, total);
        }

        let start = Instant::now();
        let request = chunk_request(model, chunk, config);
        match client.complete(&request).await {
            Ok(completion) => {
                let duration_ms = start.elapsed().as_millis() as u64;
                debug!(
                    "Part {}/{}: {} input tokens, {} output tokens, {}ms",
                    part, total, completion.input_tokens, completion.output_tokens, duration_ms
                );
                let result = chunk_success(part, chunk, completion, duration_ms);
                if let Some(ref cb) = config.progress_callback {
                    cb.on_chunk_complete(part, total, result.markdown.len());
                }
                results.push(result);
            }
            Err(failure) if failure.is_fatal() => {
                warn!("Part {}/{}: {}; aborting", part, total, failure);
                return Err(match failure {
                    ApiFailure::InvalidCredentials(detail) => {
                        SummarizeError::InvalidCredentials { detail }
                    }
                    other => SummarizeError::ModelUnavailable {
                        model: model.to_string(),
                        detail: other.to_string(),
                    },
                });
            }
            Err(failure) => {
                warn!("Part {}/{}: {}; continuing", part, total, failure);
                let error = ChunkError::from_failure(part, &failure);
                if let Some(ref cb) = config.progress_callback {
                    cb.on_chunk_error(part, total, &error.to_string());
                }
                results.push(ChunkResult {
                    part,
                    input_chars: chunk.chars().count(),
                    markdown: String::new(),
                    input_tokens: 0,
                    output_tokens: 0,
                    duration_ms: start.elapsed().as_millis() as u64,
                    error: Some(error),
                });
            }
        }
    }

    info!(
        "Summarized parts {}..={} with {}",
        first_part,
        first_part + chunks.len().saturating_sub(1),
        model
    );
    Ok(results)
}
