//! Configuration types for course-evaluation summarisation.
//!
//! All behaviour is controlled through [`SummaryConfig`], built via its
//! [`SummaryConfigBuilder`]. Nothing here is process-global: each run reads
//! its own config and owns its own state.

use crate::error::SummarizeError;
use crate::pipeline::extract::TextLayer;
use crate::pipeline::llm::CompletionClient;
use crate::pipeline::ocr::OcrEngine;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Candidate models tried in order until one exists for the supplied key.
pub const DEFAULT_ANTHROPIC_MODELS: &[&str] = &[
    "claude-3-5-sonnet-20241022",
    "claude-3-5-sonnet-20240620",
    "claude-3-opus-20240229",
    "claude-3-haiku-20240307",
];

/// Candidate list used with [`ProviderKind::OpenAi`].
pub const DEFAULT_OPENAI_MODELS: &[&str] = &["gpt-4.1-mini", "gpt-4o-mini", "gpt-4o"];

/// Configuration for a summarisation run.
///
/// # Example
/// ```rust
/// use evalsum::SummaryConfig;
///
/// let config = SummaryConfig::builder()
///     .chunk_chars(8_000)
///     .candidate_models(["claude-3-haiku-20240307"])
///     .temperature(0.2)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct SummaryConfig {
    /// Hosted provider family. Default: Anthropic.
    pub provider: ProviderKind,

    /// Ordered model identifiers for the selector. Empty means the
    /// provider's default list.
    pub candidate_models: Vec<String>,

    /// Pre-constructed completion client. Takes precedence over `provider`.
    pub client: Option<Arc<dyn CompletionClient>>,

    /// Provider endpoint override (proxies, compatible gateways). None uses
    /// the provider's public API.
    pub base_url: Option<String>,

    /// Maximum characters per chunk. Default: 12 000.
    ///
    /// Sized so one chunk plus the instruction prompt stays far below the
    /// context window of every candidate model.
    pub chunk_chars: usize,

    /// Text-layer output shorter than this (trimmed, in characters) is
    /// treated as a scanned document and triggers OCR. Default: 100.
    pub min_text_chars: usize,

    /// Maximum tokens per chunk analysis. Default: 2048.
    pub max_tokens: usize,

    /// Maximum tokens for the merged report. Default: 4096.
    pub synthesis_max_tokens: usize,

    /// Sampling temperature. Default: 0.3.
    pub temperature: f32,

    /// Custom per-chunk instruction. If None, uses the built-in prompt.
    pub instruction_prompt: Option<String>,

    /// Custom synthesis instruction. If None, uses the built-in prompt.
    pub synthesis_prompt: Option<String>,

    /// Run OCR when the text layer is too short. Default: true.
    pub ocr_enabled: bool,

    /// Tesseract language code(s), e.g. "eng" or "eng+fra". Default: "eng".
    pub ocr_language: String,

    /// Longest edge, in pixels, of page renders handed to OCR. Default: 2000.
    pub ocr_max_pixels: u32,

    /// Text-layer override (tests, alternative PDF backends).
    pub text_layer: Option<Arc<dyn TextLayer>>,

    /// OCR engine override.
    pub ocr_engine: Option<Arc<dyn OcrEngine>>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Progress events receiver. Default: None.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            candidate_models: Vec::new(),
            client: None,
            base_url: None,
            chunk_chars: 12_000,
            min_text_chars: 100,
            max_tokens: 2048,
            synthesis_max_tokens: 4096,
            temperature: 0.3,
            instruction_prompt: None,
            synthesis_prompt: None,
            ocr_enabled: true,
            ocr_language: "eng".to_string(),
            ocr_max_pixels: 2000,
            text_layer: None,
            ocr_engine: None,
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for SummaryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SummaryConfig")
            .field("provider", &self.provider)
            .field("candidate_models", &self.candidate_models)
            .field("client", &self.client.as_ref().map(|_| "<dyn CompletionClient>"))
            .field("base_url", &self.base_url)
            .field("chunk_chars", &self.chunk_chars)
            .field("min_text_chars", &self.min_text_chars)
            .field("max_tokens", &self.max_tokens)
            .field("synthesis_max_tokens", &self.synthesis_max_tokens)
            .field("temperature", &self.temperature)
            .field("ocr_enabled", &self.ocr_enabled)
            .field("ocr_language", &self.ocr_language)
            .field("ocr_max_pixels", &self.ocr_max_pixels)
            .field("progress_callback", &self.progress_callback.as_ref().map(|_| "<callback>"))
            .finish()
    }
}

impl SummaryConfig {
    /// Create a new builder for `SummaryConfig`.
    pub fn builder() -> SummaryConfigBuilder {
        SummaryConfigBuilder {
            config: Self::default(),
        }
    }

    /// The candidate list the selector will walk.
    pub fn effective_models(&self) -> Vec<String> {
        if self.candidate_models.is_empty() {
            self.provider
                .default_models()
                .iter()
                .map(|m| m.to_string())
                .collect()
        } else {
            self.candidate_models.clone()
        }
    }

    pub fn effective_instruction(&self) -> &str {
        self.instruction_prompt
            .as_deref()
            .unwrap_or(crate::prompts::DEFAULT_INSTRUCTION_PROMPT)
    }

    pub fn effective_synthesis(&self) -> &str {
        self.synthesis_prompt
            .as_deref()
            .unwrap_or(crate::prompts::DEFAULT_SYNTHESIS_PROMPT)
    }
}

/// Builder for [`SummaryConfig`].
pub struct SummaryConfigBuilder {
    config: SummaryConfig,
}

impl fmt::Debug for SummaryConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SummaryConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl SummaryConfigBuilder {
    pub fn provider(mut self, provider: ProviderKind) -> Self {
        self.config.provider = provider;
        self
    }

    pub fn candidate_models<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.candidate_models = models.into_iter().map(Into::into).collect();
        self
    }

    pub fn client(mut self, client: Arc<dyn CompletionClient>) -> Self {
        self.config.client = Some(client);
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = Some(url.into());
        self
    }

    pub fn chunk_chars(mut self, n: usize) -> Self {
        self.config.chunk_chars = n.max(1);
        self
    }

    pub fn min_text_chars(mut self, n: usize) -> Self {
        self.config.min_text_chars = n;
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn synthesis_max_tokens(mut self, n: usize) -> Self {
        self.config.synthesis_max_tokens = n;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 1.0);
        self
    }

    pub fn instruction_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.instruction_prompt = Some(prompt.into());
        self
    }

    pub fn synthesis_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.synthesis_prompt = Some(prompt.into());
        self
    }

    pub fn ocr_enabled(mut self, v: bool) -> Self {
        self.config.ocr_enabled = v;
        self
    }

    pub fn ocr_language(mut self, lang: impl Into<String>) -> Self {
        self.config.ocr_language = lang.into();
        self
    }

    pub fn ocr_max_pixels(mut self, px: u32) -> Self {
        self.config.ocr_max_pixels = px.max(100);
        self
    }

    pub fn text_layer(mut self, layer: Arc<dyn TextLayer>) -> Self {
        self.config.text_layer = Some(layer);
        self
    }

    pub fn ocr_engine(mut self, engine: Arc<dyn OcrEngine>) -> Self {
        self.config.ocr_engine = Some(engine);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<SummaryConfig, SummarizeError> {
        let c = &self.config;
        if c.max_tokens == 0 || c.synthesis_max_tokens == 0 {
            return Err(SummarizeError::InvalidConfig(
                "max tokens must be ≥ 1".into(),
            ));
        }
        if c.candidate_models.iter().any(|m| m.trim().is_empty()) {
            return Err(SummarizeError::InvalidConfig(
                "candidate model identifiers must not be blank".into(),
            ));
        }
        if c.base_url.as_deref().is_some_and(|u| u.trim().is_empty()) {
            return Err(SummarizeError::InvalidConfig(
                "base URL must not be blank".into(),
            ));
        }
        if c.ocr_enabled && c.ocr_language.trim().is_empty() {
            return Err(SummarizeError::InvalidConfig(
                "OCR language must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Hosted provider family used by the default completion client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Anthropic,
    OpenAi,
}

impl ProviderKind {
    pub fn default_models(&self) -> &'static [&'static str] {
        match self {
            ProviderKind::Anthropic => DEFAULT_ANTHROPIC_MODELS,
            ProviderKind::OpenAi => DEFAULT_OPENAI_MODELS,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::OpenAi => "openai",
        }
    }
}

impl FromStr for ProviderKind {
    type Err = SummarizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anthropic" | "claude" => Ok(ProviderKind::Anthropic),
            "openai" => Ok(ProviderKind::OpenAi),
            other => Err(SummarizeError::InvalidConfig(format!(
                "unknown provider '{other}' (expected anthropic or openai)"
            ))),
        }
    }
}
