//! CLI binary for evalsum.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `SummaryConfig` and prints the report.

use anyhow::{Context, Result};
use clap::Parser;
use evalsum::{
    extract_text, render_outcome, summarize, summarize_to_file, ExtractionMethod, ProgressCallback, ProviderKind,
    Report, Stage, SummaryConfig, SummaryProgressCallback, SynthesisOutcome,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: a spinner through extraction and model selection,
/// then a bar over the chunks with one log line per part.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Start of the chunk currently in flight.
    chunk_started: Mutex<Option<Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            chunk_started: Mutex::new(None),
            errors: AtomicUsize::new(0),
        })
    }

    /// Switch to the full progress-bar style once the chunk count is known.
    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} parts  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Summarizing");
    }

    fn chunk_elapsed(&self) -> f64 {
        self.chunk_started
            .lock()
            .ok()
            .and_then(|mut g| g.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl SummaryProgressCallback for CliProgressCallback {
    fn on_stage(&self, stage: Stage) {
        match stage {
            Stage::Extracting | Stage::OcrFallback | Stage::Chunking | Stage::SelectingModel => {
                self.bar.set_message(format!("{stage}…"));
            }
            Stage::Synthesizing => {
                self.bar.set_prefix("Merging");
                self.bar.set_message("combining part analyses…");
            }
            _ => {}
        }
    }

    fn on_text_extracted(&self, method: ExtractionMethod, chars: usize) {
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Extracted {chars} characters via {method}"))
        ));
    }

    fn on_model_selected(&self, model: &str, attempts: usize) {
        let note = if attempts > 1 {
            dim(&format!("  (after {attempts} attempts)"))
        } else {
            String::new()
        };
        self.bar
            .println(format!("{} Using model {}{}", cyan("◆"), bold(model), note));
    }

    fn on_chunk_start(&self, part: usize, total: usize) {
        if self.bar.length() != Some(total as u64) {
            self.activate_bar(total);
        }
        if let Ok(mut g) = self.chunk_started.lock() {
            *g = Some(Instant::now());
        }
        self.bar.set_message(format!("part {part}"));
    }

    fn on_chunk_complete(&self, part: usize, total: usize, output_len: usize) {
        let secs = self.chunk_elapsed();
        self.bar.println(format!(
            "  {} Part {:>3}/{:<3}  {:<8}  {}",
            green("✓"),
            part,
            total,
            dim(&format!("{output_len:>5} chars")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_chunk_error(&self, part: usize, total: usize, error: &str) {
        let secs = self.chunk_elapsed();
        self.errors.fetch_add(1, Ordering::SeqCst);

        let msg: String = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Part {:>3}/{:<3}  {}  {}",
            red("✗"),
            part,
            total,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_complete(&self, success: bool) {
        self.bar.finish_and_clear();
        let failed = self.errors.load(Ordering::SeqCst);
        if !success {
            eprintln!("{} Summary failed", red("✘"));
        } else if failed == 0 {
            eprintln!("{} Summary complete", green("✔"));
        } else {
            eprintln!(
                "{} Summary complete  ({} part(s) failed)",
                cyan("⚠"),
                red(&failed.to_string())
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Summarise to stdout
  evalsum evaluations.pdf --api-key sk-ant-...

  # Write the report to a file
  evalsum evaluations.pdf -o summary.md

  # Pin one model instead of the default fallback list
  evalsum --model claude-3-haiku-20240307 evaluations.pdf

  # Use OpenAI
  evalsum --provider openai --model gpt-4o-mini evaluations.pdf

  # Scanned document in French
  evalsum --ocr-language fra scanned.pdf

  # Show the extracted text only (no API key needed)
  evalsum --extract-only evaluations.pdf

  # Full report with per-part results and stats as JSON
  evalsum --json evaluations.pdf > report.json

DEFAULT MODELS (tried in order until one exists for your key):
  anthropic   claude-3-5-sonnet-20241022, claude-3-5-sonnet-20240620,
              claude-3-opus-20240229, claude-3-haiku-20240307
  openai      gpt-4.1-mini, gpt-4o-mini, gpt-4o

ENVIRONMENT VARIABLES:
  EVALSUM_API_KEY         Provider API key
  EVALSUM_PROVIDER        anthropic (default) or openai
  EVALSUM_MODELS          Comma-separated candidate models
  PDFIUM_LIB_PATH         Path to libpdfium (default: system library search)
  RUST_LOG                Override log filter

SETUP:
  1. Install pdfium (or set PDFIUM_LIB_PATH) and, for scanned PDFs, tesseract.
  2. export EVALSUM_API_KEY=sk-ant-...
  3. evalsum evaluations.pdf -o summary.md
"#;

/// Summarise course-evaluation PDFs with a hosted LLM.
#[derive(Parser, Debug)]
#[command(
    name = "evalsum",
    version,
    about = "Summarise course-evaluation PDFs into constructive suggestions and supportive comments",
    long_about = "Extract the text of a course-evaluation PDF (embedded text, or OCR for scanned \
documents), send it to a hosted LLM in chunks, and print one Markdown report with constructive \
suggestions, supportive student comments, and a summary.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Provider API key.
    #[arg(long, env = "EVALSUM_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Write the report to this file instead of stdout.
    #[arg(short, long, env = "EVALSUM_OUTPUT")]
    output: Option<PathBuf>,

    /// Provider family: anthropic or openai.
    #[arg(long, env = "EVALSUM_PROVIDER", default_value = "anthropic")]
    provider: String,

    /// Provider endpoint override, e.g. a proxy or compatible gateway.
    #[arg(long, env = "EVALSUM_BASE_URL")]
    base_url: Option<String>,

    /// Candidate model, tried in the order given. Repeatable.
    #[arg(long = "model", env = "EVALSUM_MODELS", value_delimiter = ',')]
    models: Vec<String>,

    /// Maximum characters per chunk.
    #[arg(long, env = "EVALSUM_CHUNK_CHARS", default_value_t = 12_000)]
    chunk_chars: usize,

    /// Text-layer output shorter than this triggers OCR.
    #[arg(long, env = "EVALSUM_MIN_TEXT_CHARS", default_value_t = 100)]
    min_text_chars: usize,

    /// Max LLM output tokens per part.
    #[arg(long, env = "EVALSUM_MAX_TOKENS", default_value_t = 2048)]
    max_tokens: usize,

    /// Max LLM output tokens for the merged report.
    #[arg(long, env = "EVALSUM_SYNTHESIS_MAX_TOKENS", default_value_t = 4096)]
    synthesis_max_tokens: usize,

    /// LLM temperature (0.0–1.0).
    #[arg(long, env = "EVALSUM_TEMPERATURE", default_value_t = 0.3)]
    temperature: f32,

    /// Never run OCR, even on scanned documents.
    #[arg(long, env = "EVALSUM_NO_OCR")]
    no_ocr: bool,

    /// Tesseract language code(s), e.g. eng or eng+fra.
    #[arg(long, env = "EVALSUM_OCR_LANGUAGE", default_value = "eng")]
    ocr_language: String,

    /// Longest edge in pixels of page images handed to OCR.
    #[arg(long, env = "EVALSUM_OCR_PIXELS", default_value_t = 2000)]
    ocr_pixels: u32,

    /// Path to a text file containing a custom per-part instruction.
    #[arg(long, env = "EVALSUM_PROMPT")]
    prompt: Option<PathBuf>,

    /// Path to a text file containing a custom merge instruction.
    #[arg(long, env = "EVALSUM_SYNTHESIS_PROMPT")]
    synthesis_prompt: Option<PathBuf>,

    /// Output the full report (parts, stats) as JSON instead of Markdown.
    #[arg(long, env = "EVALSUM_JSON", conflicts_with = "output")]
    json: bool,

    /// Print the extracted text only; no model calls.
    #[arg(long)]
    extract_only: bool,

    /// Disable progress bar.
    #[arg(long, env = "EVALSUM_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "EVALSUM_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "EVALSUM_QUIET")]
    quiet: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "EVALSUM_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.extract_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn SummaryProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb).await?;

    // ── Ensure PDFium engine is available ────────────────────────────────
    // First run downloads the library into the per-user cache; later runs
    // only check the path.
    if !pdfium_auto::is_pdfium_cached() {
        if cli.quiet {
            tokio::task::block_in_place(|| pdfium_auto::ensure_pdfium_library(None))
                .context("Failed to download PDFium engine")?;
        } else {
            let dl_bar = ProgressBar::new(0);
            dl_bar.set_style(
                ProgressStyle::with_template(
                    "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {bytes}/{total_bytes}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .tick_strings(TICKS),
            );
            dl_bar.set_prefix("PDF engine");
            dl_bar.enable_steady_tick(Duration::from_millis(80));

            let bar = dl_bar.clone();
            tokio::task::block_in_place(|| {
                pdfium_auto::ensure_pdfium_library(Some(&|downloaded, total| {
                    if let Some(t) = total {
                        bar.set_length(t);
                    }
                    bar.set_position(downloaded);
                }))
            })
            .context("Failed to download PDFium engine")?;
            dl_bar.finish_and_clear();
        }
    }

    // ── Extract-only mode ────────────────────────────────────────────────
    if cli.extract_only {
        let extracted = extract_text(&cli.input, &config)
            .await
            .context("Failed to extract text")?;
        if !cli.quiet {
            eprintln!(
                "{} words via {}",
                extracted.word_count(),
                extracted.method
            );
        }
        println!("{}", extracted.text);
        return Ok(());
    }

    // ── Run summary ──────────────────────────────────────────────────────
    let api_key = cli.api_key.as_deref();
    let outcome = match cli.output {
        Some(ref output_path) => summarize_to_file(&cli.input, api_key, output_path, &config).await,
        None => summarize(&cli.input, api_key, &config).await,
    };
    let report = match outcome {
        Ok(report) => report,
        Err(e) => anyhow::bail!(render_outcome(&Err(e))),
    };

    if let Some(ref output_path) = cli.output {
        if !cli.quiet {
            eprintln!(
                "{}  {} part(s)  {}ms  →  {}",
                if report.stats.failed_chunks == 0 {
                    green("✔")
                } else {
                    cyan("⚠")
                },
                report.stats.chunk_count,
                report.stats.total_duration_ms,
                bold(&output_path.display().to_string()),
            );
        }
    } else if cli.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{json}");
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(report.markdown.as_bytes())
            .context("Failed to write to stdout")?;
        if !report.markdown.ends_with('\n') {
            handle
                .write_all(b"\n")
                .context("Failed to write to stdout")?;
        }
    }

    if !cli.quiet && !cli.json {
        print_footer(&report, config.provider);
    }

    Ok(())
}

fn print_footer(report: &Report, provider: ProviderKind) {
    if let SynthesisOutcome::Degraded(ref reason) = report.synthesis {
        eprintln!("   {} parts were not merged: {}", cyan("⚠"), reason);
    }
    eprintln!(
        "   {} tokens in  /  {} tokens out  ·  {}",
        dim(&report.stats.total_input_tokens.to_string()),
        dim(&report.stats.total_output_tokens.to_string()),
        dim(&format!("{}/{}", provider.as_str(), report.model)),
    );
}

/// Map CLI args to `SummaryConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<SummaryConfig> {
    let provider: ProviderKind = cli.provider.parse().context("Invalid --provider")?;

    let mut builder = SummaryConfig::builder()
        .provider(provider)
        .chunk_chars(cli.chunk_chars)
        .min_text_chars(cli.min_text_chars)
        .max_tokens(cli.max_tokens)
        .synthesis_max_tokens(cli.synthesis_max_tokens)
        .temperature(cli.temperature)
        .ocr_enabled(!cli.no_ocr)
        .ocr_language(cli.ocr_language.clone())
        .ocr_max_pixels(cli.ocr_pixels)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref url) = cli.base_url {
        builder = builder.base_url(url.clone());
    }
    if !cli.models.is_empty() {
        builder = builder.candidate_models(cli.models.iter().map(|m| m.trim().to_string()));
    }
    if let Some(ref path) = cli.prompt {
        builder = builder.instruction_prompt(read_prompt(path).await?);
    }
    if let Some(ref path) = cli.synthesis_prompt {
        builder = builder.synthesis_prompt(read_prompt(path).await?);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

async fn read_prompt(path: &PathBuf) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read prompt from {:?}", path))
}
