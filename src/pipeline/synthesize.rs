//! Synthesis: merge several part analyses into one report.
//!
//! Only runs when more than one chunk produced output. A failed merge never
//! fails the run; [`parts_report`] lays the parts out one after another
//! under "Analysis Part N" headings with a note naming the failure.

use crate::config::SummaryConfig;
use crate::error::ApiFailure;
use crate::output::ChunkResult;
use crate::pipeline::llm::{Completion, CompletionClient, CompletionRequest};
use crate::prompts::{self, PART_DELIMITER};
use tracing::{info, warn};

/// Build the merge request from the successful part outputs.
pub fn synthesis_request(model: &str, outputs: &[&str], config: &SummaryConfig) -> CompletionRequest {
    CompletionRequest {
        model: model.to_string(),
        prompt: prompts::with_payload(config.effective_synthesis(), &outputs.join(PART_DELIMITER)),
        max_tokens: config.synthesis_max_tokens,
        temperature: config.temperature,
    }
}

/// Ask the model to merge the successful outputs in `chunks`.
pub async fn synthesize(
    client: &dyn CompletionClient,
    model: &str,
    chunks: &[ChunkResult],
    config: &SummaryConfig,
) -> Result<Completion, ApiFailure> {
    let outputs: Vec<&str> = chunks
        .iter()
        .filter(|c| c.is_success())
        .map(|c| c.markdown.as_str())
        .collect();
    info!("Synthesizing {} part analyses", outputs.len());

    let request = synthesis_request(model, &outputs, config);
    client.complete(&request).await.inspect_err(|e| {
        warn!("Synthesis failed: {}", e);
    })
}

/// The merged report, followed by a note for every part that was never
/// analysed and so is missing from the merge.
pub fn merged_report(merged: &str, chunks: &[ChunkResult]) -> String {
    let mut out = merged.trim_end().to_string();
    for chunk in chunks.iter().filter(|c| !c.is_success()) {
        out.push_str("\n\n");
        out.push_str(&chunk.slot_text());
    }
    out
}

/// Un-merged fallback: every slot in order, labelled by part number.
///
/// `failure` is appended as a warning when the merge call was attempted and
/// failed.
pub fn parts_report(chunks: &[ChunkResult], failure: Option<&ApiFailure>) -> String {
    let mut out = String::new();
    for (i, chunk) in chunks.iter().enumerate() {
        if i > 0 {
            out.push_str("\n\n");
        }
        out.push_str(&format!("## Analysis Part {}\n\n", chunk.part));
        out.push_str(chunk.slot_text().trim_end());
    }
    if let Some(f) = failure {
        out.push_str(&format!(
            "\n\n> ⚠️ The parts above could not be merged into one report ({}: {}). \
             Themes may repeat across parts.",
            f.kind(),
            f
        ));
    }
    out
}
