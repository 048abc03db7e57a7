//! Model selection: walk the candidate list on the first chunk.
//!
//! The trial request *is* the first chunk's real request, so a successful
//! trial costs nothing extra: its response becomes part 1 of the report.
//! Only [`ApiFailure::ModelNotFound`] moves on to the next candidate. Any
//! other failure stops the walk and is returned as-is; retrying a rejected
//! key or a throttled account against another model only repeats the same
//! failure.

use crate::error::{ApiFailure, SummarizeError};
use crate::pipeline::llm::{Completion, CompletionClient, CompletionRequest};
use tracing::{debug, info, warn};

/// A pinned model and the first chunk's output.
#[derive(Debug, Clone)]
pub struct Selection {
    pub model: String,
    pub completion: Completion,
    /// Calls issued, including the successful one.
    pub attempts: usize,
}

/// Try each candidate in order with `template`, overriding only the model.
pub async fn select_model(
    client: &dyn CompletionClient,
    candidates: &[String],
    template: &CompletionRequest,
) -> Result<Selection, SummarizeError> {
    if candidates.is_empty() {
        return Err(SummarizeError::InvalidConfig(
            "no candidate models configured".into(),
        ));
    }

    let mut tried = Vec::with_capacity(candidates.len());

    for model in candidates {
        let request = CompletionRequest {
            model: model.clone(),
            ..template.clone()
        };
        tried.push(model.clone());
        debug!("Trying model {} ({}/{})", model, tried.len(), candidates.len());

        match client.complete(&request).await {
            Ok(completion) => {
                info!("Pinned model {} after {} attempt(s)", model, tried.len());
                return Ok(Selection {
                    model: model.clone(),
                    completion,
                    attempts: tried.len(),
                });
            }
            Err(ApiFailure::ModelNotFound(detail)) => {
                debug!("Model {} not available: {}", model, detail);
            }
            Err(ApiFailure::InvalidCredentials(detail)) => {
                warn!("Credentials rejected while trying {}", model);
                return Err(SummarizeError::InvalidCredentials { detail });
            }
            Err(failure) => {
                warn!("Model selection stopped at {}: {}", model, failure);
                return Err(SummarizeError::SelectionFailed {
                    model: model.clone(),
                    failure,
                });
            }
        }
    }

    Err(SummarizeError::NoCompatibleModel { tried })
}
