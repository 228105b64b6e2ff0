//! Single-shot document summarization.

use super::{
    prompts::{SUMMARY_FIELD, summarize_prompt},
    require_output,
    types::{DocumentContext, PipelineError},
};
use crate::llm::{LlmClient, StructuredRequest};
use std::sync::Arc;

const OPERATION: &str = "summarize";

/// Reduces document text to the summary that grounds later answers.
///
/// The whole input goes to the model in one call; bounding its size is the caller's job.
#[derive(Clone)]
pub struct Summarizer {
    client: Arc<dyn LlmClient>,
    model: String,
}

impl Summarizer {
    /// Create a summarizer issuing calls to `model` through `client`.
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    /// Summarize `text`.
    ///
    /// Blank input fails with [`PipelineError::EmptyInput`] without contacting the model.
    pub async fn summarize(&self, text: &str) -> Result<DocumentContext, PipelineError> {
        if text.trim().is_empty() {
            return Err(PipelineError::EmptyInput);
        }

        let generation = self
            .client
            .generate(StructuredRequest {
                model: self.model.clone(),
                prompt: summarize_prompt(text),
                output_field: SUMMARY_FIELD,
            })
            .await
            .map_err(|source| PipelineError::Transport {
                operation: OPERATION,
                source,
            })?;

        let summary = require_output(OPERATION, generation)?;
        Ok(DocumentContext { summary })
    }
}
