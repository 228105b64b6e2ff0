//! Question answering grounded in the document summary.

use super::{
    prompts::{ANSWER_FIELD, ask_prompt},
    require_output,
    types::PipelineError,
};
use crate::llm::{LlmClient, StructuredRequest};
use std::sync::Arc;

const OPERATION: &str = "ask";

/// Answers one question from the document summary alone.
///
/// Calls are stateless: earlier turns are not sent to the model.
#[derive(Clone)]
pub struct Answerer {
    client: Arc<dyn LlmClient>,
    model: String,
}

impl Answerer {
    /// Create an answerer issuing calls to `model` through `client`.
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    /// Answer `question` using only `context`.
    ///
    /// A blank context fails with [`PipelineError::EmptyContext`] and a blank question with
    /// [`PipelineError::EmptyQuestion`]; neither contacts the model.
    pub async fn ask(&self, context: &str, question: &str) -> Result<String, PipelineError> {
        if context.trim().is_empty() {
            return Err(PipelineError::EmptyContext);
        }
        if question.trim().is_empty() {
            return Err(PipelineError::EmptyQuestion);
        }

        let generation = self
            .client
            .generate(StructuredRequest {
                model: self.model.clone(),
                prompt: ask_prompt(context, question),
                output_field: ANSWER_FIELD,
            })
            .await
            .map_err(|source| PipelineError::Transport {
                operation: OPERATION,
                source,
            })?;

        require_output(OPERATION, generation)
    }
}
