//! Document-to-answer pipeline: extraction, truncation, summarization, grounded answering.

mod answerer;
pub mod prompts;
mod service;
mod summarizer;
pub mod truncate;
pub mod types;

pub use answerer::Answerer;
pub use service::{DocumentPipeline, PipelineApi, PipelineSettings};
pub use summarizer::Summarizer;
pub use truncate::{TRUNCATION_MARKER, truncate};
pub use types::{
    DocumentContext, ErrorKind, ExtractedText, IngestOutcome, PipelineError, RawDocument,
};

use crate::llm::Generation;

/// Turn a completed generation into its output, or a refusal carrying the diagnostics.
fn require_output(operation: &'static str, generation: Generation) -> Result<String, PipelineError> {
    match generation.output {
        Some(output) => Ok(output),
        None => {
            tracing::warn!(
                operation,
                provider = generation.diagnostics.provider,
                finish_reason = ?generation.diagnostics.finish_reason,
                status = ?generation.diagnostics.status,
                detail = ?generation.diagnostics.detail,
                "Model returned no usable structured output"
            );
            Err(PipelineError::ModelRefusal {
                operation,
                diagnostics: generation.diagnostics,
            })
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted model backend for pipeline tests.

    use crate::llm::{Generation, LlmClient, LlmError, RefusalDiagnostics, StructuredRequest};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    enum Behavior {
        Reply { summary: String, answer: String },
        Refuse(String),
        Fail(u16),
    }

    /// Records every request and answers according to a fixed script.
    pub(crate) struct ScriptedClient {
        behavior: Behavior,
        calls: Mutex<Vec<StructuredRequest>>,
    }

    impl ScriptedClient {
        fn with(behavior: Behavior) -> Arc<Self> {
            Arc::new(Self {
                behavior,
                calls: Mutex::new(Vec::new()),
            })
        }

        /// Reply with `text` for every field.
        pub(crate) fn replying(text: &str) -> Arc<Self> {
            Self::replies(text, text)
        }

        /// Reply with `summary` to summarize calls and `answer` to ask calls.
        pub(crate) fn replies(summary: &str, answer: &str) -> Arc<Self> {
            Self::with(Behavior::Reply {
                summary: summary.to_string(),
                answer: answer.to_string(),
            })
        }

        /// Complete every call without structured output.
        pub(crate) fn refusing(finish_reason: &str) -> Arc<Self> {
            Self::with(Behavior::Refuse(finish_reason.to_string()))
        }

        /// Fail every call with an HTTP status.
        pub(crate) fn failing(status: u16) -> Arc<Self> {
            Self::with(Behavior::Fail(status))
        }

        pub(crate) fn calls(&self) -> Vec<StructuredRequest> {
            self.calls.lock().expect("calls lock").clone()
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.lock().expect("calls lock").len()
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedClient {
        async fn generate(&self, request: StructuredRequest) -> Result<Generation, LlmError> {
            let field = request.output_field;
            self.calls.lock().expect("calls lock").push(request);
            let diagnostics = RefusalDiagnostics {
                provider: "scripted",
                finish_reason: Some("stop".into()),
                status: Some("200 OK".into()),
                detail: None,
            };
            match &self.behavior {
                Behavior::Reply { summary, answer } => {
                    let output = if field == "summary" {
                        summary.clone()
                    } else {
                        answer.clone()
                    };
                    Ok(Generation {
                        output: Some(output),
                        diagnostics,
                    })
                }
                Behavior::Refuse(reason) => Ok(Generation {
                    output: None,
                    diagnostics: RefusalDiagnostics {
                        finish_reason: Some(reason.clone()),
                        ..diagnostics
                    },
                }),
                Behavior::Fail(status) => Err(LlmError::Status {
                    provider: "scripted",
                    status: *status,
                    body: "scripted failure".into(),
                }),
            }
        }
    }
}
