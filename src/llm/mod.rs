//! Model backend abstraction for single-shot structured generation.
//!
//! Every call asks the backend for a JSON object with exactly one string field (for example
//! `{"summary": "..."}`). Backends report two very different outcomes:
//!
//! - the call completed, and the field is either present ([`Generation::output`] is `Some`) or
//!   missing/empty/malformed (`None`, with [`RefusalDiagnostics`] describing why);
//! - the call never completed ([`LlmError`]): unreachable host, non-2xx status, broken envelope.
//!
//! Clients never retry; that policy belongs to whoever calls the pipeline.

mod ollama;
mod openai;

pub use ollama::OllamaClient;
pub use openai::OpenAiClient;

use crate::config::{Config, LlmProvider};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Value, json};
use std::{sync::Arc, time::Duration};
use thiserror::Error;

/// Transport-level failures reaching the model backend.
#[derive(Debug, Clone, Error)]
pub enum LlmError {
    /// Backend could not be reached (connection refused, DNS, timeout).
    #[error("failed to reach {provider} at {endpoint}: {message}")]
    Unreachable {
        /// Provider label.
        provider: &'static str,
        /// Endpoint that was called.
        endpoint: String,
        /// Underlying client error.
        message: String,
    },
    /// Backend answered with a non-success status (5xx, quota, unknown model, ...).
    #[error("{provider} returned {status}: {body}")]
    Status {
        /// Provider label.
        provider: &'static str,
        /// HTTP status code.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },
    /// Response envelope could not be decoded.
    #[error("malformed {provider} response: {message}")]
    InvalidEnvelope {
        /// Provider label.
        provider: &'static str,
        /// Decoder diagnostic.
        message: String,
    },
    /// HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

/// Request for a single structured generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredRequest {
    /// Model identifier understood by the backend.
    pub model: String,
    /// Fully rendered prompt.
    pub prompt: String,
    /// Name of the single string field the model must return.
    pub output_field: &'static str,
}

/// Backend diagnostics captured when a call completed without usable output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RefusalDiagnostics {
    /// Provider label.
    pub provider: &'static str,
    /// Finish/done reason reported by the backend, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
    /// HTTP status line of the completed call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Refusal text or a snippet of the unusable output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Outcome of a completed model call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    /// Trimmed value of the requested field; `None` when absent, empty, or unparseable.
    pub output: Option<String>,
    /// Diagnostics reported alongside the output.
    pub diagnostics: RefusalDiagnostics,
}

/// Interface implemented by model backends.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Issue one structured generation call.
    async fn generate(&self, request: StructuredRequest) -> Result<Generation, LlmError>;
}

/// Build the client selected by configuration.
pub fn build_client(config: &Config) -> Result<Arc<dyn LlmClient>, LlmError> {
    let timeout = config.llm_timeout_secs.map(Duration::from_secs);
    let client: Arc<dyn LlmClient> = match config.llm_provider {
        LlmProvider::Ollama => Arc::new(OllamaClient::new(config.llm_base_url.clone(), timeout)?),
        LlmProvider::OpenAI => Arc::new(OpenAiClient::new(
            config.llm_base_url.clone(),
            config.llm_api_key.clone(),
            timeout,
        )?),
    };
    Ok(client)
}

pub(crate) fn http_client(
    user_agent: &str,
    timeout: Option<Duration>,
) -> Result<reqwest::Client, LlmError> {
    let mut builder = reqwest::Client::builder().user_agent(user_agent);
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|error| LlmError::Client(error.to_string()))
}

/// JSON schema for an object with a single required string field.
pub(crate) fn single_field_schema(field: &str) -> Value {
    json!({
        "type": "object",
        "properties": { field: { "type": "string" } },
        "required": [field],
        "additionalProperties": false
    })
}

/// Pull `field` out of a JSON document produced by the model.
///
/// Tolerates a Markdown code fence around the object, which some models emit even in JSON mode.
pub(crate) fn parse_structured_field(raw: &str, field: &str) -> Option<String> {
    let trimmed = raw.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed);
    let value: Value = serde_json::from_str(unfenced.trim()).ok()?;
    value
        .get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

/// Shorten unusable model output before it is attached to diagnostics.
pub(crate) fn snippet(text: &str) -> Option<String> {
    const MAX_SNIPPET_CHARS: usize = 200;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.chars().count() <= MAX_SNIPPET_CHARS {
        return Some(trimmed.to_string());
    }
    let mut shortened: String = trimmed.chars().take(MAX_SNIPPET_CHARS - 1).collect();
    shortened.push('…');
    Some(shortened)
}
