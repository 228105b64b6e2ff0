//! Formatting helpers shared across MCP handlers and resources.

use crate::pipeline::{PipelineSettings, TRUNCATION_MARKER};
use rmcp::model::ResourceContents;
use schemars::JsonSchema;
use serde::Serialize;
use serde_json::{Value, json};

pub(crate) const APPLICATION_JSON: &str = "application/json";

/// Structured result of the `summarize` tool.
#[derive(Debug, Serialize, JsonSchema)]
pub(crate) struct SummaryOutput {
    /// Summary to pass back as `document_content` when asking questions.
    pub(crate) summary: String,
    /// Whether the input exceeded the character budget and was truncated.
    pub(crate) truncated: bool,
}

/// Structured result of the `ask` tool.
#[derive(Debug, Serialize, JsonSchema)]
pub(crate) struct AnswerOutput {
    /// Answer grounded in the supplied summary.
    pub(crate) answer: String,
}

/// Effective settings returned by the `settings` resource.
#[derive(Debug, Serialize, JsonSchema)]
pub(crate) struct SettingsSnapshot {
    /// Model backend label, when configuration was loaded from the environment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) provider: Option<String>,
    /// Model used by `summarize`.
    pub(crate) summary_model: String,
    /// Model used by `ask`.
    pub(crate) answer_model: String,
    /// Characters forwarded to summarization before truncation.
    pub(crate) max_summary_chars: usize,
    /// Text appended to truncated input.
    pub(crate) truncation_marker: String,
}

impl SettingsSnapshot {
    pub(crate) fn new(provider: Option<&str>, settings: PipelineSettings) -> Self {
        Self {
            provider: provider.map(str::to_string),
            summary_model: settings.summary_model,
            answer_model: settings.answer_model,
            max_summary_chars: settings.max_summary_chars,
            truncation_marker: TRUNCATION_MARKER.to_string(),
        }
    }
}

/// Recommended tool flow returned by the `usage` resource.
pub(crate) fn usage_payload() -> Value {
    json!({
        "title": "Document Navigator MCP Usage",
        "policy": [
            "Extract the document text first; this server accepts plain text only.",
            "Call `summarize` once per document and keep the returned summary.",
            "Pass that summary as `document_content` to `ask`; answers use nothing else.",
            "An answer saying the summary lacks the information is a valid result, not an error.",
            "Failures are not retried by the server.",
        ],
        "flows": [
            {
                "name": "Summarize & Ask",
                "steps": [
                    "summarize({ document_content })",
                    "ask({ document_content: summary, user_question })"
                ]
            }
        ]
    })
}

/// Serialize a value to JSON, falling back to compact formatting on error.
pub(crate) fn serialize_json<T: Serialize>(value: &T, context_uri: &str) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|error| {
        tracing::warn!(uri = context_uri, %error, "Failed to serialize JSON prettily");
        serde_json::to_string(value).unwrap_or_else(|_| "{}".into())
    })
}

/// Build JSON resource contents for MCP resource responses.
pub(crate) fn json_resource_contents(uri: &str, text: String) -> ResourceContents {
    ResourceContents::TextResourceContents {
        uri: uri.to_string(),
        mime_type: Some(APPLICATION_JSON.into()),
        text,
        meta: None,
    }
}
