//! Tool handlers for the MCP server.

use crate::pipeline::{ErrorKind, PipelineError};
use rmcp::{ErrorData as McpError, model::JsonObject};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

pub mod ask;
pub mod metrics;
pub mod summarize;

/// Parse structured arguments supplied to a tool invocation.
pub(crate) fn parse_arguments<T: DeserializeOwned>(
    arguments: Option<JsonObject>,
) -> Result<T, McpError> {
    let value = arguments
        .map(Value::Object)
        .unwrap_or_else(|| Value::Object(JsonObject::new()));
    serde_json::from_value(value)
        .map_err(|err| McpError::invalid_params(format!("Invalid arguments: {err}"), None))
}

/// Map a pipeline failure onto an MCP error.
///
/// Input problems become `invalid_params`; model failures become `internal_error` and carry
/// the backend diagnostics when there are any.
pub(crate) fn pipeline_error(error: PipelineError) -> McpError {
    let kind = error.kind();
    let mut data = json!({ "kind": kind.as_str() });
    if let Some(diagnostics) = error.diagnostics() {
        data["diagnostics"] = serde_json::to_value(diagnostics).unwrap_or(Value::Null);
    }
    match kind {
        ErrorKind::ModelRefusal | ErrorKind::TransportError => {
            McpError::internal_error(error.to_string(), Some(data))
        }
        _ => McpError::invalid_params(error.user_message(), Some(data)),
    }
}
