//! Handler for the ask tool.

use std::sync::Arc;

use crate::{mcp::format::AnswerOutput, pipeline::PipelineApi};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, JsonObject},
};
use serde::Deserialize;
use serde_json::json;

use super::{parse_arguments, pipeline_error};

/// Request payload accepted by the `ask` tool.
#[derive(Debug, Deserialize)]
pub(crate) struct AskToolRequest {
    /// Summary grounding the answer.
    pub(crate) document_content: String,
    /// Question about the document.
    pub(crate) user_question: String,
}

/// Handle the `ask` tool by answering from the supplied summary alone.
pub(crate) async fn handle_ask(
    pipeline: &Arc<dyn PipelineApi>,
    arguments: Option<JsonObject>,
) -> Result<CallToolResult, McpError> {
    let args: AskToolRequest = parse_arguments(arguments)?;
    let answer = pipeline
        .ask(&args.document_content, &args.user_question)
        .await
        .map_err(pipeline_error)?;

    Ok(CallToolResult::structured(json!(AnswerOutput { answer })))
}
