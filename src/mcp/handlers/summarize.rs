//! Handler for the summarize tool.

use std::sync::Arc;

use crate::{
    mcp::format::SummaryOutput,
    pipeline::{PipelineApi, truncate::exceeds},
};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, JsonObject},
};
use serde::Deserialize;
use serde_json::json;

use super::{parse_arguments, pipeline_error};

/// Request payload accepted by the `summarize` tool.
#[derive(Debug, Deserialize)]
pub(crate) struct SummarizeToolRequest {
    /// Plain document text.
    pub(crate) document_content: String,
}

/// Handle the `summarize` tool by truncating the text to budget and summarizing it.
pub(crate) async fn handle_summarize(
    pipeline: &Arc<dyn PipelineApi>,
    arguments: Option<JsonObject>,
) -> Result<CallToolResult, McpError> {
    let args: SummarizeToolRequest = parse_arguments(arguments)?;
    let truncated = exceeds(
        &args.document_content,
        pipeline.settings().max_summary_chars,
    );

    let context = pipeline
        .summarize(&args.document_content)
        .await
        .map_err(pipeline_error)?;

    let output = SummaryOutput {
        summary: context.summary,
        truncated,
    };
    Ok(CallToolResult::structured(json!(output)))
}
