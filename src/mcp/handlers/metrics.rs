//! Handler for the metrics tool.

use std::sync::Arc;

use crate::pipeline::PipelineApi;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use serde_json::json;

/// Handle the `metrics` tool, returning the current pipeline counters.
pub(crate) async fn handle_metrics(
    pipeline: &Arc<dyn PipelineApi>,
) -> Result<CallToolResult, McpError> {
    let snapshot = pipeline.metrics_snapshot();
    Ok(CallToolResult::structured(json!({
        "documentsExtracted": snapshot.documents_extracted,
        "documentsTruncated": snapshot.documents_truncated,
        "summariesGenerated": snapshot.summaries_generated,
        "answersGenerated": snapshot.answers_generated,
        "modelRefusals": snapshot.model_refusals,
        "transportErrors": snapshot.transport_errors,
    })))
}
