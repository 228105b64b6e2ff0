//! MCP server bootstrap and request dispatch.

use std::{borrow::Cow, sync::Arc};

use crate::{
    config::get_config,
    mcp::{
        format::{
            AnswerOutput, SettingsSnapshot, SummaryOutput, json_resource_contents,
            serialize_json, usage_payload,
        },
        handlers::{ask::handle_ask, metrics::handle_metrics, summarize::handle_summarize},
        registry, schemas,
    },
    pipeline::PipelineApi,
};
use rmcp::{
    ErrorData as McpError,
    handler::server::ServerHandler,
    model::{
        AnnotateAble, CallToolRequestParam, CallToolResult, ListResourcesResult,
        ListToolsResult, RawResource, ReadResourceRequestParam, ReadResourceResult, Resource,
        ServerCapabilities, ServerInfo, Tool, ToolAnnotations,
    },
};

const SETTINGS_URI: &str = "mcp://settings";
const USAGE_URI: &str = "mcp://usage";

/// MCP server exposing document summarization and grounded question answering.
#[derive(Clone)]
pub struct DocNavMcpServer {
    pipeline: Arc<dyn PipelineApi>,
    registry: Arc<registry::Registry>,
}

impl DocNavMcpServer {
    /// Create a new MCP server backed by the supplied pipeline.
    pub fn new(pipeline: Arc<dyn PipelineApi>) -> Self {
        let mut registry = registry::Registry::default();
        registry.register_resource(SETTINGS_URI, resource_settings);
        registry.register_resource(USAGE_URI, resource_usage);

        registry.register_tool("summarize", tool_summarize);
        registry.register_tool("ask", tool_ask);
        registry.register_tool("metrics", tool_metrics);

        Self {
            pipeline,
            registry: Arc::new(registry),
        }
    }

    fn describe_tools(&self) -> Vec<Tool> {
        let max_summary_chars = self.pipeline.settings().max_summary_chars;
        vec![
            Tool {
                name: Cow::Borrowed("summarize"),
                title: Some("Summarize Document".to_string()),
                description: Some(Cow::Borrowed(
                    "Condense plain document text into the summary that grounds later questions; long input is truncated first.",
                )),
                input_schema: Arc::new(schemas::summarize_input_schema(max_summary_chars)),
                output_schema: Some(Arc::new(schemas::output_schema::<SummaryOutput>())),
                annotations: Some(
                    ToolAnnotations::with_title("Summarize Document")
                        .read_only(true)
                        .idempotent(false)
                        .open_world(true),
                ),
                icons: None,
            },
            Tool {
                name: Cow::Borrowed("ask"),
                title: Some("Ask About Document".to_string()),
                description: Some(Cow::Borrowed(
                    "Answer a question using only a document summary; says so when the summary lacks the answer.",
                )),
                input_schema: Arc::new(schemas::ask_input_schema()),
                output_schema: Some(Arc::new(schemas::output_schema::<AnswerOutput>())),
                annotations: Some(
                    ToolAnnotations::with_title("Ask About Document")
                        .read_only(true)
                        .idempotent(false)
                        .open_world(true),
                ),
                icons: None,
            },
            Tool {
                name: Cow::Borrowed("metrics"),
                title: Some("Metrics Snapshot".to_string()),
                description: Some(Cow::Borrowed(
                    "Check extraction, summary, answer, and failure counters at a glance.",
                )),
                input_schema: Arc::new(schemas::empty_object_schema()),
                output_schema: None,
                annotations: Some(
                    ToolAnnotations::with_title("Metrics Snapshot")
                        .read_only(true)
                        .idempotent(true)
                        .open_world(false),
                ),
                icons: None,
            },
        ]
    }

    fn describe_resources(&self) -> Vec<Resource> {
        let mut settings = RawResource::new(SETTINGS_URI, "settings");
        settings.description =
            Some("Effective truncation budget and models used for summaries and answers".into());

        let mut usage = RawResource::new(USAGE_URI, "usage");
        usage.description = Some(
            "Recommended tool flow: summarize once, then ask with the returned summary.".into(),
        );

        vec![settings.no_annotation(), usage.no_annotation()]
    }
}

fn resource_settings(
    server: &DocNavMcpServer,
    _request: ReadResourceRequestParam,
) -> registry::ResourceFuture {
    let pipeline = server.pipeline.clone();
    Box::pin(async move {
        let provider = get_config().map(|config| config.llm_provider.label());
        let payload = SettingsSnapshot::new(provider, pipeline.settings());
        Ok(ReadResourceResult {
            contents: vec![json_resource_contents(
                SETTINGS_URI,
                serialize_json(&payload, SETTINGS_URI),
            )],
        })
    })
}

fn resource_usage(
    _server: &DocNavMcpServer,
    _request: ReadResourceRequestParam,
) -> registry::ResourceFuture {
    Box::pin(async move {
        Ok(ReadResourceResult {
            contents: vec![json_resource_contents(
                USAGE_URI,
                serialize_json(&usage_payload(), USAGE_URI),
            )],
        })
    })
}

fn tool_summarize(
    server: &DocNavMcpServer,
    request: CallToolRequestParam,
) -> registry::ToolFuture {
    let pipeline = server.pipeline.clone();
    Box::pin(async move { handle_summarize(&pipeline, request.arguments).await })
}

fn tool_ask(server: &DocNavMcpServer, request: CallToolRequestParam) -> registry::ToolFuture {
    let pipeline = server.pipeline.clone();
    Box::pin(async move { handle_ask(&pipeline, request.arguments).await })
}

fn tool_metrics(
    server: &DocNavMcpServer,
    _request: CallToolRequestParam,
) -> registry::ToolFuture {
    let pipeline = server.pipeline.clone();
    Box::pin(async move { handle_metrics(&pipeline).await })
}

impl ServerHandler for DocNavMcpServer {
    fn get_info(&self) -> ServerInfo {
        let mut implementation = rmcp::model::Implementation::from_build_env();
        implementation.name = "docnav".to_string();
        implementation.title = Some("Document Navigator MCP".to_string());
        implementation.version = env!("CARGO_PKG_VERSION").to_string();

        ServerInfo {
            capabilities: ServerCapabilities::builder()
                .enable_resources()
                .enable_tools()
                .build(),
            server_info: implementation,
            instructions: Some(
                "Use this server to summarize document text and answer questions grounded only in that summary. Call summarize once, keep the summary, and pass it to ask for every question.".into(),
            ),
            ..ServerInfo::default()
        }
    }

    fn list_resources(
        &self,
        _request: Option<rmcp::model::PaginatedRequestParam>,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListResourcesResult, McpError>> + Send + '_ {
        let resources = self.describe_resources();
        std::future::ready(Ok(ListResourcesResult::with_all_items(resources)))
    }

    fn list_tools(
        &self,
        _request: Option<rmcp::model::PaginatedRequestParam>,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        let tools = self.describe_tools();
        std::future::ready(Ok(ListToolsResult::with_all_items(tools)))
    }

    fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ReadResourceResult, McpError>> + Send + '_ {
        async move {
            let uri = request.uri.clone();
            if let Some(handler) = self.registry.resources.get(uri.as_str()) {
                return handler(self, request).await;
            }

            Err(McpError::invalid_params(
                format!("Unknown resource URI: {uri}"),
                None,
            ))
        }
    }

    #[allow(clippy::manual_async_fn)]
    fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        async move {
            if let Some(handler) = self.registry.tools.get(request.name.as_ref()) {
                return handler(self, request).await;
            }

            Err(McpError::invalid_params(
                format!("Unknown tool: {}", request.name),
                None,
            ))
        }
    }
}
