use std::sync::Arc;

use docnav::{config, logging, mcp::DocNavMcpServer, pipeline::DocumentPipeline};
use httpmock::{Method::POST, Mock, MockServer};
use rmcp::{
    handler::client::ClientHandler,
    model::{
        self, CallToolRequestParam, ClientInfo, PaginatedRequestParam, ReadResourceRequestParam,
        ResourceContents,
    },
    service::{RoleClient, RoleServer, RunningService, Service, serve_directly},
    transport::async_rw::AsyncRwTransport,
};
use serde_json::{Value, json};
use tokio::{io::split, sync::OnceCell};

static INIT: OnceCell<()> = OnceCell::const_new();
static MOCK_SERVER: OnceCell<&'static MockServer> = OnceCell::const_new();
static MOCK_HANDLES: OnceCell<Vec<Mock<'static>>> = OnceCell::const_new();

fn set_env(key: &str, value: &str) {
    // SAFETY: Tests run in a single process and establish deterministic configuration upfront.
    unsafe { std::env::set_var(key, value) }
}

fn arguments(value: Value) -> Option<model::JsonObject> {
    value.as_object().cloned()
}

#[derive(Clone, Default)]
struct DummyClientHandler;

impl ClientHandler for DummyClientHandler {
    fn get_info(&self) -> ClientInfo {
        ClientInfo::default()
    }
}

struct TestHarness {
    service: RunningService<RoleClient, DummyClientHandler>,
    server: RunningService<RoleServer, DocNavMcpServer>,
}

impl TestHarness {
    async fn new() -> Self {
        INIT.get_or_init(|| async {
            let mock_server = Box::leak(Box::new(MockServer::start_async().await));

            set_env("LLM_PROVIDER", "ollama");
            set_env("LLM_BASE_URL", &mock_server.base_url());
            set_env("LLM_MODEL", "llama3.1");
            set_env("SUMMARY_MAX_CHARS", "1000");

            MOCK_SERVER.set(mock_server).ok();
            let server = MOCK_SERVER.get().expect("mock server initialized");

            let mocks: Vec<Mock<'static>> = vec![
                server
                    .mock_async(|when, then| {
                        when.method(POST)
                            .path("/api/generate")
                            .body_contains(r#""required":["summary"]"#);
                        then.status(200).json_body(json!({
                            "model": "llama3.1",
                            "response": "{\"summary\": \"A memo about the harbour project.\"}",
                            "done": true,
                            "done_reason": "stop"
                        }));
                    })
                    .await,
                server
                    .mock_async(|when, then| {
                        when.method(POST)
                            .path("/api/generate")
                            .body_contains(r#""required":["answer"]"#);
                        then.status(200).json_body(json!({
                            "model": "llama3.1",
                            "response": "{\"answer\": \"It covers the harbour project.\"}",
                            "done": true,
                            "done_reason": "stop"
                        }));
                    })
                    .await,
            ];
            MOCK_HANDLES.set(mocks).ok();

            config::init_config().expect("test configuration");
            logging::init_tracing();
        })
        .await;

        let config = config::get_config().expect("configuration loaded");
        let pipeline = DocumentPipeline::from_config(config).expect("pipeline");
        let server = DocNavMcpServer::new(Arc::new(pipeline));

        let (client_stream, server_stream) = tokio::io::duplex(64 * 1024);
        let (client_read, client_write) = split(client_stream);
        let (server_read, server_write) = split(server_stream);

        let client_transport = AsyncRwTransport::new_client(client_read, client_write);
        let server_transport = AsyncRwTransport::new_server(server_read, server_write);

        let server_info = server.get_info();
        let client_handler = DummyClientHandler;
        let client_info = ClientHandler::get_info(&client_handler);

        let server =
            serve_directly::<RoleServer, _, _, _, _>(server, server_transport, Some(client_info));
        let service = serve_directly::<RoleClient, _, _, _, _>(
            client_handler,
            client_transport,
            Some(server_info),
        );

        Self { service, server }
    }

    async fn shutdown(self) {
        let Self { service, server } = self;
        let _ = service.cancel().await;
        let _ = server.cancel().await;
    }
}

#[tokio::test]
async fn initialize_and_list_tools() {
    let harness = TestHarness::new().await;
    let service = &harness.service;

    let info = service
        .peer_info()
        .expect("server info should be initialized");
    assert_eq!(info.server_info.name, "docnav");
    assert!(info.capabilities.tools.is_some());

    let tools_result = service
        .list_tools(Some(PaginatedRequestParam { cursor: None }))
        .await
        .expect("list_tools");

    let names: Vec<_> = tools_result
        .tools
        .iter()
        .map(|tool| tool.name.as_ref())
        .collect();

    assert!(names.contains(&"summarize"));
    assert!(names.contains(&"ask"));
    assert!(names.contains(&"metrics"));

    harness.shutdown().await;
}

#[tokio::test]
async fn summarize_then_ask_round_trip() {
    let harness = TestHarness::new().await;
    let service = &harness.service;

    let summary = service
        .call_tool(CallToolRequestParam {
            name: "summarize".into(),
            arguments: arguments(json!({
                "document_content": "The harbour project starts in May. ".repeat(50)
            })),
        })
        .await
        .expect("summarize tool call");
    assert_eq!(summary.is_error, Some(false));
    let payload = summary.structured_content.expect("structured payload");
    assert_eq!(payload["summary"], "A memo about the harbour project.");
    assert_eq!(payload["truncated"], true);

    let answer = service
        .call_tool(CallToolRequestParam {
            name: "ask".into(),
            arguments: arguments(json!({
                "document_content": payload["summary"],
                "user_question": "What is this about?"
            })),
        })
        .await
        .expect("ask tool call");
    let payload = answer.structured_content.expect("structured payload");
    assert_eq!(payload["answer"], "It covers the harbour project.");

    let metrics = service
        .call_tool(CallToolRequestParam {
            name: "metrics".into(),
            arguments: arguments(json!({})),
        })
        .await
        .expect("metrics tool call");
    let payload = metrics.structured_content.expect("structured metrics payload");
    assert_eq!(payload["summariesGenerated"], 1);
    assert_eq!(payload["answersGenerated"], 1);
    assert_eq!(payload["documentsTruncated"], 1);

    harness.shutdown().await;
}

#[tokio::test]
async fn blank_question_returns_invalid_params() {
    let harness = TestHarness::new().await;
    let service = &harness.service;

    let err = service
        .call_tool(CallToolRequestParam {
            name: "ask".into(),
            arguments: arguments(json!({
                "document_content": "A memo.",
                "user_question": "  "
            })),
        })
        .await
        .expect_err("ask should fail");

    match err {
        rmcp::service::ServiceError::McpError(data) => {
            assert_eq!(data.code, model::ErrorCode::INVALID_PARAMS);
            assert_eq!(data.data.expect("error data")["kind"], "empty_question");
        }
        other => panic!("expected MCP error, got {other:?}"),
    }

    harness.shutdown().await;
}

#[tokio::test]
async fn settings_resource_reports_budget() {
    let harness = TestHarness::new().await;
    let service = &harness.service;

    let result = service
        .read_resource(ReadResourceRequestParam {
            uri: "mcp://settings".into(),
        })
        .await
        .expect("read settings");

    let text = match &result.contents[0] {
        ResourceContents::TextResourceContents { text, .. } => text.clone(),
        other => panic!("expected text contents, got {other:?}"),
    };
    let settings: Value = serde_json::from_str(&text).expect("settings json");
    assert_eq!(settings["provider"], "ollama");
    assert_eq!(settings["max_summary_chars"], 1000);
    assert_eq!(settings["summary_model"], "llama3.1");

    harness.shutdown().await;
}
