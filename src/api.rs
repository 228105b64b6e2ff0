//! HTTP surface for the document navigator.
//!
//! This module exposes a compact Axum router:
//!
//! - `POST /summarize` – Summarize plain text (`{ "document_content" }` → `{ "summary" }`),
//!   truncating it to the configured budget first.
//! - `POST /ask` – Answer a question from a summary (`{ "document_content", "user_question" }`
//!   → `{ "answer" }`).
//! - `POST /extract?filename=…` – Extract text from a raw PDF/DOCX body; the format comes from
//!   the `Content-Type` header (or the `.docx` suffix when the header is generic).
//! - `POST /session/document?filename=…` – Replace the session document: extract, summarize,
//!   and reset the chat.
//! - `POST /session/messages` – Ask about the session document (`{ "text" }`).
//! - `GET /session` / `DELETE /session` – Inspect or reset the session.
//! - `GET /metrics` – Pipeline counters.
//! - `GET /commands` – Machine-readable command catalog for quick discovery by tools/hosts.
//!
//! The stateless endpoints share the pipeline with the MCP server, so behavior is identical
//! across interfaces. Failures return `{ "error": <kind>, "message": <user text> }` with a
//! status derived from the error kind.

use crate::{
    config::{DEFAULT_MAX_UPLOAD_BYTES, get_config},
    extraction::{DocumentFormat, ExtractedText},
    metrics::MetricsSnapshot,
    pipeline::{ErrorKind, PipelineApi, PipelineError, RawDocument},
    session::{ChatMessage, Session, SessionError, SessionHandle},
};
use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Query, State},
    http::{HeaderMap, StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Shared handler state: the pipeline plus the single chat session it serves.
struct AppState<S> {
    pipeline: Arc<S>,
    session: SessionHandle,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            pipeline: self.pipeline.clone(),
            session: self.session.clone(),
        }
    }
}

/// Build the HTTP router exposing the document API surface.
pub fn create_router<S>(pipeline: Arc<S>) -> Router
where
    S: PipelineApi + 'static,
{
    let body_limit = get_config()
        .map(|config| config.max_upload_bytes)
        .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);
    let state = AppState {
        pipeline,
        session: SessionHandle::new(),
    };

    Router::new()
        .route("/summarize", post(summarize::<S>))
        .route("/ask", post(ask::<S>))
        .route("/extract", post(extract::<S>))
        .route("/session", get(get_session::<S>).delete(clear_session::<S>))
        .route("/session/document", post(upload_document::<S>))
        .route("/session/messages", post(send_message::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// Request body for `POST /summarize`.
#[derive(Deserialize)]
struct SummarizeRequest {
    /// Plain document text.
    document_content: String,
}

/// Response body for `POST /summarize`.
#[derive(Serialize)]
struct SummarizeResponse {
    summary: String,
}

async fn summarize<S>(
    State(state): State<AppState<S>>,
    Json(request): Json<SummarizeRequest>,
) -> Result<Json<SummarizeResponse>, AppError>
where
    S: PipelineApi,
{
    let context = state.pipeline.summarize(&request.document_content).await?;
    Ok(Json(SummarizeResponse {
        summary: context.summary,
    }))
}

/// Request body for `POST /ask`.
#[derive(Deserialize)]
struct AskRequest {
    /// Summary grounding the answer.
    document_content: String,
    /// Question about the document.
    user_question: String,
}

/// Response body for `POST /ask`.
#[derive(Serialize)]
struct AskResponse {
    answer: String,
}

async fn ask<S>(
    State(state): State<AppState<S>>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>, AppError>
where
    S: PipelineApi,
{
    let answer = state
        .pipeline
        .ask(&request.document_content, &request.user_question)
        .await?;
    Ok(Json(AskResponse { answer }))
}

/// Query string accepted by the upload endpoints.
#[derive(Deserialize)]
struct UploadQuery {
    /// Original filename; needed when the content type is generic.
    #[serde(default)]
    filename: Option<String>,
}

impl UploadQuery {
    fn into_document(self, headers: &HeaderMap, body: Bytes) -> RawDocument {
        let mime_type = headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        RawDocument::new(
            self.filename.unwrap_or_else(|| "document".to_string()),
            mime_type,
            body.to_vec(),
        )
    }
}

/// Response body for `POST /extract`.
#[derive(Serialize)]
struct ExtractResponse {
    source_name: String,
    format: DocumentFormat,
    digest: String,
    characters: usize,
    text: String,
}

impl From<ExtractedText> for ExtractResponse {
    fn from(extracted: ExtractedText) -> Self {
        Self {
            characters: extracted.char_count(),
            source_name: extracted.source_name,
            format: extracted.format,
            digest: extracted.digest,
            text: extracted.text,
        }
    }
}

async fn extract<S>(
    State(state): State<AppState<S>>,
    Query(query): Query<UploadQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ExtractResponse>, AppError>
where
    S: PipelineApi,
{
    let extracted = state
        .pipeline
        .extract(query.into_document(&headers, body))
        .await?;
    Ok(Json(extracted.into()))
}

/// Response body for `POST /session/document`.
#[derive(Serialize)]
struct UploadResponse {
    session: Session,
    /// Extracted text, returned once for display and not kept in the session.
    extracted: ExtractResponse,
    truncated: bool,
}

async fn upload_document<S>(
    State(state): State<AppState<S>>,
    Query(query): Query<UploadQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<UploadResponse>, AppError>
where
    S: PipelineApi,
{
    let document = query.into_document(&headers, body);
    let outcome = state
        .session
        .upload(state.pipeline.as_ref(), document)
        .await?;
    tracing::info!(
        document = %outcome.extracted.source_name,
        truncated = outcome.truncated,
        "Session document ready"
    );
    Ok(Json(UploadResponse {
        session: state.session.snapshot().await,
        extracted: outcome.extracted.into(),
        truncated: outcome.truncated,
    }))
}

/// Request body for `POST /session/messages`.
#[derive(Deserialize)]
struct MessageRequest {
    /// Question text.
    text: String,
}

/// Response body for `POST /session/messages`.
#[derive(Serialize)]
struct MessageResponse {
    answer: ChatMessage,
    session: Session,
}

async fn send_message<S>(
    State(state): State<AppState<S>>,
    Json(request): Json<MessageRequest>,
) -> Result<Json<MessageResponse>, AppError>
where
    S: PipelineApi,
{
    let answer = state
        .session
        .send_message(state.pipeline.as_ref(), &request.text)
        .await?;
    Ok(Json(MessageResponse {
        answer,
        session: state.session.snapshot().await,
    }))
}

async fn get_session<S>(State(state): State<AppState<S>>) -> Json<Session>
where
    S: PipelineApi,
{
    Json(state.session.snapshot().await)
}

async fn clear_session<S>(State(state): State<AppState<S>>) -> Json<Session>
where
    S: PipelineApi,
{
    state.session.clear().await;
    Json(state.session.snapshot().await)
}

/// Return the pipeline counters.
async fn get_metrics<S>(State(state): State<AppState<S>>) -> Json<MetricsSnapshot>
where
    S: PipelineApi,
{
    Json(state.pipeline.metrics_snapshot())
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery/UX in hosts and tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "summarize",
                method: "POST",
                path: "/summarize",
                description: "Summarize plain document text. Input beyond the character budget is truncated first. Response returns { \"summary\": string }.",
                request_example: Some(json!({ "document_content": "Document contents" })),
            },
            CommandDescriptor {
                name: "ask",
                method: "POST",
                path: "/ask",
                description: "Answer a question using only the supplied summary. Response returns { \"answer\": string }.",
                request_example: Some(json!({
                    "document_content": "Summary returned by /summarize",
                    "user_question": "What is this about?"
                })),
            },
            CommandDescriptor {
                name: "extract",
                method: "POST",
                path: "/extract?filename=report.pdf",
                description: "Extract plain text from a raw PDF or DOCX request body; set Content-Type to the document's MIME type.",
                request_example: None,
            },
            CommandDescriptor {
                name: "upload_document",
                method: "POST",
                path: "/session/document?filename=report.pdf",
                description: "Replace the session document with a raw PDF or DOCX body, summarize it, and clear the chat.",
                request_example: None,
            },
            CommandDescriptor {
                name: "send_message",
                method: "POST",
                path: "/session/messages",
                description: "Ask a question about the session document; the answer is appended to the transcript.",
                request_example: Some(json!({ "text": "Who wrote this memo?" })),
            },
            CommandDescriptor {
                name: "get_session",
                method: "GET",
                path: "/session",
                description: "Return the session document name, summary, transcript, and errors.",
                request_example: None,
            },
            CommandDescriptor {
                name: "clear_session",
                method: "DELETE",
                path: "/session",
                description: "Reset the session to empty.",
                request_example: None,
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return extraction, summary, answer, and failure counters.",
                request_example: None,
            },
        ],
    })
}

struct AppError(SessionError);

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::UnsupportedFormat => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        ErrorKind::ExtractionFailure => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::EmptyInput | ErrorKind::EmptyContext | ErrorKind::EmptyQuestion => {
            StatusCode::BAD_REQUEST
        }
        ErrorKind::ModelRefusal => StatusCode::BAD_GATEWAY,
        ErrorKind::TransportError => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self.0 {
            SessionError::Busy(operation) => (
                StatusCode::CONFLICT,
                Json(json!({
                    "error": "busy",
                    "message": format!("A {operation} is already in progress. Please wait."),
                })),
            )
                .into_response(),
            SessionError::Pipeline(error) => {
                let kind = error.kind();
                let mut body = json!({
                    "error": kind.as_str(),
                    "message": error.user_message(),
                });
                if let Some(diagnostics) = error.diagnostics() {
                    body["diagnostics"] =
                        serde_json::to_value(diagnostics).unwrap_or(serde_json::Value::Null);
                }
                (status_for(kind), Json(body)).into_response()
            }
        }
    }
}

impl From<SessionError> for AppError {
    fn from(inner: SessionError) -> Self {
        Self(inner)
    }
}

impl From<PipelineError> for AppError {
    fn from(inner: PipelineError) -> Self {
        Self(SessionError::Pipeline(inner))
    }
}

#[cfg(test)]
mod tests {
    use super::{create_router, get_commands};
    use crate::extraction::{MIME_DOCX, fixtures::docx_with_paragraphs};
    use crate::llm::{Generation, LlmClient, LlmError, RefusalDiagnostics, StructuredRequest};
    use crate::pipeline::{DocumentPipeline, PipelineSettings, testing::ScriptedClient};
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode},
    };
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app(client: Arc<ScriptedClient>) -> Router {
        create_router(Arc::new(DocumentPipeline::new(
            PipelineSettings::new("test-model"),
            client,
        )))
    }

    fn json_request(method: Method, uri: &str, payload: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(payload.to_string()))
            .expect("request")
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.expect("router response");
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).expect("json body")
        };
        (status, json)
    }

    #[tokio::test]
    async fn commands_catalog_exposes_core_endpoints() {
        let response = get_commands().await;
        let commands = response.0.commands;
        let summarize = commands
            .iter()
            .find(|cmd| cmd.name == "summarize")
            .expect("summarize command present");

        assert_eq!(summarize.method, "POST");
        assert_eq!(summarize.path, "/summarize");
        assert!(commands.iter().any(|cmd| cmd.name == "ask"));
        assert!(commands.len() >= 5);
    }

    #[tokio::test]
    async fn summarize_route_returns_summary() {
        let client = ScriptedClient::replying("Revenue grew.");
        let app = app(client.clone());

        let (status, body) = send(
            &app,
            json_request(
                Method::POST,
                "/summarize",
                json!({ "document_content": "Quarterly revenue grew by ten percent." }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["summary"], "Revenue grew.");
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn blank_question_is_a_bad_request() {
        let client = ScriptedClient::replying("unused");
        let app = app(client.clone());

        let (status, body) = send(
            &app,
            json_request(
                Method::POST,
                "/ask",
                json!({ "document_content": "A summary.", "user_question": "   " }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "empty_question");
        assert_eq!(body["message"], "Please provide a question.");
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn refusal_maps_to_bad_gateway_with_diagnostics() {
        let app = app(ScriptedClient::refusing("content_filter"));

        let (status, body) = send(
            &app,
            json_request(
                Method::POST,
                "/ask",
                json!({ "document_content": "A summary.", "user_question": "Who?" }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "model_refusal");
        assert_eq!(body["message"], "The AI failed to answer. Please try again.");
        assert_eq!(body["diagnostics"]["finish_reason"], "content_filter");
    }

    #[tokio::test]
    async fn transport_failure_maps_to_service_unavailable() {
        let app = app(ScriptedClient::failing(500));

        let (status, body) = send(
            &app,
            json_request(
                Method::POST,
                "/summarize",
                json!({ "document_content": "Text." }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "transport_error");
    }

    #[tokio::test]
    async fn unsupported_upload_is_rejected() {
        let app = app(ScriptedClient::replying("unused"));

        let (status, body) = send(
            &app,
            Request::builder()
                .method(Method::POST)
                .uri("/extract?filename=notes.txt")
                .header("content-type", "text/plain")
                .body(Body::from("hello"))
                .expect("request"),
        )
        .await;

        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(body["error"], "unsupported_format");
    }

    #[tokio::test]
    async fn session_flow_upload_chat_and_clear() {
        let client = ScriptedClient::replies("Hiring two engineers.", "It is about hiring.");
        let app = app(client);

        let (status, body) = send(
            &app,
            Request::builder()
                .method(Method::POST)
                .uri("/session/document?filename=memo.docx")
                .header("content-type", MIME_DOCX)
                .body(Body::from(docx_with_paragraphs(&["Hiring plan", "Q3"])))
                .expect("request"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["session"]["document_name"], "memo.docx");
        assert_eq!(body["session"]["context"]["summary"], "Hiring two engineers.");
        assert_eq!(body["extracted"]["text"], "Hiring plan\nQ3");
        assert_eq!(body["extracted"]["format"], "docx");
        assert_eq!(body["truncated"], false);

        let (status, body) = send(
            &app,
            json_request(
                Method::POST,
                "/session/messages",
                json!({ "text": "What is this about?" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["answer"]["sender"], "assistant");
        assert_eq!(body["answer"]["text"], "It is about hiring.");
        assert_eq!(body["session"]["messages"].as_array().map(Vec::len), Some(2));

        let (status, body) = send(
            &app,
            Request::builder()
                .method(Method::DELETE)
                .uri("/session")
                .body(Body::empty())
                .expect("request"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["document_name"], Value::Null);
        assert_eq!(body["messages"].as_array().map(Vec::len), Some(0));
    }

    #[tokio::test]
    async fn message_without_document_is_a_bad_request() {
        let app = app(ScriptedClient::replying("unused"));

        let (status, body) = send(
            &app,
            json_request(Method::POST, "/session/messages", json!({ "text": "Hello?" })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "empty_context");
    }

    /// Model stand-in that holds every call until the gate opens.
    struct GatedClient {
        gate: tokio::sync::Notify,
    }

    #[async_trait::async_trait]
    impl LlmClient for GatedClient {
        async fn generate(&self, _request: StructuredRequest) -> Result<Generation, LlmError> {
            self.gate.notified().await;
            Ok(Generation {
                output: Some("Gated summary.".into()),
                diagnostics: RefusalDiagnostics::default(),
            })
        }
    }

    fn upload_request(filename: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(format!("/session/document?filename={filename}"))
            .header("content-type", MIME_DOCX)
            .body(Body::from(docx_with_paragraphs(&["Hiring plan"])))
            .expect("request")
    }

    #[tokio::test]
    async fn second_upload_while_one_is_running_is_a_conflict() {
        let client = Arc::new(GatedClient {
            gate: tokio::sync::Notify::new(),
        });
        let app = create_router(Arc::new(DocumentPipeline::new(
            PipelineSettings::new("test-model"),
            client.clone(),
        )));

        let first = {
            let app = app.clone();
            tokio::spawn(async move { send(&app, upload_request("first.docx")).await })
        };
        let mut uploading = false;
        for _ in 0..1_000 {
            let (_, session) = send(
                &app,
                Request::builder()
                    .uri("/session")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await;
            if session["upload_in_flight"] == true {
                uploading = true;
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert!(uploading, "first upload never started");

        let (status, body) = send(&app, upload_request("second.docx")).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "busy");

        client.gate.notify_one();
        let (status, body) = first.await.expect("join");
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["session"]["document_name"], "first.docx");
        assert_eq!(body["session"]["context"]["summary"], "Gated summary.");
    }
}
