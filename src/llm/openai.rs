//! OpenAI-compatible structured generation over `/v1/chat/completions`.

use super::{
    Generation, LlmClient, LlmError, RefusalDiagnostics, StructuredRequest, http_client,
    parse_structured_field, single_field_schema, snippet,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const DEFAULT_OPENAI_URL: &str = "https://api.openai.com";
const PROVIDER: &str = "openai";

/// Client for OpenAI or any server speaking the same chat completions protocol.
pub struct OpenAiClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenAiClient {
    /// Create a client for `base_url` (defaults to the hosted API).
    pub fn new(
        base_url: Option<String>,
        api_key: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, LlmError> {
        Ok(Self {
            http: http_client("docnav/openai", timeout)?,
            base_url: base_url.unwrap_or_else(|| DEFAULT_OPENAI_URL.to_string()),
            api_key,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    finish_reason: Option<String>,
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn generate(&self, request: StructuredRequest) -> Result<Generation, LlmError> {
        let endpoint = self.endpoint();
        let payload = json!({
            "model": request.model,
            "messages": [
                { "role": "user", "content": request.prompt }
            ],
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": request.output_field,
                    "strict": true,
                    "schema": single_field_schema(request.output_field),
                }
            }
        });

        tracing::debug!(
            endpoint = %endpoint,
            model = %request.model,
            field = request.output_field,
            prompt_chars = request.prompt.chars().count(),
            "Requesting chat completion"
        );

        let mut builder = self.http.post(&endpoint).json(&payload);
        if let Some(key) = self.api_key.as_deref() {
            builder = builder.bearer_auth(key);
        }
        let response = builder.send().await.map_err(|error| LlmError::Unreachable {
            provider: PROVIDER,
            endpoint: endpoint.clone(),
            message: error.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                provider: PROVIDER,
                status: status.as_u16(),
                body,
            });
        }

        let body: ChatCompletion =
            response
                .json()
                .await
                .map_err(|error| LlmError::InvalidEnvelope {
                    provider: PROVIDER,
                    message: error.to_string(),
                })?;

        let choice = body.choices.into_iter().next();
        let finish_reason = choice
            .as_ref()
            .and_then(|choice| choice.finish_reason.clone());
        let message = choice.and_then(|choice| choice.message);
        let (content, refusal) = match message {
            Some(message) => (message.content, message.refusal),
            None => (None, None),
        };

        let output = content
            .as_deref()
            .and_then(|raw| parse_structured_field(raw, request.output_field));
        let detail = if output.is_some() {
            None
        } else {
            refusal
                .as_deref()
                .and_then(snippet)
                .or_else(|| content.as_deref().and_then(snippet))
                .or_else(|| Some("no message content returned".to_string()))
        };

        Ok(Generation {
            output,
            diagnostics: RefusalDiagnostics {
                provider: PROVIDER,
                finish_reason,
                status: Some(status.to_string()),
                detail,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    fn answer_request() -> StructuredRequest {
        StructuredRequest {
            model: "gpt-4o-mini".into(),
            prompt: "Answer this".into(),
            output_field: "answer",
        }
    }

    #[tokio::test]
    async fn sends_bearer_key_and_parses_answer() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/chat/completions")
                    .header("authorization", "Bearer sk-test")
                    .body_contains(r#""type":"json_schema""#);
                then.status(200).json_body(json!({
                    "choices": [{
                        "finish_reason": "stop",
                        "message": { "role": "assistant", "content": "{\"answer\":\"Forty-two.\"}" }
                    }]
                }));
            })
            .await;

        let client =
            OpenAiClient::new(Some(server.base_url()), Some("sk-test".into()), None).expect("client");
        let generation = client.generate(answer_request()).await.expect("generation");

        mock.assert();
        assert_eq!(generation.output.as_deref(), Some("Forty-two."));
    }

    #[tokio::test]
    async fn refusal_is_carried_in_diagnostics() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(200).json_body(json!({
                    "choices": [{
                        "finish_reason": "stop",
                        "message": { "role": "assistant", "content": null, "refusal": "I can't assist with that." }
                    }]
                }));
            })
            .await;

        let client = OpenAiClient::new(Some(server.base_url()), None, None).expect("client");
        let generation = client.generate(answer_request()).await.expect("completed call");

        assert_eq!(generation.output, None);
        assert_eq!(
            generation.diagnostics.detail.as_deref(),
            Some("I can't assist with that.")
        );
        assert_eq!(generation.diagnostics.finish_reason.as_deref(), Some("stop"));
    }

    #[tokio::test]
    async fn empty_choices_have_no_output() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(200).json_body(json!({ "choices": [] }));
            })
            .await;

        let client = OpenAiClient::new(Some(server.base_url()), None, None).expect("client");
        let generation = client.generate(answer_request()).await.expect("completed call");
        assert_eq!(generation.output, None);
        assert_eq!(
            generation.diagnostics.detail.as_deref(),
            Some("no message content returned")
        );
    }

    #[tokio::test]
    async fn quota_errors_are_transport_errors() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(429).body("rate limited");
            })
            .await;

        let client = OpenAiClient::new(Some(server.base_url()), None, None).expect("client");
        let error = client.generate(answer_request()).await.expect_err("429");
        assert!(matches!(error, LlmError::Status { status: 429, .. }));
    }
}
