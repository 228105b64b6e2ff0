//! Ollama-backed structured generation over `/api/generate`.

use super::{
    Generation, LlmClient, LlmError, RefusalDiagnostics, StructuredRequest, http_client,
    parse_structured_field, single_field_schema, snippet,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";
const PROVIDER: &str = "ollama";

/// Client for a local or remote Ollama runtime.
pub struct OllamaClient {
    http: Client,
    base_url: String,
}

impl OllamaClient {
    /// Create a client for `base_url` (defaults to the local runtime).
    pub fn new(base_url: Option<String>, timeout: Option<Duration>) -> Result<Self, LlmError> {
        Ok(Self {
            http: http_client("docnav/ollama", timeout)?,
            base_url: base_url.unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    done_reason: Option<String>,
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn generate(&self, request: StructuredRequest) -> Result<Generation, LlmError> {
        let endpoint = self.endpoint();
        let payload = json!({
            "model": request.model,
            "prompt": request.prompt,
            "stream": false,
            "format": single_field_schema(request.output_field),
            "options": {
                "temperature": 0.2,
            }
        });

        tracing::debug!(
            endpoint = %endpoint,
            model = %request.model,
            field = request.output_field,
            prompt_chars = request.prompt.chars().count(),
            "Requesting Ollama generation"
        );

        let response = self
            .http
            .post(&endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|error| LlmError::Unreachable {
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

        let body: OllamaResponse =
            response
                .json()
                .await
                .map_err(|error| LlmError::InvalidEnvelope {
                    provider: PROVIDER,
                    message: error.to_string(),
                })?;

        let output = if body.done {
            parse_structured_field(&body.response, request.output_field)
        } else {
            None
        };
        let detail = match (&output, body.done) {
            (Some(_), _) => None,
            (None, false) => Some("generation incomplete (done=false)".to_string()),
            (None, true) => snippet(&body.response),
        };

        Ok(Generation {
            output,
            diagnostics: RefusalDiagnostics {
                provider: PROVIDER,
                finish_reason: body.done_reason,
                status: Some(status.to_string()),
                detail,
            },
        })
    }
}
