//! Pipeline facade shared by the HTTP server, the MCP tools, and the CLI.

use super::{
    answerer::Answerer,
    summarizer::Summarizer,
    truncate::{exceeds, truncate},
    types::{DocumentContext, ErrorKind, IngestOutcome, PipelineError, RawDocument},
};
use crate::{
    config::{Config, DEFAULT_SUMMARY_MAX_CHARS},
    extraction::{self, DocumentFormat, ExtractedText, ExtractionError},
    llm::{self, LlmClient, LlmError},
    metrics::{MetricsSnapshot, PipelineMetrics},
};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

/// Tunables applied by [`DocumentPipeline`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineSettings {
    /// Character budget applied before summarization.
    pub max_summary_chars: usize,
    /// Model used for summaries.
    pub summary_model: String,
    /// Model used for answers.
    pub answer_model: String,
}

impl PipelineSettings {
    /// Settings using the default budget and one model for both calls.
    pub fn new(model: impl Into<String>) -> Self {
        let model = model.into();
        Self {
            max_summary_chars: DEFAULT_SUMMARY_MAX_CHARS,
            summary_model: model.clone(),
            answer_model: model,
        }
    }

    /// Derive settings from loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_summary_chars: config.summary_max_chars,
            summary_model: config.llm_model.clone(),
            answer_model: config.answer_model().to_string(),
        }
    }
}

/// Abstraction over the document pipeline used by external surfaces (HTTP, MCP, CLI).
#[async_trait]
pub trait PipelineApi: Send + Sync {
    /// Pull plain text out of an uploaded PDF or DOCX.
    async fn extract(&self, document: RawDocument) -> Result<ExtractedText, PipelineError>;

    /// Bound `text` to the configured budget and summarize it.
    async fn summarize(&self, text: &str) -> Result<DocumentContext, PipelineError>;

    /// Answer `question` from the summary in `context`.
    async fn ask(&self, context: &str, question: &str) -> Result<String, PipelineError>;

    /// Extract, truncate, and summarize one upload.
    async fn ingest(&self, document: RawDocument) -> Result<IngestOutcome, PipelineError>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;

    /// Settings the pipeline runs with.
    fn settings(&self) -> PipelineSettings;
}

/// Runs documents through extraction, truncation, summarization, and answering.
///
/// Holds no per-document state: every call receives its inputs explicitly, so a single
/// instance is shared behind an `Arc` by all surfaces.
pub struct DocumentPipeline {
    summarizer: Summarizer,
    answerer: Answerer,
    settings: PipelineSettings,
    metrics: Arc<PipelineMetrics>,
}

impl DocumentPipeline {
    /// Build a pipeline issuing model calls through `client`.
    pub fn new(settings: PipelineSettings, client: Arc<dyn LlmClient>) -> Self {
        Self {
            summarizer: Summarizer::new(client.clone(), settings.summary_model.clone()),
            answerer: Answerer::new(client, settings.answer_model.clone()),
            settings,
            metrics: Arc::new(PipelineMetrics::new()),
        }
    }

    /// Build a pipeline with the backend and settings selected by configuration.
    pub fn from_config(config: &Config) -> Result<Self, LlmError> {
        let client = llm::build_client(config)?;
        tracing::info!(
            provider = config.llm_provider.label(),
            model = %config.llm_model,
            "Model backend initialized"
        );
        Ok(Self::new(PipelineSettings::from_config(config), client))
    }

    fn bound(&self, text: &str) -> (String, bool) {
        let limit = self.settings.max_summary_chars;
        if !exceeds(text, limit) {
            return (text.to_string(), false);
        }
        let bounded = truncate(text, limit);
        self.metrics.record_truncation();
        tracing::warn!(
            original_chars = text.chars().count(),
            max_chars = limit,
            "Document text exceeds summarization budget; truncating"
        );
        (bounded, true)
    }

    async fn summarize_bounded(&self, text: &str) -> Result<DocumentContext, PipelineError> {
        let result = self.summarizer.summarize(text).await;
        match &result {
            Ok(context) => {
                self.metrics.record_summary();
                tracing::info!(summary_chars = context.summary.len(), "Summary generated");
            }
            Err(error) => self.record_failure(error),
        }
        result
    }

    fn record_failure(&self, error: &PipelineError) {
        match error.kind() {
            ErrorKind::ModelRefusal => self.metrics.record_refusal(),
            ErrorKind::TransportError => {
                self.metrics.record_transport_error();
                tracing::error!(error = %error, "Model backend failure");
            }
            _ => {}
        }
    }
}

#[async_trait]
impl PipelineApi for DocumentPipeline {
    async fn extract(&self, document: RawDocument) -> Result<ExtractedText, PipelineError> {
        let RawDocument {
            name,
            mime_type,
            bytes,
        } = document;
        let format = DocumentFormat::detect(&mime_type, &name).ok_or_else(|| {
            ExtractionError::UnsupportedFormat {
                filename: name.clone(),
                mime_type: mime_type.clone(),
            }
        })?;
        tracing::info!(
            document = %name,
            format = format.label(),
            bytes = bytes.len(),
            "Extracting document text"
        );

        let extracted = tokio::task::spawn_blocking(move || {
            extraction::extract(&bytes, &mime_type, &name)
        })
        .await
        .map_err(|join| ExtractionError::Malformed {
            format,
            reason: format!("extraction worker failed: {join}"),
        })?;

        match extracted {
            Ok(extracted) => {
                self.metrics.record_extraction();
                tracing::info!(
                    document = %extracted.source_name,
                    characters = extracted.char_count(),
                    digest = %extracted.digest,
                    "Document text extracted"
                );
                Ok(extracted)
            }
            Err(error) => {
                tracing::warn!(error = %error, "Extraction failed");
                Err(error.into())
            }
        }
    }

    async fn summarize(&self, text: &str) -> Result<DocumentContext, PipelineError> {
        // Blank input must be rejected before the marker makes it look non-empty.
        if text.trim().is_empty() {
            return Err(PipelineError::EmptyInput);
        }
        let (bounded, _) = self.bound(text);
        self.summarize_bounded(&bounded).await
    }

    async fn ask(&self, context: &str, question: &str) -> Result<String, PipelineError> {
        let result = self.answerer.ask(context, question).await;
        match &result {
            Ok(answer) => {
                self.metrics.record_answer();
                tracing::info!(answer_chars = answer.len(), "Answer generated");
            }
            Err(error) => self.record_failure(error),
        }
        result
    }

    async fn ingest(&self, document: RawDocument) -> Result<IngestOutcome, PipelineError> {
        let extracted = self.extract(document).await?;
        let (bounded, truncated) = self.bound(&extracted.text);
        let context = self.summarize_bounded(&bounded).await?;
        Ok(IngestOutcome {
            extracted,
            truncated,
            context,
        })
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    fn settings(&self) -> PipelineSettings {
        self.settings.clone()
    }
}
