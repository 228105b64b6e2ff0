//! Data model and error taxonomy for the document pipeline.

pub use crate::extraction::ExtractedText;

use crate::{
    extraction::ExtractionError,
    llm::{LlmError, RefusalDiagnostics},
};
use serde::Serialize;
use thiserror::Error;

/// An uploaded document before extraction. Discarded once text has been pulled out.
#[derive(Debug, Clone)]
pub struct RawDocument {
    /// Original filename.
    pub name: String,
    /// Declared MIME type; may be empty.
    pub mime_type: String,
    /// File contents.
    pub bytes: Vec<u8>,
}

impl RawDocument {
    /// Bundle an upload.
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }
}

/// The summary that grounds every answer for the current document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentContext {
    /// Model-generated summary of the (possibly truncated) document text.
    pub summary: String,
}

/// Result of running a document through extraction, truncation, and summarization.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    /// Text pulled out of the upload.
    pub extracted: ExtractedText,
    /// Whether the text exceeded the summarization budget.
    pub truncated: bool,
    /// Summary used as the chat context.
    pub context: DocumentContext,
}

/// Failure classes surfaced by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Upload is neither PDF nor DOCX.
    UnsupportedFormat,
    /// Parser failed or yielded no usable text.
    ExtractionFailure,
    /// Summarization requested on blank text.
    EmptyInput,
    /// Question asked without a summary.
    EmptyContext,
    /// Blank question.
    EmptyQuestion,
    /// Model call completed without usable structured output.
    ModelRefusal,
    /// Model backend could not be reached or failed.
    TransportError,
}

impl ErrorKind {
    /// Stable identifier used in API payloads.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UnsupportedFormat => "unsupported_format",
            Self::ExtractionFailure => "extraction_failure",
            Self::EmptyInput => "empty_input",
            Self::EmptyContext => "empty_context",
            Self::EmptyQuestion => "empty_question",
            Self::ModelRefusal => "model_refusal",
            Self::TransportError => "transport_error",
        }
    }

    /// Whether the failure was caught before any model call was issued.
    pub fn is_precondition(self) -> bool {
        matches!(
            self,
            Self::EmptyInput | Self::EmptyContext | Self::EmptyQuestion
        )
    }
}

/// Errors emitted by the document pipeline.
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    /// Extraction rejected the upload.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    /// Summarization requested on empty or whitespace-only text.
    #[error("no document text to summarize")]
    EmptyInput,
    /// Question asked without a document summary.
    #[error("no summary available to chat about")]
    EmptyContext,
    /// Question was empty or whitespace-only.
    #[error("please provide a question")]
    EmptyQuestion,
    /// Model call completed but returned no usable structured output.
    #[error("{operation} returned no usable output ({})", describe(.diagnostics))]
    ModelRefusal {
        /// Pipeline operation that issued the call (`summarize` or `ask`).
        operation: &'static str,
        /// Backend diagnostics for operators.
        diagnostics: RefusalDiagnostics,
    },
    /// Model backend failed or could not be reached.
    #[error("model backend failure during {operation}: {source}")]
    Transport {
        /// Pipeline operation that issued the call.
        operation: &'static str,
        /// Underlying transport error.
        #[source]
        source: LlmError,
    },
}

impl PipelineError {
    /// Classify the failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Extraction(ExtractionError::UnsupportedFormat { .. }) => {
                ErrorKind::UnsupportedFormat
            }
            Self::Extraction(_) => ErrorKind::ExtractionFailure,
            Self::EmptyInput => ErrorKind::EmptyInput,
            Self::EmptyContext => ErrorKind::EmptyContext,
            Self::EmptyQuestion => ErrorKind::EmptyQuestion,
            Self::ModelRefusal { .. } => ErrorKind::ModelRefusal,
            Self::Transport { .. } => ErrorKind::TransportError,
        }
    }

    /// Text suitable for showing to the person using the application.
    pub fn user_message(&self) -> String {
        match self {
            Self::Extraction(ExtractionError::UnsupportedFormat { .. }) => {
                "Unsupported file type. Please upload a PDF or DOCX file.".to_string()
            }
            Self::Extraction(ExtractionError::NoText { .. }) => {
                "No text could be extracted from the document.".to_string()
            }
            Self::Extraction(ExtractionError::Malformed { format, .. }) => format!(
                "The {} file could not be read. It may be corrupted or password protected.",
                format.label()
            ),
            Self::EmptyInput => "There is no document text to summarize.".to_string(),
            Self::EmptyContext => "No document summary loaded to chat about.".to_string(),
            Self::EmptyQuestion => "Please provide a question.".to_string(),
            Self::ModelRefusal { .. } => {
                "The AI failed to answer. Please try again.".to_string()
            }
            Self::Transport { .. } => {
                "The AI service is unavailable right now. Please try again later.".to_string()
            }
        }
    }

    /// Backend diagnostics, when the failure carries any.
    pub fn diagnostics(&self) -> Option<&RefusalDiagnostics> {
        match self {
            Self::ModelRefusal { diagnostics, .. } => Some(diagnostics),
            _ => None,
        }
    }
}

fn describe(diagnostics: &RefusalDiagnostics) -> String {
    let mut parts = vec![format!("provider={}", diagnostics.provider)];
    if let Some(reason) = diagnostics.finish_reason.as_deref() {
        parts.push(format!("finish_reason={reason}"));
    }
    if let Some(status) = diagnostics.status.as_deref() {
        parts.push(format!("status={status}"));
    }
    if let Some(detail) = diagnostics.detail.as_deref() {
        parts.push(format!("detail={detail}"));
    }
    parts.join(", ")
}
