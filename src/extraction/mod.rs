//! Plain-text extraction for uploaded documents (PDF, DOCX).
//!
//! Callers supply the raw bytes plus whatever MIME type and filename the upload carried; this
//! module decides the format, runs the matching parser, and guarantees that a successful result
//! contains non-whitespace text. No network I/O happens here.

mod docx;
mod pdf;

use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// MIME type accepted for PDF uploads.
pub const MIME_PDF: &str = "application/pdf";
/// MIME type accepted for DOCX uploads.
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// MIME types that carry no format information; the `.docx` suffix decides for these.
const GENERIC_MIME_TYPES: [&str; 4] = [
    "application/octet-stream",
    "binary/octet-stream",
    "application/zip",
    "application/x-zip-compressed",
];

/// Document formats the extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    /// Portable Document Format.
    Pdf,
    /// Office Open XML word-processing document.
    Docx,
}

impl DocumentFormat {
    /// Decide the document format from the declared MIME type, falling back to the `.docx`
    /// filename suffix when the MIME type is absent or generic.
    pub fn detect(mime_type: &str, filename: &str) -> Option<Self> {
        let mime = mime_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match mime.as_str() {
            MIME_PDF => Some(Self::Pdf),
            MIME_DOCX => Some(Self::Docx),
            other
                if (other.is_empty() || GENERIC_MIME_TYPES.contains(&other))
                    && filename.to_ascii_lowercase().ends_with(".docx") =>
            {
                Some(Self::Docx)
            }
            _ => None,
        }
    }

    /// Short label used in logs and error messages.
    pub fn label(self) -> &'static str {
        match self {
            Self::Pdf => "PDF",
            Self::Docx => "DOCX",
        }
    }
}

/// Errors raised while turning a document buffer into text.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractionError {
    /// Upload is neither PDF nor DOCX; raised before any parsing.
    #[error("unsupported file type '{mime_type}' for '{filename}': please upload a PDF or DOCX file")]
    UnsupportedFormat {
        /// Name of the rejected upload.
        filename: String,
        /// MIME type declared for the upload.
        mime_type: String,
    },
    /// Parser rejected the buffer.
    #[error("{} parsing failed: {reason}", .format.label())]
    Malformed {
        /// Format the buffer was parsed as.
        format: DocumentFormat,
        /// Parser diagnostic.
        reason: String,
    },
    /// Parser succeeded but produced only whitespace (e.g. a scanned, image-only PDF).
    #[error("no text extracted from '{source_name}'")]
    NoText {
        /// Name of the document that yielded nothing.
        source_name: String,
    },
}

/// Text produced from exactly one uploaded document. Always non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedText {
    /// Filename of the source document.
    pub source_name: String,
    /// Detected document format.
    pub format: DocumentFormat,
    /// SHA-256 of the source bytes, hex encoded.
    pub digest: String,
    /// Extracted plain text.
    pub text: String,
}

impl ExtractedText {
    /// Number of characters in the extracted text.
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// Extract plain text from a document buffer.
///
/// Fails with [`ExtractionError::UnsupportedFormat`] before parsing when the format is not
/// recognised, and with [`ExtractionError::NoText`] when parsing yields only whitespace.
pub fn extract(
    bytes: &[u8],
    mime_type: &str,
    filename: &str,
) -> Result<ExtractedText, ExtractionError> {
    let format = DocumentFormat::detect(mime_type, filename).ok_or_else(|| {
        ExtractionError::UnsupportedFormat {
            filename: filename.to_string(),
            mime_type: mime_type.to_string(),
        }
    })?;

    let text = match format {
        DocumentFormat::Pdf => pdf::extract_pdf(bytes)?,
        DocumentFormat::Docx => docx::extract_docx(bytes)?,
    };

    if text.trim().is_empty() {
        return Err(ExtractionError::NoText {
            source_name: filename.to_string(),
        });
    }

    Ok(ExtractedText {
        source_name: filename.to_string(),
        format,
        digest: content_digest(bytes),
        text,
    })
}

fn content_digest(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
