//! PDF text extraction, one page at a time.

use super::{DocumentFormat, ExtractionError};
use lopdf::Document;

/// Extract text page by page in page order.
///
/// Within a page, text items are trimmed and joined by a single space; pages are joined by a
/// newline. Pages without text contribute an empty line so page positions stay stable.
pub(super) fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractionError> {
    let document = Document::load_mem(bytes).map_err(malformed)?;
    let pages = document.get_pages();
    tracing::debug!(pages = pages.len(), "Parsed PDF page tree");

    let mut out = Vec::with_capacity(pages.len());
    for page_number in pages.keys() {
        let raw = document.extract_text(&[*page_number]).map_err(malformed)?;
        out.push(join_items(&raw));
    }
    Ok(out.join("\n"))
}

fn join_items(raw: &str) -> String {
    raw.lines()
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn malformed(error: lopdf::Error) -> ExtractionError {
    ExtractionError::Malformed {
        format: DocumentFormat::Pdf,
        reason: error.to_string(),
    }
}
