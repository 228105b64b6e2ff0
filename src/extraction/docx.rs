//! DOCX raw-text extraction from `word/document.xml`.

use super::{DocumentFormat, ExtractionError};
use quick_xml::events::Event;
use std::io::Read;

const DOCUMENT_XML: &str = "word/document.xml";
/// Maximum decompressed bytes read from the document entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Extract the text runs of a DOCX document, discarding formatting.
///
/// Each non-empty paragraph becomes one line; tabs and explicit breaks inside a paragraph are
/// kept as `\t` and `\n`.
pub(super) fn extract_docx(bytes: &[u8]) -> Result<String, ExtractionError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).map_err(malformed)?;
    let entry = archive.by_name(DOCUMENT_XML).map_err(malformed)?;
    let mut xml = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut xml)
        .map_err(malformed)?;
    if xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(malformed(format!(
            "{DOCUMENT_XML} exceeds size limit ({MAX_XML_ENTRY_BYTES} bytes)"
        )));
    }
    collect_paragraphs(&xml)
}

fn collect_paragraphs(xml: &[u8]) -> Result<String, ExtractionError> {
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_text = false;
    let mut in_run = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"t" => in_text = true,
                b"r" => in_run = true,
                _ => {}
            },
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"r" => in_run = false,
                b"p" => {
                    let paragraph = current.trim_end();
                    if !paragraph.trim().is_empty() {
                        paragraphs.push(paragraph.to_string());
                    }
                    current.clear();
                }
                _ => {}
            },
            // Tab stops in paragraph properties are also `w:tab`; only runs carry content.
            Ok(Event::Empty(e)) if in_run => match e.local_name().as_ref() {
                b"tab" => current.push('\t'),
                b"br" | b"cr" => current.push('\n'),
                _ => {}
            },
            Ok(Event::Text(te)) if in_text => {
                let text = te.unescape().map_err(malformed)?;
                current.push_str(&text);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(malformed(e)),
            _ => {}
        }
        buf.clear();
    }

    // Text outside any paragraph (malformed but seen in the wild).
    if !current.trim().is_empty() {
        paragraphs.push(current.trim_end().to_string());
    }

    Ok(paragraphs.join("\n"))
}

fn malformed(error: impl ToString) -> ExtractionError {
    ExtractionError::Malformed {
        format: DocumentFormat::Docx,
        reason: error.to_string(),
    }
}
