//! Character budget applied to document text before summarization.

/// Appended whenever text is cut down to its budget.
pub const TRUNCATION_MARKER: &str = "\n\n[Content truncated due to length]";

/// Bound `text` to `max_chars` characters.
///
/// Text within budget is returned unchanged. Longer text keeps its first `max_chars`
/// characters followed by [`TRUNCATION_MARKER`]. Lengths count `char`s, so multi-byte
/// characters are never split. Re-truncating the result at the same bound is a no-op.
pub fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        None => text.to_string(),
        Some((cut, _)) => {
            let mut bounded = String::with_capacity(cut + TRUNCATION_MARKER.len());
            bounded.push_str(&text[..cut]);
            bounded.push_str(TRUNCATION_MARKER);
            bounded
        }
    }
}

/// Whether [`truncate`] would change `text`.
pub fn exceeds(text: &str, max_chars: usize) -> bool {
    text.char_indices().nth(max_chars).is_some()
}
