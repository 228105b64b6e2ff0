//! Prompt templates for summarization and grounded question answering.

/// Structured-output field carrying a summary.
pub const SUMMARY_FIELD: &str = "summary";
/// Structured-output field carrying an answer.
pub const ANSWER_FIELD: &str = "answer";

/// Sentence the model is told to use when the summary lacks the answer.
pub const UNAVAILABLE_ANSWER: &str = "The document summary does not contain that information.";

/// Build the single-shot summarization prompt.
pub fn summarize_prompt(document_content: &str) -> String {
    let mut prompt = String::with_capacity(document_content.len() + 512);
    prompt.push_str(
        "You have been provided with the content of a document. Generate a concise and \
         informative summary of this content. Focus on the key points and main ideas. \
         If the content ends with a truncation note, summarize only what is present.\n\n",
    );
    prompt.push_str(&format!(
        "Respond with a JSON object containing a single string field named \"{SUMMARY_FIELD}\".\n\n"
    ));
    prompt.push_str("Document Content:\n");
    prompt.push_str(document_content);
    prompt
}

/// Build the question-answering prompt grounded in the document summary.
///
/// The model must answer only from `context` and must say the information is unavailable
/// instead of guessing.
pub fn ask_prompt(context: &str, question: &str) -> String {
    let mut prompt = String::with_capacity(context.len() + question.len() + 768);
    prompt.push_str(
        "You are a helpful AI assistant that answers questions about a document. You only \
         know the document through the summary below.\n\n",
    );
    prompt.push_str("Rules:\n");
    prompt.push_str("- Answer ONLY with information stated in the document summary.\n");
    prompt.push_str("- Do not use outside knowledge and do not speculate.\n");
    prompt.push_str(&format!(
        "- If the summary does not contain the answer, reply exactly: \"{UNAVAILABLE_ANSWER}\"\n"
    ));
    prompt.push_str("- Keep the answer concise and informative.\n\n");
    prompt.push_str(&format!(
        "Respond with a JSON object containing a single string field named \"{ANSWER_FIELD}\".\n\n"
    ));
    prompt.push_str("Document summary:\n");
    prompt.push_str(context.trim());
    prompt.push_str("\n\nUser question:\n");
    prompt.push_str(question.trim());
    prompt
}
