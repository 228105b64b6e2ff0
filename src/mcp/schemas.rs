//! JSON schema builders for MCP tools.

use schemars::JsonSchema;
use serde_json::{Map, Value};

/// Build the schema describing the `summarize` tool input.
pub(crate) fn summarize_input_schema(max_summary_chars: usize) -> Map<String, Value> {
    let mut properties = Map::new();
    properties.insert(
        "document_content".into(),
        string_schema(&format!(
            "Plain text of the document; anything beyond {max_summary_chars} characters is truncated before summarization"
        )),
    );

    finalize_object_schema(properties, &["document_content"])
}

/// Build the schema describing the `ask` tool input.
pub(crate) fn ask_input_schema() -> Map<String, Value> {
    let mut properties = Map::new();
    properties.insert(
        "document_content".into(),
        string_schema("Document summary returned by `summarize`; answers are grounded in it only"),
    );
    properties.insert(
        "user_question".into(),
        string_schema("Question about the document"),
    );

    finalize_object_schema(properties, &["document_content", "user_question"])
}

/// Schema for tools that take no arguments.
pub(crate) fn empty_object_schema() -> Map<String, Value> {
    finalize_object_schema(Map::new(), &[])
}

/// Derive an output schema from a structured result type.
pub(crate) fn output_schema<T: JsonSchema>() -> Map<String, Value> {
    match serde_json::to_value(schemars::schema_for!(T)) {
        Ok(Value::Object(schema)) => schema,
        Ok(_) | Err(_) => empty_object_schema(),
    }
}

fn string_schema(description: &str) -> Value {
    let mut schema = Map::new();
    schema.insert("type".into(), Value::String("string".into()));
    schema.insert("description".into(), Value::String(description.into()));
    Value::Object(schema)
}

fn finalize_object_schema(properties: Map<String, Value>, required: &[&str]) -> Map<String, Value> {
    let mut schema = Map::new();
    schema.insert("type".into(), Value::String("object".into()));
    schema.insert("properties".into(), Value::Object(properties));
    if !required.is_empty() {
        schema.insert(
            "required".into(),
            Value::Array(
                required
                    .iter()
                    .map(|&key| Value::String(key.into()))
                    .collect(),
            ),
        );
    }
    schema.insert("additionalProperties".into(), Value::Bool(false));
    schema
}
