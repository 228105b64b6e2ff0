#![deny(missing_docs)]

//! Core library for the document navigator: PDF/DOCX text extraction, LLM summarization, and
//! question answering grounded in that summary.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// PDF and DOCX text extraction.
pub mod extraction;
/// Model backend abstraction and HTTP clients.
pub mod llm;
/// Structured logging and tracing setup.
pub mod logging;
/// Model Context Protocol server implementation.
pub mod mcp;
/// Pipeline counters.
pub mod metrics;
/// Extraction, truncation, summarization, and answering pipeline.
pub mod pipeline;
/// Chat session state and the caller driving the pipeline.
pub mod session;
