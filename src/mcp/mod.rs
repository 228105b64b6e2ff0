//! Model Context Protocol (MCP) integration for the document navigator.
//!
//! Agent hosts reach the same pipeline as the HTTP server over stdio:
//!
//! - Tools: `summarize`, `ask`, and `metrics`.
//! - Resources: `mcp://usage` (recommended flow) and `mcp://settings` (effective budget and models).
//!
//! MCP calls are stateless; hosts keep the summary returned by `summarize` and pass it to `ask`.

mod format;
pub mod handlers;
mod registry;
mod schemas;
mod server;

pub use server::DocNavMcpServer;
