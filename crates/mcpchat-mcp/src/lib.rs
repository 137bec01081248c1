//! MCP (Model Context Protocol) connector for mcpchat.
//!
//! Talks JSON-RPC 2.0 to exactly one tool server, either a local script
//! spawned as a child process (newline-delimited messages over stdio) or a
//! remote endpoint reached over server-sent events. After the `initialize`
//! handshake the server's tools are listed and exposed as descriptors the
//! model API understands.

pub mod client;
pub mod config;
pub mod connector;
pub mod content;
pub mod jsonrpc;
mod sse;
mod transport;

pub use client::{CallToolResponse, McpClient};
pub use config::ConnectionConfig;
pub use connector::{McpConnector, ToolConnector};
pub use content::normalize_content;
pub use mcpchat_types::McpError;
