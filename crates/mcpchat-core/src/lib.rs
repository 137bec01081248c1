//! Chat orchestration: one user query in, one answer out, with tool calls
//! routed to the MCP connector in between.

mod client;

pub use client::{ClientState, McpChatClient};
