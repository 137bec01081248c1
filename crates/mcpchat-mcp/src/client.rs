//! MCP protocol session over one transport.
//!
//! Handles the handshake (`initialize` + `notifications/initialized`), tool
//! discovery (`tools/list`, following pagination cursors) and tool invocation
//! (`tools/call`).

use crate::transport::Transport;
use mcpchat_types::{McpError, ToolDescriptor};
use serde::Deserialize;

/// MCP protocol version we speak.
const PROTOCOL_VERSION: &str = "2024-11-05";

/// Upper bound on `tools/list` pages, in case a server keeps handing out cursors.
const MAX_TOOL_PAGES: usize = 64;

/// Raw outcome of `tools/call`, before normalization.
#[derive(Debug, Clone, Deserialize)]
pub struct CallToolResponse {
    #[serde(default)]
    pub content: serde_json::Value,
    #[serde(default, rename = "isError")]
    pub is_error: bool,
}

#[derive(Deserialize)]
struct ToolsListResult {
    tools: Vec<ToolEntry>,
    #[serde(default, rename = "nextCursor")]
    next_cursor: Option<String>,
}

#[derive(Deserialize)]
struct ToolEntry {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default = "default_schema", rename = "inputSchema")]
    input_schema: serde_json::Value,
}

fn default_schema() -> serde_json::Value {
    serde_json::json!({"type": "object", "properties": {}})
}

impl From<ToolEntry> for ToolDescriptor {
    fn from(entry: ToolEntry) -> Self {
        ToolDescriptor {
            name: entry.name,
            description: entry.description,
            parameters: entry.input_schema,
        }
    }
}

/// An initialized session with one MCP server.
pub struct McpClient {
    server: String,
    transport: Transport,
}

impl McpClient {
    /// Run the handshake over `transport`. The transport is shut down if the
    /// handshake fails.
    pub(crate) async fn initialize(server: String, transport: Transport) -> Result<Self, McpError> {
        if let Err(e) = handshake(&server, &transport).await {
            transport.shutdown().await;
            return Err(e);
        }
        Ok(Self { server, transport })
    }

    /// Fetch the complete tool catalog.
    pub async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, McpError> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;

        for _ in 0..MAX_TOOL_PAGES {
            let params = cursor
                .take()
                .map(|c| serde_json::json!({ "cursor": c }));
            let result = self
                .transport
                .send_request("tools/list", params)
                .await?
                .into_result(&self.server, "tools/list")?;

            let page: ToolsListResult = serde_json::from_value(result).map_err(|e| {
                McpError::Protocol(format!("Failed to parse tools/list response: {e}"))
            })?;
            tools.extend(page.tools.into_iter().map(ToolDescriptor::from));

            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => return Ok(tools),
            }
        }

        tracing::warn!(
            "MCP server '{}' returned more than {MAX_TOOL_PAGES} tool pages, truncating",
            self.server
        );
        Ok(tools)
    }

    /// Invoke a tool with a JSON argument object.
    pub async fn call_tool(
        &self,
        tool_name: &str,
        arguments: serde_json::Value,
    ) -> Result<CallToolResponse, McpError> {
        let params = serde_json::json!({
            "name": tool_name,
            "arguments": arguments,
        });

        let result = self
            .transport
            .send_request("tools/call", Some(params))
            .await?
            .into_result(&self.server, "tools/call")?;

        serde_json::from_value(result)
            .map_err(|e| McpError::Protocol(format!("Failed to parse tools/call result: {e}")))
    }

    pub fn server_name(&self) -> &str {
        &self.server
    }

    pub async fn shutdown(self) {
        self.transport.shutdown().await;
    }
}

async fn handshake(server: &str, transport: &Transport) -> Result<(), McpError> {
    let init_params = serde_json::json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {},
        "clientInfo": {
            "name": "mcpchat",
            "version": env!("CARGO_PKG_VERSION")
        }
    });

    let info = transport
        .send_request("initialize", Some(init_params))
        .await?
        .into_result(server, "initialize")?;

    if let Some(version) = info.get("protocolVersion").and_then(|v| v.as_str()) {
        if version != PROTOCOL_VERSION {
            tracing::debug!("MCP server '{server}' negotiated protocol {version}");
        }
    }

    transport
        .send_notification("notifications/initialized", None)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_entry_becomes_descriptor() {
        let json = r#"{
            "name": "get_weather",
            "description": "Current weather for a city",
            "inputSchema": {
                "type": "object",
                "properties": {"city": {"type": "string"}},
                "required": ["city"]
            }
        }"#;
        let entry: ToolEntry = serde_json::from_str(json).unwrap();
        let descriptor = ToolDescriptor::from(entry);
        assert_eq!(descriptor.name, "get_weather");
        assert_eq!(
            descriptor.description.as_deref(),
            Some("Current weather for a city")
        );
        assert_eq!(descriptor.parameters["required"][0], "city");
    }

    #[test]
    fn missing_schema_defaults_to_empty_object() {
        let entry: ToolEntry = serde_json::from_str(r#"{"name": "ping"}"#).unwrap();
        let descriptor = ToolDescriptor::from(entry);
        assert!(descriptor.description.is_none());
        assert_eq!(descriptor.parameters["type"], "object");
    }

    #[test]
    fn tools_list_with_cursor() {
        let json = r#"{"tools": [{"name": "a"}, {"name": "b"}], "nextCursor": "page-2"}"#;
        let page: ToolsListResult = serde_json::from_str(json).unwrap();
        assert_eq!(page.tools.len(), 2);
        assert_eq!(page.next_cursor.as_deref(), Some("page-2"));
    }

    #[test]
    fn call_result_keeps_raw_content() {
        let json = r#"{"content": [{"type": "text", "text": "18C"}], "isError": false}"#;
        let result: CallToolResponse = serde_json::from_str(json).unwrap();
        assert!(result.content.is_array());
        assert!(!result.is_error);
    }

    #[test]
    fn call_result_without_content_is_null() {
        let result: CallToolResponse = serde_json::from_str(r#"{"isError": true}"#).unwrap();
        assert!(result.content.is_null());
        assert!(result.is_error);
    }
}
