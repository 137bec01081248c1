//! McpConnector — owns the connection to one MCP server.

use crate::client::McpClient;
use crate::config::ConnectionConfig;
use crate::content::normalize_content;
use crate::transport::{SseTransport, StdioTransport, Transport};
use mcpchat_types::{McpError, ToolCallResult, ToolDescriptor};
use std::collections::HashSet;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::time::Duration;
use url::Url;

/// Tool discovery and invocation against one server.
///
/// Dyn-compatible so the chat client can be driven by a fake in tests.
pub trait ToolConnector: Send + Sync {
    /// Connect (replacing any existing connection) and fetch the catalog.
    fn connect<'a>(
        &'a mut self,
        config: &'a ConnectionConfig,
    ) -> Pin<Box<dyn Future<Output = Result<(), McpError>> + Send + 'a>>;

    /// The cached tool catalog.
    fn list_tools(&self) -> Result<&[ToolDescriptor], McpError>;

    /// Re-query the server's catalog and replace the cache.
    fn refresh_tools(
        &mut self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ToolDescriptor>, McpError>> + Send + '_>>;

    /// Invoke a tool and normalize its result.
    fn call_tool<'a>(
        &'a self,
        name: &'a str,
        arguments: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<ToolCallResult, McpError>> + Send + 'a>>;

    /// Release the connection. Safe to call any number of times.
    fn close(&mut self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}

struct Session {
    client: McpClient,
    tools: Vec<ToolDescriptor>,
}

/// Connector backed by a real MCP server.
#[derive(Default)]
pub struct McpConnector {
    session: Option<Session>,
    request_timeout: Option<Duration>,
}

impl McpConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound every request to the server. Without this, requests wait forever.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    pub async fn connect(&mut self, config: &ConnectionConfig) -> Result<(), McpError> {
        self.close().await;

        let target = config.to_string();
        let connection_failed = |source: McpError| McpError::ConnectionFailed {
            target: target.clone(),
            source: Box::new(source),
        };

        let transport = match config {
            ConnectionConfig::LocalProcess { script_path } => {
                let (command, args) = launch_command(script_path)?;
                tracing::debug!("Spawning MCP server: {command} {}", args.join(" "));
                StdioTransport::spawn(&command, &args, self.request_timeout)
                    .map(Transport::Stdio)
                    .map_err(connection_failed)?
            }
            ConnectionConfig::RemoteStream { endpoint, api_key } => {
                let url = remote_url(endpoint, api_key.as_deref())?;
                SseTransport::connect(url, self.request_timeout)
                    .await
                    .map(Transport::Sse)
                    .map_err(connection_failed)?
            }
        };

        let client = McpClient::initialize(target.clone(), transport)
            .await
            .map_err(connection_failed)?;

        let tools = match client.list_tools().await {
            Ok(tools) => unique_tools(tools),
            Err(e) => {
                client.shutdown().await;
                return Err(connection_failed(e));
            }
        };

        tracing::info!("MCP server '{}' connected with {} tools", target, tools.len());
        self.session = Some(Session { client, tools });
        Ok(())
    }

    pub fn list_tools(&self) -> Result<&[ToolDescriptor], McpError> {
        self.session
            .as_ref()
            .map(|s| s.tools.as_slice())
            .ok_or(McpError::NotConnected)
    }

    pub async fn refresh_tools(&mut self) -> Result<Vec<ToolDescriptor>, McpError> {
        let session = self.session.as_mut().ok_or(McpError::NotConnected)?;
        session.tools = unique_tools(session.client.list_tools().await?);
        tracing::debug!(
            "Refreshed tools from '{}': {}",
            session.client.server_name(),
            session.tools.len()
        );
        Ok(session.tools.clone())
    }

    pub async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<ToolCallResult, McpError> {
        let session = self.session.as_ref().ok_or(McpError::NotConnected)?;
        let invocation_error = |message: String| McpError::ToolInvocation {
            tool: name.to_string(),
            message,
        };

        let response = session
            .client
            .call_tool(name, arguments)
            .await
            .map_err(|e| invocation_error(e.to_string()))?;

        let content = normalize_content(&response.content);
        if response.is_error {
            return Err(invocation_error(if content.is_empty() {
                "server reported an error".to_string()
            } else {
                content
            }));
        }

        Ok(ToolCallResult { content })
    }

    pub async fn close(&mut self) {
        if let Some(session) = self.session.take() {
            tracing::debug!("Closing MCP server '{}'", session.client.server_name());
            session.client.shutdown().await;
        }
    }
}

impl ToolConnector for McpConnector {
    fn connect<'a>(
        &'a mut self,
        config: &'a ConnectionConfig,
    ) -> Pin<Box<dyn Future<Output = Result<(), McpError>> + Send + 'a>> {
        Box::pin(McpConnector::connect(self, config))
    }

    fn list_tools(&self) -> Result<&[ToolDescriptor], McpError> {
        McpConnector::list_tools(self)
    }

    fn refresh_tools(
        &mut self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ToolDescriptor>, McpError>> + Send + '_>> {
        Box::pin(McpConnector::refresh_tools(self))
    }

    fn call_tool<'a>(
        &'a self,
        name: &'a str,
        arguments: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<ToolCallResult, McpError>> + Send + 'a>> {
        Box::pin(McpConnector::call_tool(self, name, arguments))
    }

    fn close(&mut self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(McpConnector::close(self))
    }
}

/// Pick the interpreter for a server script: `node` for `.js`, Python for `.py`.
pub fn launch_command(script_path: &Path) -> Result<(String, Vec<String>), McpError> {
    let command = match script_path.extension().and_then(|e| e.to_str()) {
        Some("py") if cfg!(windows) => "python",
        Some("py") => "python3",
        Some("js") => "node",
        _ => {
            return Err(McpError::UnsupportedScriptType {
                path: script_path.display().to_string(),
            });
        }
    };
    Ok((
        command.to_string(),
        vec![script_path.to_string_lossy().into_owned()],
    ))
}

/// Parse a remote endpoint, appending the API key as a query parameter.
pub fn remote_url(endpoint: &str, api_key: Option<&str>) -> Result<Url, McpError> {
    let mut url = Url::parse(endpoint).map_err(|e| McpError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        message: e.to_string(),
    })?;
    if let Some(key) = api_key {
        url.query_pairs_mut().append_pair("api_key", key);
    }
    Ok(url)
}

/// Drop tools whose name was already seen; the first one wins.
fn unique_tools(tools: Vec<ToolDescriptor>) -> Vec<ToolDescriptor> {
    let mut seen = HashSet::new();
    tools
        .into_iter()
        .filter(|tool| {
            let fresh = seen.insert(tool.name.clone());
            if !fresh {
                tracing::warn!("Dropping duplicate MCP tool '{}'", tool.name);
            }
            fresh
        })
        .collect()
}
