//! The chat client that ties the model to the tool server.

use mcpchat_mcp::{ConnectionConfig, ToolConnector};
use mcpchat_types::{
    ChatError, ChatOptions, McpError, Message, ModelInteractor, ToolChoice, ToolDescriptor,
};

/// Connection state of an [`McpChatClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Disconnected,
    Connected,
}

/// Orchestrates one MCP server and one model.
///
/// Each query is answered in isolation: no history is carried from one
/// `process_query` call to the next.
pub struct McpChatClient {
    connector: Box<dyn ToolConnector>,
    interactor: Box<dyn ModelInteractor>,
    state: ClientState,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl McpChatClient {
    pub fn new(connector: Box<dyn ToolConnector>, interactor: Box<dyn ModelInteractor>) -> Self {
        Self {
            connector,
            interactor,
            state: ClientState::Disconnected,
            temperature: None,
            max_tokens: None,
        }
    }

    /// Sampling options sent with the first model call of every turn.
    pub fn with_sampling(mut self, temperature: Option<f32>, max_tokens: Option<u32>) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    pub fn state(&self) -> ClientState {
        self.state
    }

    /// The tool catalog fetched at connect time.
    pub fn tools(&self) -> Result<&[ToolDescriptor], McpError> {
        match self.state {
            ClientState::Connected => self.connector.list_tools(),
            ClientState::Disconnected => Err(McpError::NotConnected),
        }
    }

    /// Connect to the server and cache its tools. On failure the client
    /// stays disconnected.
    pub async fn connect_to_server(&mut self, config: &ConnectionConfig) -> Result<(), ChatError> {
        self.state = ClientState::Disconnected;
        self.connector.connect(config).await?;

        let names: Vec<&str> = self
            .connector
            .list_tools()?
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        tracing::info!(
            "Connected to {config} via {} with tools: {}",
            self.interactor.name(),
            names.join(", ")
        );
        self.state = ClientState::Connected;
        Ok(())
    }

    /// Answer one query, running every tool call the model asks for.
    ///
    /// The answer is the model's text, one marker line per tool call, and the
    /// model's follow-up text after each tool result, joined with newlines.
    /// Tool calls run one at a time in the order the model listed them, and
    /// each follow-up model call sees every tool result produced so far.
    pub async fn process_query(&self, query: &str) -> Result<String, ChatError> {
        if self.state != ClientState::Connected {
            return Err(McpError::NotConnected.into());
        }
        let tools = self.connector.list_tools()?;

        let mut conversation = vec![Message::user(query)];
        let first_options = ChatOptions {
            tools: Some(tools.to_vec()),
            tool_choice: Some(ToolChoice::Auto),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        let follow_up_options = ChatOptions::default();

        let response = self
            .interactor
            .chat(&conversation, &first_options)
            .await?;

        let mut lines: Vec<String> = Vec::new();
        if let Some(text) = response.text() {
            lines.push(text.to_string());
        }

        for (index, call) in response.requested_tool_calls().iter().enumerate() {
            let name = &call.function.name;
            let arguments = call
                .parse_arguments()
                .map_err(|e| ChatError::InvalidToolArguments {
                    tool: name.clone(),
                    message: e.to_string(),
                })?;

            lines.push(format!("[called tool {name} with args {arguments}]"));
            tracing::debug!("Calling tool {name} ({})", call.id);

            let result = self.connector.call_tool(name, arguments).await?;

            // Only the first round repeats the model's original text.
            let content = if index == 0 {
                response.content.clone()
            } else {
                None
            };
            conversation.push(Message::assistant_tool_calls(content, vec![call.clone()]));
            conversation.push(Message::tool_result(&call.id, name, result.content));

            let follow_up = self
                .interactor
                .chat(&conversation, &follow_up_options)
                .await?;
            if !follow_up.requested_tool_calls().is_empty() {
                tracing::debug!("Ignoring tool calls in follow-up to {name}");
            }
            if let Some(text) = follow_up.text() {
                lines.push(text.to_string());
            }
        }

        Ok(lines.join("\n"))
    }

    /// Release the server connection. Safe to call repeatedly.
    pub async fn cleanup(&mut self) {
        self.connector.close().await;
        self.state = ClientState::Disconnected;
    }
}
