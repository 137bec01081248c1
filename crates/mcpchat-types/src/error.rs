//! Error hierarchy for mcpchat.

use thiserror::Error;

/// Top-level error type for a chat session.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Model request failed: {0}")]
    Api(#[from] ApiError),

    #[error("MCP error: {0}")]
    Mcp(#[from] McpError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Model sent invalid arguments for tool '{tool}': {message}")]
    InvalidToolArguments { tool: String, message: String },
}

/// Errors from the chat-completion API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("No API credential supplied")]
    MissingCredential,

    #[error("Authentication failed: {message}")]
    Auth { message: String },

    #[error("Bad request: {message}")]
    BadRequest { message: String },

    #[error("Rate limited (retry after {retry_after_ms:?}ms)")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("Server error: {status} {message}")]
    Server { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Request timeout")]
    Timeout,
}

/// Errors from the MCP connector and its transports.
#[derive(Debug, Error)]
pub enum McpError {
    #[error("Unsupported server script '{path}': must be a .js or .py file")]
    UnsupportedScriptType { path: String },

    #[error("Invalid MCP endpoint '{endpoint}': {message}")]
    InvalidEndpoint { endpoint: String, message: String },

    #[error("Failed to connect to MCP server '{target}': {source}")]
    ConnectionFailed {
        target: String,
        source: Box<McpError>,
    },

    #[error("Not connected to an MCP server")]
    NotConnected,

    #[error("Tool '{tool}' failed: {message}")]
    ToolInvocation { tool: String, message: String },

    #[error("Failed to spawn MCP server '{command}': {source}")]
    SpawnFailed {
        command: String,
        source: std::io::Error,
    },

    #[error("JSON-RPC error from '{server}' (code {code}): {message}")]
    JsonRpc {
        server: String,
        code: i64,
        message: String,
    },

    #[error("MCP protocol error: {0}")]
    Protocol(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("MCP request '{method}' timed out after {timeout_ms}ms")]
    Timeout { method: String, timeout_ms: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors from configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing API credential: {hint}")]
    MissingCredential { hint: String },

    #[error("Config file parse error at {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}
