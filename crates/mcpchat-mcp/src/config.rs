//! Connection settings for the MCP server.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// How to reach the MCP server. Exactly one kind is active per connector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConnectionConfig {
    /// Spawn a `.js` or `.py` server script and talk over its stdio.
    LocalProcess { script_path: PathBuf },
    /// Connect to a server-sent-events endpoint.
    RemoteStream {
        endpoint: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        api_key: Option<String>,
    },
}

impl ConnectionConfig {
    /// Interpret a bare command-line argument.
    ///
    /// `http://` and `https://` arguments are remote endpoints; anything else
    /// is a local script path.
    pub fn from_arg(arg: &str) -> Self {
        if arg.starts_with("http://") || arg.starts_with("https://") {
            ConnectionConfig::RemoteStream {
                endpoint: arg.to_string(),
                api_key: None,
            }
        } else {
            ConnectionConfig::LocalProcess {
                script_path: PathBuf::from(arg),
            }
        }
    }

    /// Attach an API key to a remote endpoint. Local processes ignore it.
    pub fn with_api_key(self, key: Option<String>) -> Self {
        match (self, key) {
            (ConnectionConfig::RemoteStream { endpoint, .. }, Some(key)) => {
                ConnectionConfig::RemoteStream {
                    endpoint,
                    api_key: Some(key),
                }
            }
            (config, _) => config,
        }
    }
}

impl fmt::Display for ConnectionConfig {
    /// Human-readable target, never including the API key.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionConfig::LocalProcess { script_path } => {
                write!(f, "{}", script_path.display())
            }
            ConnectionConfig::RemoteStream { endpoint, .. } => f.write_str(endpoint),
        }
    }
}
