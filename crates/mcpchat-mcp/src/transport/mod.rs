//! Transports that carry JSON-RPC messages to and from the MCP server.
//!
//! Both transports run a background reader that routes responses to the
//! request awaiting them by JSON-RPC id. When the reader stops, every waiter
//! is released with an error instead of hanging.

mod sse;
mod stdio;

pub use sse::SseTransport;
pub use stdio::StdioTransport;

use crate::jsonrpc::{Incoming, JsonRpcMessage, JsonRpcReply, JsonRpcResponse};
use mcpchat_types::McpError;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, oneshot};

/// A live connection to the server. Closed set of kinds, matched exhaustively.
pub enum Transport {
    Stdio(StdioTransport),
    Sse(SseTransport),
}

impl Transport {
    /// Send a request and wait for its response.
    pub async fn send_request(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<JsonRpcResponse, McpError> {
        match self {
            Transport::Stdio(t) => t.send_request(method, params).await,
            Transport::Sse(t) => t.send_request(method, params).await,
        }
    }

    /// Send a notification; no response is expected.
    pub async fn send_notification(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<(), McpError> {
        match self {
            Transport::Stdio(t) => t.send_notification(method, params).await,
            Transport::Sse(t) => t.send_notification(method, params).await,
        }
    }

    pub async fn shutdown(self) {
        match self {
            Transport::Stdio(t) => t.shutdown().await,
            Transport::Sse(t) => t.shutdown().await,
        }
    }
}

/// Handle one message read from the server.
///
/// Responses go to their waiter. Server requests are never matched against
/// our own ids; the serialized reply to send back is returned instead.
/// Notifications are dropped.
pub(crate) async fn route_incoming(text: &str, pending: &PendingRequests) -> Option<String> {
    let message = match serde_json::from_str::<JsonRpcMessage>(text) {
        Ok(message) => message,
        Err(e) => {
            tracing::warn!("Failed to parse MCP message: {e}: {text}");
            return None;
        }
    };

    match message.classify() {
        Incoming::Response(resp) => {
            pending.dispatch(resp).await;
            None
        }
        Incoming::Request { id, method } => {
            tracing::debug!("MCP server request '{method}'");
            serde_json::to_string(&JsonRpcReply::to_server_request(id, &method))
                .map_err(|e| tracing::warn!("Failed to encode reply to '{method}': {e}"))
                .ok()
        }
        Incoming::Notification { method } => {
            tracing::debug!("Ignoring MCP notification '{method}'");
            None
        }
    }
}

#[derive(Default)]
struct PendingState {
    waiters: HashMap<u64, oneshot::Sender<JsonRpcResponse>>,
    closed: bool,
}

/// Request ids and the table of requests still waiting for a response.
#[derive(Clone, Default)]
pub(crate) struct PendingRequests {
    next_id: Arc<AtomicU64>,
    state: Arc<Mutex<PendingState>>,
}

impl PendingRequests {
    /// Allocate an id and register a waiter for it.
    pub async fn register(&self) -> Result<(u64, oneshot::Receiver<JsonRpcResponse>), McpError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (tx, rx) = oneshot::channel();
        let mut state = self.state.lock().await;
        if state.closed {
            return Err(McpError::Protocol("Transport is closed".to_string()));
        }
        state.waiters.insert(id, tx);
        Ok((id, rx))
    }

    /// Forget a waiter (request could not be sent or timed out).
    pub async fn cancel(&self, id: u64) {
        self.state.lock().await.waiters.remove(&id);
    }

    /// Route a response to its waiter. Unknown ids are dropped.
    pub async fn dispatch(&self, response: JsonRpcResponse) {
        let Some(id) = response.id else {
            tracing::debug!("Ignoring MCP message without id");
            return;
        };
        let waiter = self.state.lock().await.waiters.remove(&id);
        match waiter {
            Some(tx) => {
                let _ = tx.send(response);
            }
            None => tracing::warn!("Received MCP response for unknown request id {id}"),
        }
    }

    /// Release every waiter with an error and refuse new requests.
    pub async fn close(&self) {
        let mut state = self.state.lock().await;
        state.closed = true;
        state.waiters.clear();
    }

    /// Wait for the response to request `id`, honoring the optional timeout.
    pub async fn wait(
        &self,
        id: u64,
        rx: oneshot::Receiver<JsonRpcResponse>,
        method: &str,
        timeout: Option<Duration>,
    ) -> Result<JsonRpcResponse, McpError> {
        let dropped = || McpError::Protocol(format!("Connection closed while awaiting '{method}'"));
        let Some(limit) = timeout else {
            return rx.await.map_err(|_| dropped());
        };
        match tokio::time::timeout(limit, rx).await {
            Ok(Ok(resp)) => Ok(resp),
            Ok(Err(_)) => Err(dropped()),
            Err(_) => {
                self.cancel(id).await;
                Err(McpError::Timeout {
                    method: method.to_string(),
                    timeout_ms: limit.as_millis() as u64,
                })
            }
        }
    }
}
