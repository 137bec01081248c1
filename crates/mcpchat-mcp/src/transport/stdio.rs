//! Stdio transport: a child process speaking newline-delimited JSON-RPC.

use super::{PendingRequests, route_incoming};
use crate::jsonrpc::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};
use mcpchat_types::McpError;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

/// How long a server gets to exit after its stdin closes.
const GRACEFUL_EXIT: Duration = Duration::from_secs(5);

/// Async stdio transport for a server subprocess.
pub struct StdioTransport {
    write_tx: mpsc::Sender<String>,
    pending: PendingRequests,
    reader_handle: JoinHandle<()>,
    writer_handle: JoinHandle<()>,
    child: Mutex<Child>,
    timeout: Option<Duration>,
}

impl StdioTransport {
    /// Spawn `command args...` and start the background reader/writer tasks.
    pub fn spawn(
        command: &str,
        args: &[String],
        timeout: Option<Duration>,
    ) -> Result<Self, McpError> {
        let mut child = Command::new(command)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| McpError::SpawnFailed {
                command: command.to_string(),
                source: e,
            })?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            return Err(McpError::Protocol(format!(
                "'{command}' started without piped stdio"
            )));
        };

        let (write_tx, mut write_rx) = mpsc::channel::<String>(64);
        let writer_handle = tokio::spawn(async move {
            let mut stdin = stdin;
            while let Some(mut msg) = write_rx.recv().await {
                msg.push('\n');
                if stdin.write_all(msg.as_bytes()).await.is_err() || stdin.flush().await.is_err()
                {
                    break;
                }
            }
        });

        let pending = PendingRequests::default();
        let reader_pending = pending.clone();
        // Weak, so dropping the transport's sender still closes stdin.
        let reply_tx = write_tx.downgrade();
        let reader_handle = tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if line.trim().is_empty() {
                    continue;
                }
                let Some(reply) = route_incoming(&line, &reader_pending).await else {
                    continue;
                };
                if let Some(tx) = reply_tx.upgrade() {
                    let _ = tx.send(reply).await;
                }
            }
            tracing::debug!("MCP server stdout closed");
            reader_pending.close().await;
        });

        Ok(Self {
            write_tx,
            pending,
            reader_handle,
            writer_handle,
            child: Mutex::new(child),
            timeout,
        })
    }

    pub async fn send_request(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<JsonRpcResponse, McpError> {
        let (id, rx) = self.pending.register().await?;
        let serialized = serde_json::to_string(&JsonRpcRequest::new(id, method, params))?;
        tracing::debug!("MCP request #{id}: {method}");

        if self.write_tx.send(serialized).await.is_err() {
            self.pending.cancel(id).await;
            return Err(McpError::Protocol("Writer channel closed".to_string()));
        }

        self.pending.wait(id, rx, method, self.timeout).await
    }

    pub async fn send_notification(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<(), McpError> {
        let serialized = serde_json::to_string(&JsonRpcNotification::new(method, params))?;
        self.write_tx
            .send(serialized)
            .await
            .map_err(|_| McpError::Protocol("Writer channel closed".to_string()))
    }

    /// Close stdin, give the child time to exit, then kill it.
    pub async fn shutdown(self) {
        drop(self.write_tx);
        let mut child = self.child.into_inner();

        if tokio::time::timeout(GRACEFUL_EXIT, child.wait())
            .await
            .is_err()
        {
            tracing::debug!("MCP server did not exit in time, killing it");
            let _ = child.kill().await;
        }

        self.pending.close().await;
        self.reader_handle.abort();
        self.writer_handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn spawn_and_shutdown() {
        let transport = StdioTransport::spawn("cat", &[], None).unwrap();
        transport.shutdown().await;
    }

    #[tokio::test]
    async fn spawn_nonexistent_command_fails() {
        match StdioTransport::spawn("this_command_does_not_exist_xyz123", &[], None) {
            Err(McpError::SpawnFailed { command, .. }) => {
                assert_eq!(command, "this_command_does_not_exist_xyz123");
            }
            Err(other) => panic!("Expected SpawnFailed, got: {other:?}"),
            Ok(_) => panic!("Expected error, got Ok"),
        }
    }

    #[tokio::test]
    async fn request_response_roundtrip() {
        // Answers every line with a result carrying the request id.
        let script = r#"while IFS= read -r line; do id=$(printf '%s' "$line" | sed -n 's/.*"id":\([0-9]*\).*/\1/p'); echo "{\"jsonrpc\":\"2.0\",\"id\":$id,\"result\":{\"ok\":true}}"; done"#;
        let Ok(transport) = StdioTransport::spawn(
            "bash",
            &["-c".to_string(), script.to_string()],
            Some(Duration::from_secs(5)),
        ) else {
            return;
        };

        let resp = transport
            .send_request("ping", Some(serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(resp.id, Some(1));
        assert_eq!(resp.result.unwrap()["ok"], true);

        transport.shutdown().await;
    }

    #[tokio::test]
    async fn server_ping_is_answered_before_response() {
        // The server pings first, reusing our id, and only answers the
        // request once it has seen the empty ping result.
        let script = r#"IFS= read -r request; echo '{"jsonrpc":"2.0","id":1,"method":"ping"}'; IFS= read -r reply; case "$reply" in *'"result":{}'*) echo '{"jsonrpc":"2.0","id":1,"result":{"ok":true}}';; *) echo '{"jsonrpc":"2.0","id":1,"result":{"ok":false}}';; esac; cat >/dev/null"#;
        let Ok(transport) = StdioTransport::spawn(
            "bash",
            &["-c".to_string(), script.to_string()],
            Some(Duration::from_secs(5)),
        ) else {
            return;
        };

        let resp = transport.send_request("tools/list", None).await.unwrap();
        assert_eq!(resp.id, Some(1));
        assert_eq!(resp.result.unwrap()["ok"], true);

        transport.shutdown().await;
    }

    #[tokio::test]
    async fn notification_does_not_block() {
        let transport = StdioTransport::spawn("cat", &[], None).unwrap();
        transport
            .send_notification("notifications/initialized", None)
            .await
            .unwrap();
        transport.shutdown().await;
    }

    #[tokio::test]
    async fn timeout_fires_on_unresponsive_server() {
        let transport = StdioTransport::spawn(
            "sleep",
            &["10".to_string()],
            Some(Duration::from_millis(100)),
        )
        .unwrap();

        match transport.send_request("tools/list", None).await {
            Err(McpError::Timeout { timeout_ms, .. }) => assert_eq!(timeout_ms, 100),
            other => panic!("Expected Timeout, got: {other:?}"),
        }

        transport.shutdown().await;
    }

    #[tokio::test]
    async fn exited_server_fails_pending_request() {
        let transport = StdioTransport::spawn("true", &[], None).unwrap();
        // Give the reader a moment to observe EOF.
        tokio::time::sleep(Duration::from_millis(100)).await;
        let result = transport.send_request("tools/list", None).await;
        assert!(matches!(result, Err(McpError::Protocol(_))));
        transport.shutdown().await;
    }
}
