//! SSE transport: JSON-RPC over an HTTP event stream.
//!
//! The client opens a long-lived `GET` with `Accept: text/event-stream`. The
//! server's first `endpoint` event names the URL that requests are POSTed to;
//! responses come back as `message` events on the stream.

use super::{PendingRequests, route_incoming};
use crate::jsonrpc::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};
use crate::sse::SseParser;
use futures_util::{Stream, StreamExt};
use mcpchat_types::McpError;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use url::Url;

/// Async transport for a remote MCP server.
pub struct SseTransport {
    http: reqwest::Client,
    post_url: Url,
    pending: PendingRequests,
    reader_handle: JoinHandle<()>,
    timeout: Option<Duration>,
}

impl SseTransport {
    /// Open the event stream and wait for the server to announce its endpoint.
    pub async fn connect(stream_url: Url, timeout: Option<Duration>) -> Result<Self, McpError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| McpError::Http(e.to_string()))?;

        tracing::debug!("GET {} (event stream)", redact(&stream_url));
        let response = http
            .get(stream_url.clone())
            .header(ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|e| McpError::Http(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(McpError::Http(format!(
                "event stream request returned {status}"
            )));
        }

        let pending = PendingRequests::default();
        let (endpoint_tx, endpoint_rx) = oneshot::channel();
        let reader_handle = tokio::spawn(read_events(
            response.bytes_stream(),
            EventContext {
                http: http.clone(),
                stream_url,
                pending: pending.clone(),
            },
            endpoint_tx,
        ));

        let announced = match timeout {
            Some(limit) => match tokio::time::timeout(limit, endpoint_rx).await {
                Ok(announced) => announced,
                Err(_) => {
                    reader_handle.abort();
                    return Err(McpError::Timeout {
                        method: "endpoint".to_string(),
                        timeout_ms: limit.as_millis() as u64,
                    });
                }
            },
            None => endpoint_rx.await,
        };
        let post_url = match announced {
            Ok(Ok(url)) => url,
            Ok(Err(e)) => {
                reader_handle.abort();
                return Err(e);
            }
            Err(_) => {
                reader_handle.abort();
                return Err(McpError::Protocol(
                    "Event stream ended before the server announced its endpoint".to_string(),
                ));
            }
        };

        tracing::debug!("MCP messages endpoint: {}", redact(&post_url));
        Ok(Self {
            http,
            post_url,
            pending,
            reader_handle,
            timeout,
        })
    }

    pub async fn send_request(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<JsonRpcResponse, McpError> {
        let (id, rx) = self.pending.register().await?;
        let body = serde_json::to_string(&JsonRpcRequest::new(id, method, params))?;
        tracing::debug!("MCP request #{id}: {method}");

        if let Err(e) = post_json(&self.http, &self.post_url, body).await {
            self.pending.cancel(id).await;
            return Err(e);
        }

        self.pending.wait(id, rx, method, self.timeout).await
    }

    pub async fn send_notification(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<(), McpError> {
        let body = serde_json::to_string(&JsonRpcNotification::new(method, params))?;
        post_json(&self.http, &self.post_url, body).await
    }

    pub async fn shutdown(self) {
        self.reader_handle.abort();
        self.pending.close().await;
    }
}

async fn post_json(http: &reqwest::Client, url: &Url, body: String) -> Result<(), McpError> {
    let response = http
        .post(url.clone())
        .header(CONTENT_TYPE, "application/json")
        .body(body)
        .send()
        .await
        .map_err(|e| McpError::Http(e.without_url().to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(McpError::Http(format!("POST returned {status}: {text}")));
    }
    Ok(())
}

/// What the reader task needs besides the byte stream.
struct EventContext {
    http: reqwest::Client,
    stream_url: Url,
    pending: PendingRequests,
}

/// Resolve the `endpoint` event's data against the stream URL.
fn resolve_endpoint(stream_url: &Url, data: &str) -> Result<Url, McpError> {
    let endpoint = data.trim();
    if endpoint.is_empty() {
        return Err(McpError::Protocol(
            "Server announced an empty endpoint".to_string(),
        ));
    }
    stream_url
        .join(endpoint)
        .map_err(|e| McpError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })
}

/// Drain the event stream: announce the endpoint once, route every message
/// and answer server requests.
async fn read_events<S>(
    stream: S,
    ctx: EventContext,
    endpoint_tx: oneshot::Sender<Result<Url, McpError>>,
) where
    S: Stream<Item = reqwest::Result<bytes::Bytes>> + Send + 'static,
{
    let mut stream = Box::pin(stream);
    let mut endpoint_tx = Some(endpoint_tx);
    let mut post_url: Option<Url> = None;
    let mut parser = SseParser::new();

    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                tracing::warn!("MCP event stream failed: {}", e.without_url());
                break;
            }
        };

        for frame in parser.feed(&chunk) {
            match frame.event.as_str() {
                "endpoint" => match endpoint_tx.take() {
                    Some(tx) => {
                        let resolved = resolve_endpoint(&ctx.stream_url, &frame.data);
                        if let Ok(url) = &resolved {
                            post_url = Some(url.clone());
                        }
                        let _ = tx.send(resolved);
                    }
                    None => tracing::warn!("Ignoring repeated endpoint event"),
                },
                "message" => {
                    let Some(reply) = route_incoming(&frame.data, &ctx.pending).await else {
                        continue;
                    };
                    let Some(url) = post_url.clone() else {
                        tracing::warn!("Server request arrived before the endpoint event");
                        continue;
                    };
                    let http = ctx.http.clone();
                    tokio::spawn(async move {
                        if let Err(e) = post_json(&http, &url, reply).await {
                            tracing::warn!("Failed to answer MCP server request: {e}");
                        }
                    });
                }
                other => tracing::debug!("Ignoring SSE event '{other}'"),
            }
        }
    }

    tracing::debug!("MCP event stream closed");
    ctx.pending.close().await;
}

/// Strip the query string so credentials never reach the logs.
fn redact(url: &Url) -> String {
    let mut shown = url.clone();
    shown.set_query(None);
    shown.to_string()
}
