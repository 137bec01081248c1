//! JSON-RPC 2.0 framing for MCP.

use mcpchat_types::McpError;
use serde::{Deserialize, Serialize};

/// A JSON-RPC 2.0 request.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl JsonRpcRequest {
    pub fn new(id: u64, method: impl Into<String>, params: Option<serde_json::Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method: method.into(),
            params,
        }
    }
}

/// A JSON-RPC 2.0 response.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub id: Option<u64>,
    pub result: Option<serde_json::Value>,
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Unwrap the `result` member, turning an `error` member into
    /// [`McpError::JsonRpc`] tagged with `server`.
    pub fn into_result(self, server: &str, method: &str) -> Result<serde_json::Value, McpError> {
        if let Some(err) = self.error {
            return Err(McpError::JsonRpc {
                server: server.to_string(),
                code: err.code,
                message: err.message,
            });
        }
        self.result.ok_or_else(|| {
            McpError::Protocol(format!("{method} response has neither result nor error"))
        })
    }
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Standard "method not found" error code.
pub const METHOD_NOT_FOUND: i64 = -32601;

/// Anything the server may send: a response to one of our requests, a
/// request of its own, or a notification.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcMessage {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

/// A [`JsonRpcMessage`] sorted by kind.
#[derive(Debug, Clone)]
pub enum Incoming {
    Response(JsonRpcResponse),
    Request {
        id: serde_json::Value,
        method: String,
    },
    Notification {
        method: String,
    },
}

impl JsonRpcMessage {
    /// Messages with a `method` are server requests or notifications and
    /// never match a pending request.
    pub fn classify(self) -> Incoming {
        match (self.method, self.id) {
            (Some(method), Some(id)) => Incoming::Request { id, method },
            (Some(method), None) => Incoming::Notification { method },
            (None, id) => Incoming::Response(JsonRpcResponse {
                id: id.and_then(|v| v.as_u64()),
                result: self.result,
                error: self.error,
            }),
        }
    }
}

/// Our answer to a server-initiated request.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcReply {
    pub jsonrpc: &'static str,
    pub id: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcReply {
    /// `ping` gets an empty result; every other method is unsupported.
    pub fn to_server_request(id: serde_json::Value, method: &str) -> Self {
        let (result, error) = if method == "ping" {
            (Some(serde_json::json!({})), None)
        } else {
            (
                None,
                Some(JsonRpcError {
                    code: METHOD_NOT_FOUND,
                    message: format!("Method not found: {method}"),
                    data: None,
                }),
            )
        };
        Self {
            jsonrpc: "2.0",
            id,
            result,
            error,
        }
    }
}

/// A JSON-RPC 2.0 notification (no id, no response expected).
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: &'static str,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl JsonRpcNotification {
    pub fn new(method: impl Into<String>, params: Option<serde_json::Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            method: method.into(),
            params,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialize_tools_call_request() {
        let req = JsonRpcRequest::new(
            3,
            "tools/call",
            Some(serde_json::json!({"name": "get_weather", "arguments": {"city": "Paris"}})),
        );
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["jsonrpc"], "2.0");
        assert_eq!(json["id"], 3);
        assert_eq!(json["method"], "tools/call");
        assert_eq!(json["params"]["arguments"]["city"], "Paris");
    }

    #[test]
    fn request_without_params_omits_field() {
        let req = JsonRpcRequest::new(2, "tools/list", None);
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("params").is_none());
    }

    #[test]
    fn notification_has_no_id() {
        let notif = JsonRpcNotification::new("notifications/initialized", None);
        let json = serde_json::to_value(&notif).unwrap();
        assert_eq!(json["method"], "notifications/initialized");
        assert!(json.get("id").is_none());
        assert!(json.get("params").is_none());
    }

    #[test]
    fn into_result_returns_result_member() {
        let resp: JsonRpcResponse =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"result":{"tools":[]}}"#).unwrap();
        let value = resp.into_result("weather", "tools/list").unwrap();
        assert!(value["tools"].as_array().unwrap().is_empty());
    }

    #[test]
    fn into_result_maps_error_member() {
        let resp: JsonRpcResponse = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"Method not found"}}"#,
        )
        .unwrap();
        match resp.into_result("weather", "tools/list") {
            Err(McpError::JsonRpc {
                server,
                code,
                message,
            }) => {
                assert_eq!(server, "weather");
                assert_eq!(code, -32601);
                assert_eq!(message, "Method not found");
            }
            other => panic!("Expected JsonRpc error, got {other:?}"),
        }
    }

    #[test]
    fn into_result_rejects_empty_response() {
        let resp: JsonRpcResponse = serde_json::from_str(r#"{"jsonrpc":"2.0","id":1}"#).unwrap();
        assert!(matches!(
            resp.into_result("weather", "initialize"),
            Err(McpError::Protocol(_))
        ));
    }

    #[test]
    fn server_request_is_not_a_response() {
        let msg: JsonRpcMessage =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#).unwrap();
        match msg.classify() {
            Incoming::Request { id, method } => {
                assert_eq!(id, 1);
                assert_eq!(method, "ping");
            }
            other => panic!("Expected Request, got {other:?}"),
        }
    }

    #[test]
    fn notification_and_response_classify() {
        let note: JsonRpcMessage = serde_json::from_str(
            r#"{"jsonrpc":"2.0","method":"notifications/tools/list_changed"}"#,
        )
        .unwrap();
        assert!(matches!(note.classify(), Incoming::Notification { .. }));

        let resp: JsonRpcMessage =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":4,"result":{}}"#).unwrap();
        match resp.classify() {
            Incoming::Response(resp) => assert_eq!(resp.id, Some(4)),
            other => panic!("Expected Response, got {other:?}"),
        }
    }

    #[test]
    fn ping_gets_empty_result() {
        let reply = JsonRpcReply::to_server_request(serde_json::json!("srv-1"), "ping");
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["id"], "srv-1");
        assert_eq!(json["result"], serde_json::json!({}));
        assert!(json.get("error").is_none());
    }

    #[test]
    fn unknown_server_request_is_method_not_found() {
        let reply = JsonRpcReply::to_server_request(serde_json::json!(7), "sampling/createMessage");
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["error"]["code"], METHOD_NOT_FOUND);
        assert!(json.get("result").is_none());
        assert!(json["error"].get("data").is_none());
    }

    #[test]
    fn error_data_is_optional() {
        let json = r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32600,"message":"Invalid","data":"extra"}}"#;
        let resp: JsonRpcResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.error.unwrap().data.unwrap(), "extra");
    }
}
