//! JSON-RPC 2.0 wire shapes (`spec.md` §4.1, §6: "JSON-RPC 2.0 over
//! stdin/stdout, one JSON object per line").
//!
//! The engine never invents its own numeric JSON-RPC error codes: every
//! error response carries the fixed `-32000` "server error" code and puts
//! the real taxonomy in `error.data`, which is a `keenbench_error::ErrorInfo`.

use keenbench_error::ErrorInfo;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON-RPC error code used for every engine-raised error. The taxonomy
/// clients actually branch on lives in [`JsonRpcErrorObject::data`].
pub const SERVER_ERROR_CODE: i64 = -32000;

/// JSON-RPC error code for a method name the dispatcher doesn't recognize.
pub const METHOD_NOT_FOUND_CODE: i64 = -32601;

/// JSON-RPC error code for a request that isn't well-formed JSON-RPC.
pub const INVALID_REQUEST_CODE: i64 = -32600;

/// An inbound request: UI → engine, always expects exactly one response.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcRequest {
    /// Correlation id, echoed back on the response. JSON-RPC permits
    /// string or number ids; this implementation's clients only ever send
    /// numbers, but strings round-trip through `Value` unchanged.
    pub id: Value,
    /// Method name, e.g. `"WorkbenchCreate"`.
    pub method: String,
    /// Method parameters, defaulting to `null` when omitted.
    #[serde(default)]
    pub params: Value,
}

/// An inbound notification: UI → engine, fire-and-forget, no response
/// expected. The v1 external interface names no UI-to-engine
/// notifications, but the wire format must still recognize one (an object
/// with `method` and no `id`) rather than erroring.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcNotificationIn {
    /// Method name.
    pub method: String,
    /// Parameters, defaulting to `null`.
    #[serde(default)]
    pub params: Value,
}

/// One parsed line from stdin.
#[derive(Debug, Clone)]
pub enum IncomingMessage {
    /// A request awaiting a response.
    Request(RpcRequest),
    /// A fire-and-forget notification.
    Notification(RpcNotificationIn),
}

/// Parse one JSON-RPC line: the presence of an `id` field distinguishes a
/// request from a notification, per the JSON-RPC 2.0 spec.
pub fn parse_incoming(line: &str) -> Result<IncomingMessage, serde_json::Error> {
    let value: Value = serde_json::from_str(line)?;
    if value.get("id").is_some() {
        Ok(IncomingMessage::Request(serde_json::from_value(value)?))
    } else {
        Ok(IncomingMessage::Notification(serde_json::from_value(value)?))
    }
}

/// An outbound response: engine → UI, correlated to exactly one request.
#[derive(Debug, Clone, Serialize)]
pub struct RpcResponse {
    jsonrpc: &'static str,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcErrorObject>,
}

impl RpcResponse {
    /// Build a success response carrying `result`.
    #[must_use]
    pub fn success(id: Value, result: Value) -> Self {
        Self { jsonrpc: "2.0", id, result: Some(result), error: None }
    }

    /// Build an error response from a structured [`ErrorInfo`].
    #[must_use]
    pub fn error(id: Value, info: ErrorInfo) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(JsonRpcErrorObject { code: SERVER_ERROR_CODE, message: info.message.clone(), data: info }),
        }
    }

    /// Build a transport-level error response (malformed request, unknown
    /// method) that has no [`ErrorInfo`] to carry.
    #[must_use]
    pub fn transport_error(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(JsonRpcErrorObject {
                code,
                message: message.into(),
                data: ErrorInfo {
                    error_code: keenbench_error::ErrorCode::ValidationFailed,
                    phase: None,
                    subphase: None,
                    message: String::new(),
                    actions: Vec::new(),
                    provider_id: None,
                    model_id: None,
                    scope_hash: None,
                },
            }),
        }
    }
}

/// The `error` member of an [`RpcResponse`].
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcErrorObject {
    /// Fixed JSON-RPC-level code; see [`SERVER_ERROR_CODE`].
    pub code: i64,
    /// Human-readable summary, duplicated from `data.message` for clients
    /// that only read the JSON-RPC-standard field.
    pub message: String,
    /// The engine's structured error taxonomy.
    pub data: ErrorInfo,
}

/// An outbound notification: engine → UI, no response expected, `id` omitted.
#[derive(Debug, Clone, Serialize)]
pub struct RpcNotificationOut {
    jsonrpc: &'static str,
    method: String,
    params: Value,
}

impl RpcNotificationOut {
    /// Build a notification for `method` with `params`.
    #[must_use]
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self { jsonrpc: "2.0", method: method.into(), params }
    }
}
