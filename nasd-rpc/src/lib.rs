//! JSON-RPC 2.0 tool dispatcher (§4.8): a machine-facing channel mirroring
//! a subset of HTTP capabilities as named tools, bridged onto the same
//! providers and cache the HTTP surface uses. Framing and the session loop
//! live with the WebSocket transport (`nasd-stream`'s connection handling
//! style, reused in the `nasd` binary); this crate owns only request
//! parsing, method dispatch, and error-code mapping.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use dashmap::DashMap;
use nasd_core::AppError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;

const PROTOCOL_VERSION: &str = "2.0";

pub type ToolFuture = Pin<Box<dyn Future<Output = Result<Value, AppError>> + Send>>;
pub type ToolFn = Arc<dyn Fn(Value) -> ToolFuture + Send + Sync>;

#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters_schema: Value,
}

#[derive(Clone)]
pub struct ToolRegistry {
    tools: Arc<DashMap<String, (ToolDefinition, ToolFn)>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Arc::new(DashMap::new()),
        }
    }

    pub fn register(&self, definition: ToolDefinition, handler: ToolFn) {
        self.tools.insert(definition.name.clone(), (definition, handler));
    }

    pub fn list(&self) -> Vec<ToolDefinition> {
        let mut items: Vec<ToolDefinition> = self.tools.iter().map(|e| e.value().0.clone()).collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        items
    }

    fn get(&self, name: &str) -> Option<ToolFn> {
        self.tools.get(name).map(|e| e.value().1.clone())
    }
}

#[derive(Debug, Deserialize)]
struct RawRequest {
    #[serde(default)]
    jsonrpc: Option<String>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    params: Option<Value>,
}

#[derive(Debug, Serialize)]
struct JsonRpcError {
    code: i64,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Outcome {
    Ok { result: Value },
    Err { error: JsonRpcError },
}

#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    jsonrpc: &'static str,
    id: Value,
    #[serde(flatten)]
    outcome: Outcome,
}

impl JsonRpcResponse {
    fn ok(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: PROTOCOL_VERSION,
            id,
            outcome: Outcome::Ok { result },
        }
    }

    fn err(id: Value, code: i64, message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            jsonrpc: PROTOCOL_VERSION,
            id,
            outcome: Outcome::Err {
                error: JsonRpcError {
                    code,
                    message: message.into(),
                    data,
                },
            },
        }
    }
}

#[derive(Serialize)]
struct InitializeResult {
    #[serde(rename = "protocolVersion")]
    protocol_version: &'static str,
    capabilities: Value,
    #[serde(rename = "serverInfo")]
    server_info: ServerInfo,
}

#[derive(Serialize)]
struct ServerInfo {
    name: String,
    version: String,
}

#[derive(Deserialize)]
struct ToolsCallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

/// Dispatches incoming JSON-RPC frames against the `initialize`,
/// `tools/list`, and `tools/call` methods (§4.8's closed set).
pub struct Dispatcher {
    registry: ToolRegistry,
    server_name: String,
    server_version: String,
}

impl Dispatcher {
    pub fn new(registry: ToolRegistry, server_name: impl Into<String>, server_version: impl Into<String>) -> Self {
        Self {
            registry,
            server_name: server_name.into(),
            server_version: server_version.into(),
        }
    }

    /// Handle one incoming frame. Returns `None` for notifications (no
    /// `id`), per JSON-RPC 2.0: notifications receive no response even if
    /// their processing failed.
    pub async fn handle(&self, raw: &str) -> Option<String> {
        let request: RawRequest = match serde_json::from_str(raw) {
            Ok(r) => r,
            Err(e) => {
                let response = JsonRpcResponse::err(Value::Null, PARSE_ERROR, e.to_string(), None);
                return Some(serde_json::to_string(&response).unwrap_or_default());
            }
        };

        let id = request.id.clone();
        let is_notification = id.is_none();
        let response_id = id.unwrap_or(Value::Null);

        let Some(method) = request.method else {
            return respond(is_notification, JsonRpcResponse::err(
                response_id,
                INVALID_REQUEST,
                "missing method",
                None,
            ));
        };
        if request.jsonrpc.as_deref() != Some(PROTOCOL_VERSION) {
            return respond(is_notification, JsonRpcResponse::err(
                response_id,
                INVALID_REQUEST,
                "unsupported or missing jsonrpc version, expected \"2.0\"",
                None,
            ));
        }

        let response = match method.as_str() {
            "initialize" => self.initialize(response_id),
            "tools/list" => self.tools_list(response_id),
            "tools/call" => self.tools_call(response_id, request.params).await,
            other => JsonRpcResponse::err(
                response_id,
                METHOD_NOT_FOUND,
                format!("unknown method: {other}"),
                None,
            ),
        };

        respond(is_notification, response)
    }

    fn initialize(&self, id: Value) -> JsonRpcResponse {
        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION,
            capabilities: serde_json::json!({"tools": {}}),
            server_info: ServerInfo {
                name: self.server_name.clone(),
                version: self.server_version.clone(),
            },
        };
        match serde_json::to_value(result) {
            Ok(value) => JsonRpcResponse::ok(id, value),
            Err(e) => JsonRpcResponse::err(id, INTERNAL_ERROR, e.to_string(), None),
        }
    }

    fn tools_list(&self, id: Value) -> JsonRpcResponse {
        let tools = self.registry.list();
        match serde_json::to_value(serde_json::json!({ "tools": tools })) {
            Ok(value) => JsonRpcResponse::ok(id, value),
            Err(e) => JsonRpcResponse::err(id, INTERNAL_ERROR, e.to_string(), None),
        }
    }

    async fn tools_call(&self, id: Value, params: Option<Value>) -> JsonRpcResponse {
        let Some(params) = params else {
            return JsonRpcResponse::err(id, INVALID_PARAMS, "tools/call requires params", None);
        };
        let call: ToolsCallParams = match serde_json::from_value(params) {
            Ok(c) => c,
            Err(e) => return JsonRpcResponse::err(id, INVALID_PARAMS, e.to_string(), None),
        };
        let Some(handler) = self.registry.get(&call.name) else {
            return JsonRpcResponse::err(
                id,
                INTERNAL_ERROR,
                "tool not found",
                Some(Value::String(format!("no tool registered with name `{}`", call.name))),
            );
        };
        match handler(call.arguments).await {
            Ok(result) => JsonRpcResponse::ok(id, result),
            Err(e) => JsonRpcResponse::err(
                id,
                INTERNAL_ERROR,
                "tool execution failed",
                Some(Value::String(e.message().to_string())),
            ),
        }
    }
}

fn respond(is_notification: bool, response: JsonRpcResponse) -> Option<String> {
    if is_notification {
        return None;
    }
    serde_json::to_string(&response).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo_registry() -> ToolRegistry {
        let registry = ToolRegistry::new();
        registry.register(
            ToolDefinition {
                name: "echo".to_string(),
                description: "echoes its input".to_string(),
                parameters_schema: serde_json::json!({"type": "object"}),
            },
            Arc::new(|args: Value| Box::pin(async move { Ok(args) })),
        );
        registry.register(
            ToolDefinition {
                name: "boom".to_string(),
                description: "always fails".to_string(),
                parameters_schema: serde_json::json!({"type": "object"}),
            },
            Arc::new(|_: Value| {
                Box::pin(async move { Err(AppError::ProviderUnavailable("simulated failure".into())) })
            }),
        );
        registry
    }

    #[tokio::test]
    async fn initialize_reports_protocol_version() {
        let dispatcher = Dispatcher::new(echo_registry(), "nasd", "0.1.0");
        let response = dispatcher
            .handle(r#"{"jsonrpc":"2.0","id":1,"method":"initialize"}"#)
            .await
            .unwrap();
        let value: Value = serde_json::from_str(&response).unwrap();
        assert_eq!(value["result"]["protocolVersion"], "2.0");
    }

    #[tokio::test]
    async fn tools_list_returns_registered_tools() {
        let dispatcher = Dispatcher::new(echo_registry(), "nasd", "0.1.0");
        let response = dispatcher
            .handle(r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#)
            .await
            .unwrap();
        let value: Value = serde_json::from_str(&response).unwrap();
        let tools = value["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 2);
    }

    #[tokio::test]
    async fn tools_call_invokes_the_named_tool() {
        let dispatcher = Dispatcher::new(echo_registry(), "nasd", "0.1.0");
        let response = dispatcher
            .handle(r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"echo","arguments":{"x":1}}}"#)
            .await
            .unwrap();
        let value: Value = serde_json::from_str(&response).unwrap();
        assert_eq!(value["result"]["x"], 1);
    }

    #[tokio::test]
    async fn tool_execution_failure_maps_to_internal_error() {
        let dispatcher = Dispatcher::new(echo_registry(), "nasd", "0.1.0");
        let response = dispatcher
            .handle(r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{"name":"boom"}}"#)
            .await
            .unwrap();
        let value: Value = serde_json::from_str(&response).unwrap();
        assert_eq!(value["error"]["code"], INTERNAL_ERROR);
    }

    #[tokio::test]
    async fn unknown_method_is_method_not_found() {
        let dispatcher = Dispatcher::new(echo_registry(), "nasd", "0.1.0");
        let response = dispatcher
            .handle(r#"{"jsonrpc":"2.0","id":5,"method":"bogus"}"#)
            .await
            .unwrap();
        let value: Value = serde_json::from_str(&response).unwrap();
        assert_eq!(value["error"]["code"], METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn malformed_json_is_parse_error() {
        let dispatcher = Dispatcher::new(echo_registry(), "nasd", "0.1.0");
        let response = dispatcher.handle("{not json").await.unwrap();
        let value: Value = serde_json::from_str(&response).unwrap();
        assert_eq!(value["error"]["code"], PARSE_ERROR);
    }

    #[tokio::test]
    async fn notification_without_id_gets_no_response() {
        let dispatcher = Dispatcher::new(echo_registry(), "nasd", "0.1.0");
        let response = dispatcher
            .handle(r#"{"jsonrpc":"2.0","method":"tools/list"}"#)
            .await;
        assert!(response.is_none());
    }
}
