//! MCP API module.
//!
//! JSON-RPC 2.0 over HTTP: one message per `POST /mcp` body.

mod resources;
mod tools;
mod view;
mod widget;

pub use tools::Tool;
pub use widget::Widget;

use std::sync::atomic::{AtomicU64, Ordering};

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::errors::{AppError, ErrorResponse};
use crate::AppState;

/// Protocol version answered when the client does not ask for one.
pub const DEFAULT_PROTOCOL_VERSION: &str = "2025-03-26";
pub const SERVER_NAME: &str = "todo-mcp-server";

/// JSON-RPC error codes.
pub mod rpc_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
    pub const RESOURCE_NOT_FOUND: i64 = -32002;
}

/// JSON-RPC request. A missing `id` makes it a notification.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// JSON-RPC response
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// JSON-RPC error
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Map an application error raised while reading a resource.
    fn from_resource_error(error: &AppError, request_id: &str) -> Self {
        let code = match error {
            AppError::NotFound { .. } => rpc_codes::RESOURCE_NOT_FOUND,
            _ => rpc_codes::INTERNAL_ERROR,
        };
        Self {
            code,
            message: error.message(),
            data: serde_json::to_value(ErrorResponse::new(error, Some(request_id))).ok(),
        }
    }
}

/// Generator for `req_<unix-seconds>_<counter>` identifiers.
#[derive(Debug, Default)]
pub struct RequestIds {
    counter: AtomicU64,
}

impl RequestIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("req_{}_{}", Utc::now().timestamp(), n)
    }
}

#[derive(Debug, Deserialize)]
struct ToolCallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Deserialize)]
struct ReadResourceParams {
    uri: String,
}

/// `POST /mcp`
pub async fn handle_rpc(State(state): State<AppState>, body: Bytes) -> Response {
    let raw: Value = match serde_json::from_slice(&body) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!("Rejected unparseable JSON-RPC body: {}", e);
            let error = JsonRpcError::new(rpc_codes::PARSE_ERROR, format!("Parse error: {}", e));
            return Json(JsonRpcResponse::failure(Value::Null, error)).into_response();
        }
    };

    let request: JsonRpcRequest = match serde_json::from_value(raw) {
        Ok(request) => request,
        Err(e) => {
            let error = JsonRpcError::new(
                rpc_codes::INVALID_REQUEST,
                format!("Invalid request: {}", e),
            );
            return Json(JsonRpcResponse::failure(Value::Null, error)).into_response();
        }
    };

    if request.jsonrpc != "2.0" {
        tracing::debug!(version = %request.jsonrpc, "Unexpected JSON-RPC version");
    }

    let Some(id) = request.id else {
        tracing::debug!(method = %request.method, "Received notification");
        return StatusCode::ACCEPTED.into_response();
    };

    let response = match dispatch(&state, &request.method, request.params).await {
        Ok(result) => JsonRpcResponse::success(id, result),
        Err(error) => {
            tracing::debug!(
                method = %request.method,
                code = error.code,
                "Request failed: {}",
                error.message
            );
            JsonRpcResponse::failure(id, error)
        }
    };
    Json(response).into_response()
}

async fn dispatch(state: &AppState, method: &str, params: Value) -> Result<Value, JsonRpcError> {
    match method {
        "initialize" => Ok(initialize_result(&params)),
        "ping" => Ok(json!({})),
        "tools/list" => Ok(tools::list_tools(state)),
        "tools/call" => {
            let call: ToolCallParams = parse_params(params)?;
            let tool = Tool::from_name(&call.name).ok_or_else(|| {
                JsonRpcError::new(
                    rpc_codes::INVALID_PARAMS,
                    format!("Unknown tool: {}", call.name),
                )
            })?;
            Ok(tools::call_tool(state, tool, call.arguments).await)
        }
        "resources/list" => Ok(resources::list_resources(state)),
        "resources/templates/list" => Ok(resources::list_resource_templates()),
        "resources/read" => {
            let read: ReadResourceParams = parse_params(params)?;
            let request_id = state.request_ids.next();
            resources::read_resource(state, &read.uri).await.map_err(|e| {
                tracing::error!(
                    request_id = %request_id,
                    uri = %read.uri,
                    "Failed to read resource: {}",
                    e
                );
                JsonRpcError::from_resource_error(&e, &request_id)
            })
        }
        other => Err(JsonRpcError::new(
            rpc_codes::METHOD_NOT_FOUND,
            format!("Method not found: {}", other),
        )),
    }
}

fn parse_params<T: DeserializeOwned>(params: Value) -> Result<T, JsonRpcError> {
    let params = match params {
        Value::Null => Value::Object(Map::new()),
        other => other,
    };
    serde_json::from_value(params).map_err(|e| {
        JsonRpcError::new(rpc_codes::INVALID_PARAMS, format!("Invalid params: {}", e))
    })
}

fn initialize_result(params: &Value) -> Value {
    let protocol_version = params
        .get("protocolVersion")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_PROTOCOL_VERSION);

    json!({
        "protocolVersion": protocol_version,
        "capabilities": {
            "tools": { "listChanged": false },
            "resources": { "subscribe": false, "listChanged": false },
        },
        "serverInfo": {
            "name": SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION"),
        },
    })
}
