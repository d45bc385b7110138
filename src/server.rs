//! Line-delimited JSON-RPC 2.0 over stdin/stdout.

use crate::bridge::Bridge;
use crate::error::{BridgeError, Result};
use crate::tools::ToolCall;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const TOOL_ERROR: i64 = -32000;

#[derive(Debug, Deserialize)]
struct RpcRequest {
    #[serde(default)]
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ToolCallParams {
    name: String,
    #[serde(default)]
    arguments: Option<Value>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct RpcResponse {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

impl RpcResponse {
    fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    fn failure(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

/// Reads one request per line until EOF. Each request finishes before the
/// next line is read.
pub async fn serve<R, W>(bridge: &Bridge, reader: R, mut writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    info!("tool server listening on stdio");
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(response) = handle_line(bridge, line).await {
            let mut encoded = serde_json::to_string(&response)?;
            encoded.push('\n');
            writer.write_all(encoded.as_bytes()).await?;
            writer.flush().await?;
        }
    }
    info!("stdin closed, shutting down");
    Ok(())
}

pub async fn handle_line(bridge: &Bridge, line: &str) -> Option<RpcResponse> {
    let raw: Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(err) => {
            warn!("dropping unparsable request: {}", err);
            return Some(RpcResponse::failure(
                Value::Null,
                PARSE_ERROR,
                format!("parse error: {}", err),
            ));
        }
    };
    let id_hint = raw.get("id").cloned().unwrap_or(Value::Null);
    let request: RpcRequest = match serde_json::from_value(raw) {
        Ok(request) => request,
        Err(err) => {
            return Some(RpcResponse::failure(
                id_hint,
                INVALID_REQUEST,
                format!("invalid request: {}", err),
            ))
        }
    };

    debug!("received {} request", request.method);
    let outcome = dispatch(bridge, &request.method, request.params).await;
    // Notifications carry no id and get no reply.
    let id = request.id?;
    Some(match outcome {
        Ok(result) => RpcResponse::success(id, result),
        Err((code, message)) => RpcResponse::failure(id, code, message),
    })
}

async fn dispatch(
    bridge: &Bridge,
    method: &str,
    params: Option<Value>,
) -> std::result::Result<Value, (i64, String)> {
    match method {
        "ping" => Ok(json!({})),
        "tools/call" => {
            let params: ToolCallParams = params
                .ok_or_else(|| (INVALID_PARAMS, "missing params".to_string()))
                .and_then(|params| {
                    serde_json::from_value(params)
                        .map_err(|err| (INVALID_PARAMS, format!("invalid params: {}", err)))
                })?;
            let arguments = params.arguments.unwrap_or_else(|| json!({}));
            let call = ToolCall::parse(&params.name, arguments).map_err(rpc_error)?;
            let result = bridge.call(&call).await.map_err(rpc_error)?;
            serde_json::to_value(result).map_err(|err| (TOOL_ERROR, err.to_string()))
        }
        other => Err((METHOD_NOT_FOUND, format!("method not found: {}", other))),
    }
}

fn rpc_error(err: BridgeError) -> (i64, String) {
    let code = match &err {
        BridgeError::Protocol(_) => INVALID_PARAMS,
        _ => TOOL_ERROR,
    };
    (code, err.to_string())
}
