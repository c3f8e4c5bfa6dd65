//! `server` module: MCP stdio request loop and tool dispatch.
//!
//! Speaks JSON-RPC 2.0, one message per line, over stdin/stdout. Exactly one
//! tool is registered: `upload_csv_to_snowflake`, taking no arguments and
//! returning the serialized [`UploadResult`]. Diagnostics go to stderr via
//! `tracing`; stdout carries only protocol frames.
//!
//! The upload procedure itself never produces a protocol-level fault: tool
//! execution failures travel inside the tool result (`isError` plus the
//! structured error payload), so callers always receive a well-formed result.
//!
//! Requests are handled strictly in arrival order; each `tools/call` opens
//! and closes its own warehouse session.

use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{error, info, warn};

use crate::config::Settings;
use crate::contract::WarehouseConnector;
use crate::upload::run_upload;

pub const SERVER_NAME: &str = "snowload";
pub const PROTOCOL_VERSION: &str = "2024-11-05";
pub const TOOL_NAME: &str = "upload_csv_to_snowflake";

const PARSE_ERROR: i64 = -32700;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;

#[derive(Debug, Deserialize)]
struct Request {
    #[serde(default)]
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Value,
}

/// The MCP server: read-only settings plus the injected warehouse connector.
pub struct McpServer {
    settings: Settings,
    connector: Arc<dyn WarehouseConnector>,
}

impl McpServer {
    pub fn new(settings: Settings, connector: Arc<dyn WarehouseConnector>) -> Self {
        McpServer {
            settings,
            connector,
        }
    }

    /// Serves on stdin/stdout until EOF.
    pub async fn run(&self) -> anyhow::Result<()> {
        info!(server = SERVER_NAME, "MCP server listening on stdio");
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Serves the request loop over arbitrary byte streams (used by tests).
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> anyhow::Result<()>
    where
        R: AsyncRead + Unpin + Send,
        W: AsyncWrite + Unpin + Send,
    {
        let mut lines = BufReader::new(reader).lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            if let Some(response) = self.handle_line(&line).await {
                let mut frame = serde_json::to_string(&response)?;
                frame.push('\n');
                writer.write_all(frame.as_bytes()).await?;
                writer.flush().await?;
            }
        }
        info!("stdin closed; shutting down");
        Ok(())
    }

    /// Dispatches one frame. Returns `None` for notifications.
    async fn handle_line(&self, line: &str) -> Option<Value> {
        let request: Request = match serde_json::from_str(line) {
            Ok(req) => req,
            Err(err) => {
                warn!(error = %err, "Discarding unparseable frame");
                return Some(error_response(Value::Null, PARSE_ERROR, "parse error"));
            }
        };

        // Notifications carry no id and get no reply.
        let id = match request.id {
            Some(id) => id,
            None => {
                info!(method = %request.method, "Notification received");
                return None;
            }
        };

        let result = match request.method.as_str() {
            "initialize" => json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "tools": {} },
                "serverInfo": {
                    "name": SERVER_NAME,
                    "version": env!("CARGO_PKG_VERSION"),
                },
            }),
            "ping" => json!({}),
            "tools/list" => json!({ "tools": [tool_descriptor()] }),
            "tools/call" => return Some(self.handle_tool_call(id, &request.params).await),
            other => {
                warn!(method = other, "Unknown method");
                return Some(error_response(
                    id,
                    METHOD_NOT_FOUND,
                    &format!("method not found: {other}"),
                ));
            }
        };
        Some(success_response(id, result))
    }

    async fn handle_tool_call(&self, id: Value, params: &Value) -> Value {
        let tool = params.get("name").and_then(Value::as_str).unwrap_or("");
        if tool != TOOL_NAME {
            error!(tool, "Call for unknown tool");
            return error_response(id, INVALID_PARAMS, &format!("unknown tool: {tool}"));
        }

        info!(tool, "Running tool");
        let outcome = run_upload(&self.settings, self.connector.as_ref()).await;
        let is_error = outcome.is_error();
        let payload = match serde_json::to_value(&outcome) {
            Ok(value) => value,
            Err(err) => {
                // Unreachable in practice; keep the caller's contract anyway.
                error!(error = %err, "Failed to serialize upload result");
                json!({ "status": "error", "message": "internal serialization failure" })
            }
        };

        success_response(
            id,
            json!({
                "content": [{ "type": "text", "text": payload.to_string() }],
                "structuredContent": payload,
                "isError": is_error,
            }),
        )
    }
}

fn tool_descriptor() -> Value {
    json!({
        "name": TOOL_NAME,
        "description": "Uploads the configured CSV file to a Snowflake table, \
normalizing column names to uppercase. Returns upload status and row counts.",
        "inputSchema": {
            "type": "object",
            "properties": {},
            "required": [],
        },
    })
}

fn success_response(id: Value, result: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

fn error_response(id: Value, code: i64, message: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": code, "message": message },
    })
}
