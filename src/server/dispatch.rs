use serde_json::{json, Value};
use std::any::Any;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::error::ToolError;
use crate::mcp::types::{
    InitializeParams, InitializeResult, JsonRpcRequest, JsonRpcResponse, McpToolCall, McpToolResult,
    ServerCapabilities, ServerInfo, ToolListResponse, ToolsCapability, MCP_PROTOCOL_VERSION,
    METHOD_INITIALIZE, METHOD_INITIALIZED, METHOD_PING, METHOD_TOOLS_CALL, METHOD_TOOLS_LIST,
};
use crate::tools::ToolRegistry;

pub const SERVER_NAME: &str = "tool-sse";

/// Protocol front of the registry. Built once at startup and shared
/// read-only by every session.
#[derive(Debug)]
pub struct ToolServer {
    registry: ToolRegistry,
    info: ServerInfo,
    tool_timeout: Duration,
}

impl ToolServer {
    pub fn new(registry: ToolRegistry, tool_timeout: Duration) -> Self {
        Self {
            registry,
            info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            tool_timeout,
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Answers one JSON-RPC message. Notifications get `None`.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let Some(id) = request.id.clone() else {
            if request.method == METHOD_INITIALIZED {
                debug!("Client finished initialization");
            } else {
                debug!(method = %request.method, "Ignoring notification");
            }
            return None;
        };

        debug!(id = %id, method = %request.method, "Handling request");
        let outcome = match request.method.as_str() {
            METHOD_INITIALIZE => self.initialize(request.params),
            METHOD_PING => Ok(json!({})),
            METHOD_TOOLS_LIST => to_result(self.list_tools()),
            METHOD_TOOLS_CALL => match serde_json::from_value::<McpToolCall>(request.params) {
                Ok(call) => self.call_tool(call).await.and_then(to_result),
                Err(e) => Err(ToolError::validation(format!(
                    "Invalid tools/call params: {}",
                    e
                ))),
            },
            other => Err(ToolError::not_found(format!("Method '{}' not found", other))),
        };

        Some(match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => JsonRpcResponse::failure(id, error),
        })
    }

    fn initialize(&self, params: Value) -> Result<Value, ToolError> {
        match serde_json::from_value::<InitializeParams>(params) {
            Ok(params) => info!(
                client = %params.client_info.name,
                version = %params.client_info.version,
                protocol = %params.protocol_version,
                "Client initializing"
            ),
            Err(e) => debug!("Initialize without client info: {}", e),
        }

        to_result(InitializeResult {
            protocol_version: MCP_PROTOCOL_VERSION.to_string(),
            server_info: self.info.clone(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: Some(false),
                }),
            },
        })
    }

    pub fn list_tools(&self) -> ToolListResponse {
        ToolListResponse {
            tools: self
                .registry
                .list()
                .into_iter()
                .map(|tool| tool.to_mcp_tool())
                .collect(),
        }
    }

    pub async fn call_tool(&self, call: McpToolCall) -> Result<McpToolResult, ToolError> {
        let tool = self
            .registry
            .lookup(&call.name)
            .ok_or_else(|| ToolError::not_found(format!("Tool '{}' not found", call.name)))?;

        tool.validate(&call.arguments).map_err(|errors| {
            ToolError::validation(format!(
                "Tool '{}' argument validation failed: {}",
                call.name, errors
            ))
        })?;

        // Own task so a panicking implementation cannot take the session down
        let mut handle = tokio::spawn(tool.invoke(call.arguments));
        match timeout(self.tool_timeout, &mut handle).await {
            Ok(Ok(Ok(value))) => {
                info!(tool = %call.name, "Tool call succeeded");
                Ok(McpToolResult::from_value(value))
            }
            Ok(Ok(Err(message))) => {
                warn!(tool = %call.name, error = %message, "Tool call failed");
                Err(ToolError::invocation(message))
            }
            Ok(Err(join_error)) => {
                let message = if join_error.is_panic() {
                    panic_message(join_error.into_panic())
                } else {
                    "Tool task was cancelled".to_string()
                };
                warn!(tool = %call.name, error = %message, "Tool call aborted");
                Err(ToolError::invocation(message))
            }
            Err(_) => {
                handle.abort();
                warn!(tool = %call.name, "Tool call timed out");
                Err(ToolError::cancelled(format!(
                    "Tool '{}' execution timed out after {} seconds",
                    call.name,
                    self.tool_timeout.as_secs()
                )))
            }
        }
    }
}

fn to_result<T: serde::Serialize>(value: T) -> Result<Value, ToolError> {
    serde_json::to_value(value)
        .map_err(|e| ToolError::invocation(format!("Failed to encode result: {}", e)))
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("Tool panicked: {}", msg)
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("Tool panicked: {}", msg)
    } else {
        "Tool panicked".to_string()
    }
}
