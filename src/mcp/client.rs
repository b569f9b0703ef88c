use serde_json::{json, Value};
use tracing::{debug, info};

use super::transport_sse::{ConnectionState, SseTransport, TransportOptions};
use super::types::{
    InitializeParams, InitializeResult, McpTool, McpToolCall, McpToolResult, ServerInfo, ToolListResponse,
    MCP_PROTOCOL_VERSION, METHOD_INITIALIZE, METHOD_INITIALIZED, METHOD_PING, METHOD_TOOLS_CALL,
    METHOD_TOOLS_LIST,
};
use crate::error::ToolError;

// MCP Protocol constants
const CLIENT_NAME: &str = "tool-sse-client";
const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Client session against one tool server.
pub struct McpClient {
    transport: SseTransport,
    server_info: ServerInfo,
}

impl McpClient {
    /// Connects and performs the initialize handshake. The connection is
    /// closed again if the handshake fails.
    pub async fn connect(url: &str, options: TransportOptions) -> Result<Self, ToolError> {
        let transport = SseTransport::connect(url, options).await?;

        match Self::initialize(&transport).await {
            Ok(init_result) => {
                info!(
                    server = %init_result.server_info.name,
                    version = %init_result.server_info.version,
                    session_id = transport.session_id().unwrap_or("-"),
                    "Connected to tool server"
                );
                Ok(Self {
                    transport,
                    server_info: init_result.server_info,
                })
            }
            Err(e) => {
                transport.close().await;
                Err(e)
            }
        }
    }

    async fn initialize(transport: &SseTransport) -> Result<InitializeResult, ToolError> {
        let init_params = InitializeParams {
            protocol_version: MCP_PROTOCOL_VERSION.to_string(),
            capabilities: json!({}),
            client_info: ServerInfo {
                name: CLIENT_NAME.to_string(),
                version: CLIENT_VERSION.to_string(),
            },
        };
        let params = serde_json::to_value(&init_params).map_err(|e| {
            ToolError::validation(format!("Failed to encode initialize params: {}", e))
        })?;

        let response = transport
            .send_request(METHOD_INITIALIZE, Some(params))
            .await?;
        let init_result: InitializeResult = decode(response, METHOD_INITIALIZE)?;

        transport.send_notification(METHOD_INITIALIZED).await?;
        Ok(init_result)
    }

    pub fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    pub fn session_id(&self) -> Option<&str> {
        self.transport.session_id()
    }

    pub fn state(&self) -> ConnectionState {
        self.transport.state()
    }

    pub async fn ping(&self) -> Result<(), ToolError> {
        self.transport.send_request(METHOD_PING, None).await?;
        Ok(())
    }

    pub async fn list_tools(&self) -> Result<Vec<McpTool>, ToolError> {
        let response = self.transport.send_request(METHOD_TOOLS_LIST, None).await?;
        let tool_list: ToolListResponse = decode(response, METHOD_TOOLS_LIST)?;
        debug!(count = tool_list.tools.len(), "Discovered tools");
        Ok(tool_list.tools)
    }

    pub async fn call_tool(&self, tool_call: &McpToolCall) -> Result<McpToolResult, ToolError> {
        let params = json!({
            "name": tool_call.name,
            "arguments": tool_call.arguments,
        });

        let response = self
            .transport
            .send_request(METHOD_TOOLS_CALL, Some(params))
            .await?;
        decode(response, METHOD_TOOLS_CALL)
    }

    pub async fn close(&self) {
        self.transport.close().await;
    }
}

fn decode<T: serde::de::DeserializeOwned>(value: Value, method: &str) -> Result<T, ToolError> {
    serde_json::from_value(value).map_err(|e| {
        ToolError::validation(format!("Malformed '{}' response: {}", method, e))
    })
}
