use crate::config::ClientConfig;
use crate::error::{ErrorKind, ToolError};
use crate::mcp::{ConnectionState, McpClient, McpTool, McpToolCall, McpToolResult, TransportOptions};
use crate::ui::{display_server_info, display_tool_error, display_tool_list, display_tool_result};
use tracing::warn;

#[derive(Debug)]
pub struct CallOutcome {
    pub name: String,
    pub result: Result<McpToolResult, ToolError>,
}

/// What one client run saw.
#[derive(Debug)]
pub struct DriverReport {
    pub tools: Vec<McpTool>,
    pub outcomes: Vec<CallOutcome>,
}

/// Connect, discover, run every configured call, disconnect.
///
/// Only a failure to connect or to list tools is returned as an error;
/// failed calls are printed and recorded in the report. The connection is
/// closed on every path out of here.
pub async fn run(config: &ClientConfig) -> Result<DriverReport, ToolError> {
    let options = TransportOptions {
        connect_timeout: config.connect_timeout,
        request_timeout: config.request_timeout,
    };

    let client = McpClient::connect(&config.url, options).await?;
    display_server_info(client.server_info(), client.session_id());

    let report = drive(&client, &config.calls).await;
    client.close().await;
    report
}

async fn drive(client: &McpClient, calls: &[McpToolCall]) -> Result<DriverReport, ToolError> {
    let tools = client.list_tools().await?;
    display_tool_list(&tools);

    let mut outcomes = Vec::with_capacity(calls.len());
    for call in calls {
        let result = client.call_tool(call).await;
        match &result {
            Ok(tool_result) => display_tool_result(&call.name, tool_result),
            Err(error) => display_tool_error(&call.name, error),
        }

        let connection_lost = matches!(&result, Err(e) if e.kind == ErrorKind::TransportError)
            || client.state() != ConnectionState::Connected;
        outcomes.push(CallOutcome {
            name: call.name.clone(),
            result,
        });

        if connection_lost {
            warn!("Connection lost, skipping remaining calls");
            break;
        }
    }

    Ok(DriverReport { tools, outcomes })
}
