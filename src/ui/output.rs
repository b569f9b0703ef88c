use colored::*;
use serde_json::Value;

use crate::error::ToolError;
use crate::mcp::types::{McpTool, McpToolResult, ServerInfo};

pub fn display_server_info(info: &ServerInfo, session_id: Option<&str>) {
    let session = session_id.map(|s| format!(" (session {})", s)).unwrap_or_default();
    println!(
        "{}",
        format!("Connected to {} v{}{}", info.name, info.version, session).green()
    );
}

/// Print the discovered tools with their parameters
pub fn display_tool_list(tools: &[McpTool]) {
    println!("{}", format!("Available tools: {}", tools.len()).cyan());
    for tool in tools {
        let description = tool.description.as_deref().unwrap_or("");
        println!("  - {} {}", tool.name.bold(), description.dimmed());

        let required = tool
            .input_schema
            .get("required")
            .and_then(|r| r.as_array())
            .cloned()
            .unwrap_or_default();
        if let Some(properties) = tool.input_schema.get("properties").and_then(|p| p.as_object()) {
            for (name, property) in properties {
                let kind = property.get("type").and_then(|t| t.as_str()).unwrap_or("any");
                let marker = if required.contains(&Value::String(name.clone())) {
                    ""
                } else {
                    "?"
                };
                println!("      {}{}: {}", name, marker, kind);
            }
        }
    }
}

/// Display a tool result in a boxed format
pub fn display_tool_result(name: &str, result: &McpToolResult) {
    let text: Vec<&str> = result.content.iter().map(|c| c.text.as_str()).collect();
    let body = if text.is_empty() {
        result.value.to_string()
    } else {
        text.join("\n")
    };
    print_block(&format!("TOOL: {}", name).cyan().to_string(), &body);
}

/// Display a structured tool error in a boxed format
pub fn display_tool_error(name: &str, error: &ToolError) {
    let header = format!("TOOL ERROR: {} [{}]", name, error.kind).red().to_string();
    print_block(&header, &error.message);
}

fn print_block(header: &str, body: &str) {
    let rule = "─".repeat(40).dimmed();
    println!("{}", rule);
    println!("{}", header);
    // Avoid double newline if body already ends with one
    if body.ends_with('\n') {
        print!("{}", body);
    } else {
        println!("{}", body);
    }
    println!("{}", rule);
}
