use serde_json::Value;

use super::registry::ToolRegistry;
use super::schema::{ParamType, ToolSchema};
use crate::error::RegistryError;

pub fn register_builtin_tools(registry: &mut ToolRegistry) -> Result<(), RegistryError> {
    registry.register(
        "greet",
        "Greet a person by name",
        ToolSchema::new().param("name", ParamType::String, "Name of the person to greet"),
        |args| async move { handle_greet(&args) },
    )
}

pub fn handle_greet(args: &Value) -> Result<Value, String> {
    let name = args
        .get("name")
        .and_then(|v| v.as_str())
        .ok_or_else(|| "Missing required argument: name".to_string())?;
    Ok(Value::String(format!("Hello, {}!", name)))
}
