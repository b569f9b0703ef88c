use futures::future::BoxFuture;
use futures::FutureExt;
use jsonschema::{Draft, JSONSchema};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use super::schema::ToolSchema;
use crate::error::RegistryError;
use crate::mcp::types::McpTool;

pub type ToolFuture = BoxFuture<'static, Result<Value, String>>;
pub type ToolHandler = Arc<dyn Fn(Value) -> ToolFuture + Send + Sync>;

pub struct Tool {
    pub name: String,
    pub description: String,
    pub schema: ToolSchema,
    input_schema: Value,
    validator: JSONSchema,
    handler: ToolHandler,
}

impl Tool {
    pub fn input_schema(&self) -> &Value {
        &self.input_schema
    }

    pub fn validate(&self, arguments: &Value) -> Result<(), String> {
        if let Err(errors) = self.validator.validate(arguments) {
            let error_messages: Vec<String> = errors
                .map(|e| {
                    let path = e.instance_path.to_string();
                    if path.is_empty() {
                        e.to_string()
                    } else {
                        format!("{}: {}", path, e)
                    }
                })
                .collect();
            return Err(error_messages.join("; "));
        }
        Ok(())
    }

    /// Runs the implementation. The returned future owns everything it
    /// needs, so it can be moved onto its own task.
    pub fn invoke(&self, arguments: Value) -> ToolFuture {
        (self.handler)(arguments)
    }

    pub fn to_mcp_tool(&self) -> McpTool {
        McpTool {
            name: self.name.clone(),
            description: Some(self.description.clone()),
            input_schema: self.input_schema.clone(),
        }
    }
}

impl fmt::Debug for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("input_schema", &self.input_schema)
            .finish_non_exhaustive()
    }
}

/// Tools by name, kept in registration order.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: Vec<Tool>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F, Fut>(
        &mut self,
        name: &str,
        description: &str,
        schema: ToolSchema,
        handler: F,
    ) -> Result<(), RegistryError>
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, String>> + Send + 'static,
    {
        if self.index.contains_key(name) {
            return Err(RegistryError::DuplicateName(name.to_string()));
        }

        let input_schema = schema.to_json_schema();
        let validator = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(&input_schema)
            .map_err(|e| RegistryError::InvalidSchema {
                tool: name.to_string(),
                message: e.to_string(),
            })?;

        let handler: ToolHandler = Arc::new(move |arguments| handler(arguments).boxed());

        self.index.insert(name.to_string(), self.tools.len());
        self.tools.push(Tool {
            name: name.to_string(),
            description: description.to_string(),
            schema,
            input_schema,
            validator,
            handler,
        });
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<&Tool> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    pub fn list(&self) -> Vec<&Tool> {
        self.tools.iter().collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn validate_arguments(&self, tool_name: &str, arguments: &Value) -> Result<(), String> {
        let tool = self
            .lookup(tool_name)
            .ok_or_else(|| format!("Tool '{}' not found", tool_name))?;
        tool.validate(arguments)
    }
}
