pub mod builtins;
mod registry;
mod schema;

pub use registry::{Tool, ToolFuture, ToolHandler, ToolRegistry};
pub use schema::{ParamSpec, ParamType, ToolSchema};

use crate::error::RegistryError;

impl ToolRegistry {
    /// Registry holding the tools the server ships with.
    pub fn with_builtin_tools() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        builtins::register_builtin_tools(&mut registry)?;
        Ok(registry)
    }
}
