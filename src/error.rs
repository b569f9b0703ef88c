use serde::{Deserialize, Serialize};
use std::fmt;

/// Failure categories that can cross the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Unknown tool or method.
    NotFound,
    /// Arguments do not match the tool schema, or the request is malformed.
    ValidationError,
    /// The tool implementation itself failed.
    InvocationError,
    /// Connection-level failure.
    TransportError,
    /// Request aborted by disconnect or timeout.
    Cancelled,
}

impl ErrorKind {
    /// JSON-RPC error code sent alongside the kind.
    pub fn code(self) -> i64 {
        match self {
            ErrorKind::NotFound => -32601,
            ErrorKind::ValidationError => -32602,
            ErrorKind::InvocationError => -32000,
            ErrorKind::TransportError => -32001,
            ErrorKind::Cancelled => -32002,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NotFound",
            ErrorKind::ValidationError => "ValidationError",
            ErrorKind::InvocationError => "InvocationError",
            ErrorKind::TransportError => "TransportError",
            ErrorKind::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured failure as it travels in a JSON-RPC `error` member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolError {
    pub code: i64,
    pub kind: ErrorKind,
    pub message: String,
}

impl ToolError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            code: kind.code(),
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ValidationError, message)
    }

    pub fn invocation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvocationError, message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TransportError, message)
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cancelled, message)
    }
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ToolError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    DuplicateName(String),
    InvalidSchema { tool: String, message: String },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::DuplicateName(name) => {
                write!(f, "Tool '{}' is already registered", name)
            }
            RegistryError::InvalidSchema { tool, message } => {
                write!(f, "Invalid schema for tool '{}': {}", tool, message)
            }
        }
    }
}

impl std::error::Error for RegistryError {}
