pub mod client;
pub mod transport_sse;
pub mod types;

pub use client::McpClient;
pub use transport_sse::{ConnectionState, SseTransport, TransportOptions};
pub use types::{McpTool, McpToolCall, McpToolResult};
