pub mod jsonrpc;
pub mod mcp;
pub mod transport;

pub use jsonrpc::{error_codes, JsonRpcError, JsonRpcRequest, JsonRpcResponse};
pub use mcp::{McpTool, ToolAnnotations, ToolCallResult, ToolContent, ToolsCallRequest, ToolsListResponse};
pub use transport::{LineReader, LineWriter, TransportError};
