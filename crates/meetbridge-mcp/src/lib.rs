//! MCP front end for the meetbridge Google Workspace tools.

pub mod args;
pub mod config;
pub mod dispatcher;
pub mod handlers;
pub mod initialize;
pub mod server;
pub mod tools;

pub use args::{ArgDefaults, ToolRequest, ValidationError};
pub use dispatcher::{DispatchError, Dispatcher, NOT_AUTHENTICATED_MESSAGE};
pub use server::Server;
pub use tools::{ToolKind, ToolRegistry};
