//! MCP (Model Context Protocol) server for Azure DevOps work items.
//!
//! Exposes work item tools and reference documents to AI assistants over
//! JSON-RPC 2.0 on stdio.

pub mod handlers;
pub mod protocol;
pub mod resources;
pub mod server;
pub mod transport;

pub use handlers::{GatewayFactory, ToolHandler};
pub use server::McpServer;
