//! SmartFlow MCP (Model Context Protocol) tool layer
//!
//! Enterprise automation systems (calendar, timesheet, access management,
//! travel approval) are reached through namespaced actions. This crate holds
//! the two halves of that contract:
//!
//! - `client`: the transport seam (`McpClient`) with a deterministic in-memory
//!   simulator and an HTTP implementation
//! - `tool`: the adapter that binds a client to one tool family, injects the
//!   caller identity, and normalizes raw results
//!
//! ## Example Usage
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use serde_json::Map;
//! use smartflow_mcp::{McpTool, SimulatedMcpClient, ToolExecutionContext, ToolFamily, ToolRequest};
//!
//! # async fn demo() -> Result<(), smartflow_mcp::McpTransportError> {
//! let tool = McpTool::for_family(ToolFamily::Calendar, Arc::new(SimulatedMcpClient));
//! let response = tool
//!     .execute(&ToolRequest {
//!         action: "book_meeting_room".to_string(),
//!         parameters: Map::new(),
//!         context: ToolExecutionContext::new("u1"),
//!     })
//!     .await?;
//! println!("{}", response.human_readable);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod tool;

pub use client::{HttpMcpClient, McpClient, McpTransportError, SimulatedMcpClient};
pub use tool::{McpTool, ToolExecutionContext, ToolFamily, ToolRequest, ToolResponse};
