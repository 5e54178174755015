//! Domain types shared by every toolhost crate.

mod config;
mod status;
mod tool;

pub use config::{DEFAULT_TIMEOUT_MS, MAX_TIMEOUT_MS, MIN_TIMEOUT_MS, McpConfig, ServerConfig};
pub use status::{ServerStatus, ServerStatusInfo, StatusSnapshot};
pub use tool::{ToolCallResult, ToolDefinition};
