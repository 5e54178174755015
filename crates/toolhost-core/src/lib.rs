//! Core domain types and port definitions for toolhost.
//!
//! This crate holds everything the supervisor, the bridge and the CLI agree
//! on: the configuration model and its validation, runtime status snapshots,
//! tool definitions, the error taxonomy, and the trait seams (ports) that let
//! adapters be swapped in tests.

pub mod domain;
pub mod error;
pub mod paths;
pub mod ports;

// Re-export commonly used types for convenience
pub use domain::{
    DEFAULT_TIMEOUT_MS, MAX_TIMEOUT_MS, MIN_TIMEOUT_MS, McpConfig, ServerConfig, ServerStatus,
    ServerStatusInfo, StatusSnapshot, ToolCallResult, ToolDefinition,
};
pub use error::{ConfigError, SupervisorError};
pub use paths::{PathError, config_file_path, data_root, logs_dir};
pub use ports::{BridgeCredential, CredentialError, StatusSource, TokenProvider, ToolExecutor};
