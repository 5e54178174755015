//! Error taxonomy shared across crates.
//!
//! Transport and bridge errors live next to the code that produces them;
//! the types here cross crate boundaries and are what consumer-facing
//! operations return.

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::ServerStatus;

/// Errors from loading, validating or persisting the server configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A field failed validation. `field` is a dotted path such as
    /// `mcpServers.fs.timeout`.
    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    /// The config file exists but could not be read.
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file (or its temp sibling) could not be written.
    #[error("Failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document is not valid JSON or does not match the schema.
    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// The file read back after a save did not match what was written.
    #[error("Config at {0} did not match after write")]
    VerifyFailed(PathBuf),
}

impl ConfigError {
    /// Build a field-qualified validation error.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Errors returned by supervisor operations.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// No server with this name is configured.
    #[error("Server not found: {0}")]
    ServerNotFound(String),

    /// A process handle already exists for this server.
    #[error("Server already running: {0}")]
    AlreadyRunning(String),

    /// The server must be running for this operation.
    #[error("Server {name} is not running (status: {status})")]
    NotRunning { name: String, status: ServerStatus },

    /// The OS refused to spawn the process.
    #[error("Failed to spawn server {name}: {reason}")]
    SpawnFailed { name: String, reason: String },

    /// The process exited during the stabilization window.
    #[error("Server {name} exited during startup: {reason}")]
    StartupExited { name: String, reason: String },

    /// The `tools/call` round trip failed at the transport level.
    #[error("Tool {tool} on {server} failed: {reason}")]
    ToolExecution {
        server: String,
        tool: String,
        reason: String,
    },

    /// Loading or persisting configuration failed.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
