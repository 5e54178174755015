//! CLI bootstrap - the composition root.
//!
//! This module is the ONLY place where the supervisor, its config store and
//! its log manager are wired together for the CLI. Command handlers receive
//! the composed [`CliContext`].

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use toolhost_core::paths::{config_file_path, logs_dir};
use toolhost_mcp::{ConfigStore, LogManager, Supervisor};

/// Bootstrap configuration for the CLI.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Path of `mcp_servers.json`.
    pub config_path: PathBuf,
    /// Directory for per-server logs.
    pub logs_dir: PathBuf,
}

impl CliConfig {
    /// Default data paths, with an optional config file override.
    pub fn with_defaults(config_override: Option<PathBuf>) -> Result<Self> {
        let config_path = match config_override {
            Some(path) => path,
            None => config_file_path()?,
        };
        Ok(Self {
            config_path,
            logs_dir: logs_dir()?,
        })
    }
}

/// Fully composed application context for CLI commands.
pub struct CliContext {
    pub supervisor: Supervisor,
    pub config: CliConfig,
}

/// Build the CLI context.
pub fn bootstrap(config: CliConfig) -> CliContext {
    let store = ConfigStore::new(&config.config_path);
    let logs = Arc::new(LogManager::new(&config.logs_dir));
    CliContext {
        supervisor: Supervisor::new(store, logs),
        config,
    }
}
