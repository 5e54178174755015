//! Persistence of the `mcpServers` configuration file.
//!
//! Saves are all-or-nothing: the document is validated, written to a
//! sibling temp file, renamed into place and read back to verify.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::Value;
use toolhost_core::{ConfigError, McpConfig};
use tracing::{debug, info};

/// Loads and saves the server configuration at a fixed path.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load and validate the config. A missing file is an empty config.
    pub async fn load(&self) -> Result<McpConfig, ConfigError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No config file, starting empty");
                return Ok(McpConfig::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let raw: Value = serde_json::from_str(&contents)?;
        Self::validate(&raw)
    }

    /// Validate a raw document without touching disk.
    pub fn validate(raw: &Value) -> Result<McpConfig, ConfigError> {
        McpConfig::validate(raw)
    }

    /// Validate, write atomically and verify.
    pub async fn save(&self, config: &McpConfig) -> Result<(), ConfigError> {
        config.revalidate()?;

        let mut body = serde_json::to_string_pretty(config)?;
        body.push('\n');

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|source| write_error(parent, source))?;
            }
        }

        let tmp = self.temp_path();
        tokio::fs::write(&tmp, body.as_bytes())
            .await
            .map_err(|source| write_error(&tmp, source))?;

        if let Err(source) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(write_error(&self.path, source));
        }

        let reloaded = self.load().await?;
        if &reloaded != config {
            return Err(ConfigError::VerifyFailed(self.path.clone()));
        }

        info!(path = %self.path.display(), servers = config.servers.len(), "Saved config");
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

fn write_error(path: &Path, source: std::io::Error) -> ConfigError {
    ConfigError::Write {
        path: path.to_path_buf(),
        source,
    }
}
