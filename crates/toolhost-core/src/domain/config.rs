//! Tool server configuration model.
//!
//! The on-disk format is the widely used `mcpServers` JSON document:
//!
//! ```json
//! { "mcpServers": { "fs": { "command": "npx", "args": ["-y", "pkg", "/tmp"] } } }
//! ```
//!
//! Validation runs on the raw JSON value first so that errors can name the
//! offending field (`mcpServers.fs.timeout`) instead of surfacing a generic
//! serde message.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ConfigError;

/// Lower bound for a per-server request timeout.
pub const MIN_TIMEOUT_MS: u64 = 1_000;
/// Upper bound for a per-server request timeout.
pub const MAX_TIMEOUT_MS: u64 = 300_000;
/// Timeout applied when a server does not configure one.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

const SERVERS_KEY: &str = "mcpServers";

/// Names that would collide with shared files in the logs directory.
const RESERVED_NAMES: &[&str] = &["errors"];

/// Configuration of a single tool server.
///
/// `auto_start` and `enabled` are kept as `Option<bool>` so that a config
/// file round-trips without gaining keys the user never wrote. Both default
/// to `true` when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Executable name or absolute path (e.g. `npx`).
    pub command: String,

    /// Arguments passed to the executable.
    #[serde(default)]
    pub args: Vec<String>,

    /// Extra environment variables; these win over the inherited environment.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,

    /// Start this server when the supervisor initializes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_start: Option<bool>,

    /// Whether tools from this server are offered to callers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    /// Per-request timeout in milliseconds.
    #[serde(default, alias = "timeoutMs", skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

impl ServerConfig {
    /// Create a configuration with defaults for everything but the command line.
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            env: BTreeMap::new(),
            auto_start: None,
            enabled: None,
            timeout: None,
        }
    }

    /// Auto-start is opt-out: only an explicit `false` disables it.
    pub fn auto_start(&self) -> bool {
        self.auto_start != Some(false)
    }

    /// Servers are enabled unless explicitly disabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled != Some(false)
    }

    /// Effective request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout.unwrap_or(DEFAULT_TIMEOUT_MS))
    }
}

/// Top-level configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpConfig {
    /// Server definitions keyed by their unique name.
    #[serde(rename = "mcpServers")]
    pub servers: BTreeMap<String, ServerConfig>,
}

impl McpConfig {
    /// Validate a raw JSON document and convert it into a typed config.
    ///
    /// Every rejection carries the dotted path of the offending field.
    pub fn validate(raw: &Value) -> Result<Self, ConfigError> {
        let servers = raw
            .get(SERVERS_KEY)
            .ok_or_else(|| ConfigError::invalid(SERVERS_KEY, "is required"))?
            .as_object()
            .ok_or_else(|| ConfigError::invalid(SERVERS_KEY, "must be an object"))?;

        for (name, server) in servers {
            validate_server(name, server)?;
        }

        serde_json::from_value(raw.clone()).map_err(ConfigError::Parse)
    }

    /// Re-run validation on an already typed config (e.g. one built in code).
    pub fn revalidate(&self) -> Result<(), ConfigError> {
        let raw = serde_json::to_value(self).map_err(ConfigError::Parse)?;
        Self::validate(&raw).map(|_| ())
    }

    /// Look up a server by name.
    pub fn server(&self, name: &str) -> Option<&ServerConfig> {
        self.servers.get(name)
    }
}

fn validate_server(name: &str, server: &Value) -> Result<(), ConfigError> {
    let prefix = format!("{SERVERS_KEY}.{name}");

    if name.trim().is_empty() {
        return Err(ConfigError::invalid(SERVERS_KEY, "server names must not be empty"));
    }

    // names double as log file names
    if name.contains(['/', '\\']) || name.contains("..") {
        return Err(ConfigError::invalid(
            &prefix,
            "server names must not contain path separators or '..'",
        ));
    }
    if RESERVED_NAMES.iter().any(|r| name.eq_ignore_ascii_case(r)) {
        return Err(ConfigError::invalid(&prefix, "server name is reserved"));
    }

    let fields = server
        .as_object()
        .ok_or_else(|| ConfigError::invalid(&prefix, "must be an object"))?;

    match fields.get("command") {
        None => return Err(ConfigError::invalid(format!("{prefix}.command"), "is required")),
        Some(Value::String(cmd)) if cmd.trim().is_empty() => {
            return Err(ConfigError::invalid(
                format!("{prefix}.command"),
                "must not be empty",
            ));
        }
        Some(Value::String(_)) => {}
        Some(_) => {
            return Err(ConfigError::invalid(
                format!("{prefix}.command"),
                "must be a string",
            ));
        }
    }

    if let Some(args) = fields.get("args") {
        let list = args
            .as_array()
            .ok_or_else(|| ConfigError::invalid(format!("{prefix}.args"), "must be a list"))?;
        for (idx, arg) in list.iter().enumerate() {
            if !arg.is_string() {
                return Err(ConfigError::invalid(
                    format!("{prefix}.args[{idx}]"),
                    "must be a string",
                ));
            }
        }
    }

    if let Some(env) = fields.get("env") {
        let map = env
            .as_object()
            .ok_or_else(|| ConfigError::invalid(format!("{prefix}.env"), "must be an object"))?;
        for (key, value) in map {
            if !value.is_string() {
                return Err(ConfigError::invalid(
                    format!("{prefix}.env.{key}"),
                    "must be a string",
                ));
            }
        }
    }

    for flag in ["autoStart", "enabled"] {
        if let Some(value) = fields.get(flag) {
            if !value.is_boolean() {
                return Err(ConfigError::invalid(
                    format!("{prefix}.{flag}"),
                    "must be a boolean",
                ));
            }
        }
    }

    validate_timeout(&prefix, fields)
}

fn validate_timeout(prefix: &str, fields: &Map<String, Value>) -> Result<(), ConfigError> {
    if fields.contains_key("timeout") && fields.contains_key("timeoutMs") {
        return Err(ConfigError::invalid(
            format!("{prefix}.timeout"),
            "use either 'timeout' or 'timeoutMs', not both",
        ));
    }

    let Some((key, value)) = fields
        .get_key_value("timeout")
        .or_else(|| fields.get_key_value("timeoutMs"))
    else {
        return Ok(());
    };

    let field = format!("{prefix}.{key}");
    let ms = value
        .as_u64()
        .ok_or_else(|| ConfigError::invalid(&field, "must be a whole number of milliseconds"))?;

    if !(MIN_TIMEOUT_MS..=MAX_TIMEOUT_MS).contains(&ms) {
        return Err(ConfigError::invalid(
            field,
            format!("must be between {MIN_TIMEOUT_MS} and {MAX_TIMEOUT_MS} ms (got {ms})"),
        ));
    }

    Ok(())
}
