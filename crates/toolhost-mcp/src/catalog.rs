//! Per-server cache of discovered tools.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;
use toolhost_core::ToolDefinition;
use tracing::{info, warn};

use crate::transport::{RpcChannel, TransportError};

/// Why a `tools/list` round trip produced no tools.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Malformed tools/list result: {0}")]
    Malformed(String),
}

#[derive(Debug, Deserialize)]
struct ListToolsResult {
    tools: Vec<ListedTool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListedTool {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    input_schema: Option<Value>,
}

/// Tool definitions keyed by server name.
///
/// A slot is replaced wholesale on discovery and set to an empty list on
/// failure or stop, never left holding a previous run's tools.
#[derive(Debug, Default)]
pub struct ToolCatalog {
    slots: Mutex<HashMap<String, Vec<ToolDefinition>>>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue `tools/list` and map the result, without touching the cache.
    pub async fn fetch(
        server: &str,
        channel: &RpcChannel,
        timeout: Duration,
    ) -> Result<Vec<ToolDefinition>, DiscoveryError> {
        let result = channel.send_request("tools/list", json!({}), timeout).await?;
        let listed: ListToolsResult =
            serde_json::from_value(result).map_err(|e| DiscoveryError::Malformed(e.to_string()))?;

        Ok(listed
            .tools
            .into_iter()
            .map(|tool| ToolDefinition {
                name: tool.name,
                description: tool.description.unwrap_or_default(),
                input_schema: tool
                    .input_schema
                    .unwrap_or_else(|| json!({"type": "object"})),
                server_name: server.to_string(),
            })
            .collect())
    }

    /// Fetch and store tools for `server`; failures leave an empty slot.
    pub async fn discover(
        &self,
        server: &str,
        channel: &RpcChannel,
        timeout: Duration,
    ) -> Vec<ToolDefinition> {
        let tools = Self::fetch(server, channel, timeout).await;
        self.store(server, tools)
    }

    /// Store the outcome of a fetch and return what was stored.
    pub fn store(
        &self,
        server: &str,
        outcome: Result<Vec<ToolDefinition>, DiscoveryError>,
    ) -> Vec<ToolDefinition> {
        let tools = match outcome {
            Ok(tools) => {
                info!(server, count = tools.len(), "Discovered tools");
                tools
            }
            Err(e) => {
                warn!(server, error = %e, "Tool discovery failed");
                Vec::new()
            }
        };
        self.lock().insert(server.to_string(), tools.clone());
        tools
    }

    /// Concatenate the slots of `eligible` servers, in the given order.
    pub fn aggregate<S: AsRef<str>>(&self, eligible: &[S]) -> Vec<ToolDefinition> {
        let slots = self.lock();
        eligible
            .iter()
            .filter_map(|name| slots.get(name.as_ref()))
            .flatten()
            .cloned()
            .collect()
    }

    /// Tools currently cached for one server.
    pub fn tools_for(&self, server: &str) -> Vec<ToolDefinition> {
        self.lock().get(server).cloned().unwrap_or_default()
    }

    pub fn tool_count(&self, server: &str) -> usize {
        self.lock().get(server).map_or(0, Vec::len)
    }

    /// Empty a server's slot.
    pub fn clear(&self, server: &str) {
        self.lock().insert(server.to_string(), Vec::new());
    }

    /// Drop a server's slot entirely (server removed from config).
    pub fn remove(&self, server: &str) {
        self.lock().remove(server);
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<ToolDefinition>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
