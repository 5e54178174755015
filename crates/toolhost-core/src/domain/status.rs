//! Runtime status reporting types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a supervised tool server.
///
/// Transitions: `stopped -> starting -> running -> {error | crashed} -> stopped`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    /// No process.
    #[default]
    Stopped,
    /// Spawned, waiting out the stabilization window.
    Starting,
    /// Alive and accepting requests.
    Running,
    /// Failed to spawn or exited during startup.
    Error,
    /// Exited unexpectedly while running.
    Crashed,
}

impl ServerStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Error => "error",
            Self::Crashed => "crashed",
        }
    }

    pub const fn is_running(self) -> bool {
        matches!(self, Self::Running)
    }
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of one server, as shown to consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerStatusInfo {
    pub name: String,
    pub status: ServerStatus,
    pub enabled: bool,
    pub auto_start: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    pub crash_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_crash_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub tool_count: usize,
}

/// Immutable snapshot of every server's status, published by the broadcaster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub servers: Vec<ServerStatusInfo>,
    pub captured_at: DateTime<Utc>,
}

impl StatusSnapshot {
    pub fn new(servers: Vec<ServerStatusInfo>) -> Self {
        Self {
            servers,
            captured_at: Utc::now(),
        }
    }

    /// Find a server entry by name.
    pub fn get(&self, name: &str) -> Option<&ServerStatusInfo> {
        self.servers.iter().find(|s| s.name == name)
    }

    /// Number of servers currently running.
    pub fn running_count(&self) -> usize {
        self.servers.iter().filter(|s| s.status.is_running()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&ServerStatus::Crashed).unwrap(), "\"crashed\"");
        assert_eq!(ServerStatus::Running.to_string(), "running");
    }

    #[test]
    fn test_snapshot_lookup() {
        let info = ServerStatusInfo {
            name: "fs".to_string(),
            status: ServerStatus::Running,
            enabled: true,
            auto_start: true,
            pid: Some(42),
            started_at: None,
            crash_count: 0,
            last_crash_at: None,
            last_error: None,
            tool_count: 3,
        };
        let snapshot = StatusSnapshot::new(vec![info]);

        assert_eq!(snapshot.get("fs").map(|s| s.tool_count), Some(3));
        assert!(snapshot.get("git").is_none());
        assert_eq!(snapshot.running_count(), 1);

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["servers"][0]["crashCount"], 0);
        assert!(json.get("capturedAt").is_some());
    }
}
