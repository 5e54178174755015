//! Shared fixtures for process-level supervisor tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use toolhost_mcp::{CommandResolver, ConfigStore, LogManager, Supervisor, SupervisorOptions};

/// A line-oriented fake tool server.
///
/// Answers `initialize`, `tools/list` (one `read_file` tool) and `tools/call`.
/// The tool names `hang`, `fail` and `crash` never answer, answer with
/// `isError: true`, and exit with status 3, respectively. The `env` tool
/// answers with `$PATH|$FAKE_MARKER`. With `FAKE_IGNORE_TERM` set the
/// server ignores SIGTERM and outlives its stdin, so only SIGKILL ends it.
pub const FAKE_SERVER: &str = r#"#!/bin/sh
[ -n "$FAKE_IGNORE_TERM" ] && trap '' TERM
echo "fake server ready" >&2
while IFS= read -r line; do
  id=$(printf '%s\n' "$line" | sed -n 's/.*"id":\([0-9][0-9]*\).*/\1/p')
  case "$line" in
    *'"method":"initialize"'*)
      printf '{"jsonrpc":"2.0","id":%s,"result":{"protocolVersion":"2024-11-05","capabilities":{}}}\n' "$id" ;;
    *'"method":"notifications/'*)
      ;;
    *'"method":"tools/list"'*)
      printf '{"jsonrpc":"2.0","id":%s,"result":{"tools":[{"name":"read_file","description":"Read a file","inputSchema":{"type":"object","properties":{"path":{"type":"string"}}}}]}}\n' "$id" ;;
    *'"name":"hang"'*)
      ;;
    *'"name":"crash"'*)
      echo "crashing on request" >&2
      exit 3 ;;
    *'"name":"env"'*)
      printf '{"jsonrpc":"2.0","id":%s,"result":{"content":[{"type":"text","text":"%s|%s"}]}}\n' "$id" "$PATH" "$FAKE_MARKER" ;;
    *'"name":"fail"'*)
      printf '{"jsonrpc":"2.0","id":%s,"result":{"content":[{"type":"text","text":"no such file"}],"isError":true}}\n' "$id" ;;
    *'"method":"tools/call"'*)
      printf '{"jsonrpc":"2.0","id":%s,"result":{"content":[{"type":"text","text":"hello"}]}}\n' "$id" ;;
  esac
done
if [ -n "$FAKE_IGNORE_TERM" ]; then
  while :; do sleep 1; done
fi
"#;

/// Temporary data directory with a fake server script and a config file.
pub struct Fixture {
    pub dir: TempDir,
    pub script: PathBuf,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake_server.sh");
        std::fs::write(&script, FAKE_SERVER).unwrap();
        Self { dir, script }
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.path().join("mcp_servers.json")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.dir.path().join("logs")
    }

    /// Write a config whose servers all run the fake server. `extra` is
    /// spliced into each server object (e.g. `"autoStart": false`).
    pub fn write_config(&self, servers: &[(&str, &str)]) {
        let entries: Vec<String> = servers
            .iter()
            .map(|(name, extra)| {
                let extra = if extra.is_empty() {
                    String::new()
                } else {
                    format!(", {extra}")
                };
                format!(
                    r#""{name}": {{"command": "/bin/sh", "args": [{script:?}]{extra}}}"#,
                    script = self.script.display().to_string(),
                )
            })
            .collect();
        let doc = format!(r#"{{"mcpServers": {{{}}}}}"#, entries.join(", "));
        std::fs::write(self.config_path(), doc).unwrap();
    }

    pub fn supervisor(&self) -> Supervisor {
        Supervisor::with_parts(
            ConfigStore::new(self.config_path()),
            CommandResolver::new(),
            Arc::new(LogManager::new(self.logs_dir())),
            SupervisorOptions {
                startup_grace: Duration::from_millis(300),
                stop_grace: Duration::from_secs(2),
            },
        )
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

/// Poll `check` every 20 ms for up to 5 s.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..250 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}
