//! Tool server process supervisor.
//!
//! The supervisor owns every server's process handle, JSON-RPC channel and
//! runtime state. Consumers (CLI, bridge, UI layers) only go through its
//! public operations.
//!
//! Key design decisions:
//! - **Single registry**: all per-server bookkeeping sits behind one async
//!   mutex; the lock is never held across process or pipe I/O
//! - **Watcher per child**: one task owns each `Child` and observes either its
//!   exit or a stop request
//! - **No auto-restart**: a crashed server stays `crashed` until a caller
//!   restarts it

mod process;
mod state;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use futures_util::future::join_all;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Child;
use tokio::sync::{Mutex, MutexGuard, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use toolhost_core::{
    McpConfig, ServerConfig, ServerStatus, ServerStatusInfo, StatusSnapshot, StatusSource,
    SupervisorError, ToolCallResult, ToolDefinition, ToolExecutor,
};

use crate::catalog::{DiscoveryError, ToolCatalog};
use crate::config_store::ConfigStore;
use crate::logs::{LogManager, Stream};
use crate::resolver::CommandResolver;
use crate::transport::{self, RpcChannel, TransportError};

pub use process::{StderrTail, describe_exit, shutdown_child, spawn};
pub use state::{ExitKind, RuntimeState};

/// Timing knobs for the supervisor.
#[derive(Debug, Clone, Copy)]
pub struct SupervisorOptions {
    /// How long a fresh process must stay alive before it counts as running.
    pub startup_grace: Duration,
    /// How long a process gets to exit after SIGTERM before it is killed.
    pub stop_grace: Duration,
}

impl Default for SupervisorOptions {
    fn default() -> Self {
        Self {
            startup_grace: Duration::from_secs(1),
            stop_grace: Duration::from_secs(5),
        }
    }
}

/// A live process and everything attached to it.
struct ProcessHandle {
    channel: Arc<RpcChannel>,
    cancel: CancellationToken,
    watcher: JoinHandle<()>,
}

struct ServerEntry {
    config: ServerConfig,
    state: RuntimeState,
    handle: Option<ProcessHandle>,
    /// Discovery finished for the current generation.
    discovered: bool,
    /// An earlier process is still being torn down; no new one may be
    /// spawned until it is gone.
    terminating: bool,
}

impl ServerEntry {
    fn new(config: ServerConfig) -> Self {
        Self {
            config,
            state: RuntimeState::default(),
            handle: None,
            discovered: false,
            terminating: false,
        }
    }
}

struct Inner {
    store: ConfigStore,
    resolver: CommandResolver,
    catalog: ToolCatalog,
    logs: Arc<LogManager>,
    options: SupervisorOptions,
    registry: Mutex<BTreeMap<String, ServerEntry>>,
    /// Bumped every time a discovery result is stored.
    discoveries: watch::Sender<u64>,
    /// Bumped every time a process teardown completes.
    terminations: watch::Sender<u64>,
    flusher_started: AtomicBool,
    background: CancellationToken,
}

/// Supervises the configured tool servers. Cheap to clone.
#[derive(Clone)]
pub struct Supervisor {
    inner: Arc<Inner>,
}

impl Supervisor {
    /// Supervisor with the system command resolver and default timings.
    pub fn new(store: ConfigStore, logs: Arc<LogManager>) -> Self {
        Self::with_parts(store, CommandResolver::new(), logs, SupervisorOptions::default())
    }

    pub fn with_parts(
        store: ConfigStore,
        resolver: CommandResolver,
        logs: Arc<LogManager>,
        options: SupervisorOptions,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                resolver,
                catalog: ToolCatalog::new(),
                logs,
                options,
                registry: Mutex::new(BTreeMap::new()),
                discoveries: watch::Sender::new(0),
                terminations: watch::Sender::new(0),
                flusher_started: AtomicBool::new(false),
                background: CancellationToken::new(),
            }),
        }
    }

    /// Load config and register every server without starting any.
    ///
    /// Also starts the background log flusher (once per supervisor).
    pub async fn load(&self) -> Result<McpConfig, SupervisorError> {
        let config = self.inner.store.load().await?;
        info!(servers = config.servers.len(), "Loaded tool server config");

        {
            let mut registry = self.registry().await;
            for (name, server) in &config.servers {
                registry
                    .entry(name.clone())
                    .and_modify(|e| e.config = server.clone())
                    .or_insert_with(|| ServerEntry::new(server.clone()));
            }
        }

        if !self.inner.flusher_started.swap(true, Ordering::SeqCst) {
            self.inner
                .logs
                .spawn_flusher(self.inner.background.child_token());
        }
        Ok(config)
    }

    /// Load config, register every server and auto-start the eligible ones.
    ///
    /// Individual start failures are logged and reflected in status; only
    /// a config load failure is returned.
    pub async fn initialize(&self) -> Result<(), SupervisorError> {
        let config = self.load().await?;
        let auto_start: Vec<&String> = config
            .servers
            .iter()
            .filter(|(_, s)| s.auto_start() && s.is_enabled())
            .map(|(name, _)| name)
            .collect();

        let starts = auto_start.into_iter().map(|name| async move {
            if let Err(e) = self.start(name).await {
                warn!(server = %name, error = %e, "Auto-start failed");
            }
        });
        join_all(starts).await;
        Ok(())
    }

    /// Start a server. Returns once it has survived the startup grace period.
    ///
    /// If a previous process of this server is still shutting down, waits
    /// for it to exit before spawning.
    pub async fn start(&self, name: &str) -> Result<(), SupervisorError> {
        let mut terminations = self.inner.terminations.subscribe();
        let (config, generation) = loop {
            {
                let mut registry = self.registry().await;
                let entry = registry
                    .get_mut(name)
                    .ok_or_else(|| SupervisorError::ServerNotFound(name.to_string()))?;
                if entry.handle.is_some() || entry.state.status == ServerStatus::Starting {
                    return Err(SupervisorError::AlreadyRunning(name.to_string()));
                }
                if !entry.terminating {
                    let generation = entry.state.begin_start();
                    entry.discovered = false;
                    break (entry.config.clone(), generation);
                }
            }
            debug!(server = %name, "Waiting for previous process to exit");
            if terminations.changed().await.is_err() {
                return Err(SupervisorError::AlreadyRunning(name.to_string()));
            }
        };

        let program = self.inner.resolver.resolve(&config.command);
        let mut env = self.inner.resolver.enhanced_environment();
        env.extend(config.env.iter().map(|(k, v)| (k.clone(), v.clone())));

        info!(server = %name, command = %program, args = ?config.args, "Starting server");

        let mut child = match spawn(&program, &config.args, &env) {
            Ok(child) => child,
            Err(e) => {
                let reason = format!("{program}: {e}");
                error!(server = %name, error = %reason, "Failed to spawn server");
                self.update_state(name, generation, |state| state.spawn_failed(reason.clone()))
                    .await;
                self.inner
                    .logs
                    .record(name, Stream::System, &format!("spawn failed: {reason}"));
                return Err(SupervisorError::SpawnFailed {
                    name: name.to_string(),
                    reason,
                });
            }
        };

        let pid = child.id();
        let tail = Arc::new(StderrTail::default());
        let Some(channel) = self.attach(name, &mut child, &tail) else {
            let reason = "process stdio was not captured".to_string();
            self.update_state(name, generation, |state| state.spawn_failed(reason.clone()))
                .await;
            return Err(SupervisorError::SpawnFailed {
                name: name.to_string(),
                reason,
            });
        };
        let cancel = CancellationToken::new();
        let watcher = self.spawn_watcher(name, generation, child, cancel.clone());

        {
            let mut registry = self.registry().await;
            match registry.get_mut(name) {
                Some(entry) if entry.state.generation == generation => {
                    entry.state.spawned(pid);
                    entry.handle = Some(ProcessHandle {
                        channel: Arc::clone(&channel),
                        cancel,
                        watcher,
                    });
                }
                _ => {
                    drop(registry);
                    // stopped or removed while spawning
                    channel.close(&TransportError::Stopping);
                    cancel.cancel();
                    let _ = watcher.await;
                    self.finish_termination(name).await;
                    return Err(SupervisorError::StartupExited {
                        name: name.to_string(),
                        reason: "stopped during startup".to_string(),
                    });
                }
            }
        }

        self.inner.logs.record(
            name,
            Stream::System,
            &format!("started {program} (pid {})", pid.map_or_else(|| "?".into(), |p| p.to_string())),
        );

        tokio::time::sleep(self.inner.options.startup_grace).await;

        let outcome = {
            let mut registry = self.registry().await;
            let Some(entry) = registry.get_mut(name) else {
                return Err(SupervisorError::ServerNotFound(name.to_string()));
            };

            if entry.state.generation != generation {
                Err("stopped during startup".to_string())
            } else if entry.handle.is_none() {
                let mut reason = entry
                    .state
                    .last_exit
                    .clone()
                    .unwrap_or_else(|| "process exited".to_string());
                let stderr = tail.joined();
                if !stderr.is_empty() {
                    reason = format!("{reason}: {stderr}");
                }
                entry.state.startup_failed(reason.clone());
                Err(reason)
            } else {
                entry.state.mark_running(Utc::now());
                Ok(entry.config.request_timeout())
            }
        };

        match outcome {
            Ok(timeout) => {
                info!(server = %name, pid, "Server running");
                let supervisor = self.clone();
                let name = name.to_string();
                tokio::spawn(async move {
                    supervisor.discover(&name, generation, channel, timeout).await;
                });
                Ok(())
            }
            Err(reason) => {
                warn!(server = %name, error = %reason, "Server exited during startup");
                Err(SupervisorError::StartupExited {
                    name: name.to_string(),
                    reason,
                })
            }
        }
    }

    /// Stop a server: reject in-flight requests, clear its caches, flush its
    /// logs, then terminate the process.
    pub async fn stop(&self, name: &str) -> Result<(), SupervisorError> {
        let handle = {
            let mut registry = self.registry().await;
            let entry = registry
                .get_mut(name)
                .ok_or_else(|| SupervisorError::ServerNotFound(name.to_string()))?;
            // a start without a registered handle tears its own process down
            let mid_start = entry.state.status == ServerStatus::Starting && entry.handle.is_none();
            entry.state.mark_stopped();
            self.inner.catalog.clear(name);
            let handle = entry.handle.take();
            if handle.is_some() || mid_start {
                entry.terminating = true;
            }
            handle
        };

        let Some(handle) = handle else {
            self.inner.logs.release(name).await;
            return Ok(());
        };

        let rejected = handle.channel.close(&TransportError::Stopping);
        handle.channel.clear_buffer();
        info!(server = %name, rejected, "Stopping server");
        self.inner.logs.record(name, Stream::System, "stopping");
        self.inner.logs.release(name).await;

        handle.cancel.cancel();
        if let Err(e) = handle.watcher.await {
            warn!(server = %name, error = %e, "Process watcher failed");
        }
        self.finish_termination(name).await;
        debug!(server = %name, "Server stopped");
        Ok(())
    }

    /// Stop then start.
    pub async fn restart(&self, name: &str) -> Result<(), SupervisorError> {
        self.stop(name).await?;
        self.start(name).await
    }

    /// Stop every server that has a process, then flush logs.
    pub async fn shutdown(&self) {
        let active: Vec<String> = self
            .registry()
            .await
            .iter()
            .filter(|(_, e)| e.handle.is_some() || e.state.is_active())
            .map(|(name, _)| name.clone())
            .collect();

        info!(count = active.len(), "Shutting down tool servers");
        let stops = active.iter().map(|name| async move {
            if let Err(e) = self.stop(name).await {
                warn!(server = %name, error = %e, "Stop during shutdown failed");
            }
        });
        join_all(stops).await;

        self.inner.background.cancel();
        self.inner.logs.shutdown().await;
    }

    /// Current configuration as held by the supervisor.
    pub async fn get_config(&self) -> McpConfig {
        let registry = self.registry().await;
        McpConfig {
            servers: registry
                .iter()
                .map(|(name, e)| (name.clone(), e.config.clone()))
                .collect(),
        }
    }

    /// Validate, apply and persist a new configuration.
    ///
    /// Servers missing from `new` are stopped and evicted before the file is
    /// written; new servers are registered as stopped; existing ones get
    /// their config replaced in place (a running process keeps its old
    /// command line until restarted).
    pub async fn update_config(&self, new: McpConfig) -> Result<(), SupervisorError> {
        new.revalidate()?;

        let removed: Vec<String> = self
            .registry()
            .await
            .keys()
            .filter(|name| !new.servers.contains_key(*name))
            .cloned()
            .collect();

        for name in &removed {
            self.stop(name).await?;
            self.registry().await.remove(name);
            self.inner.catalog.remove(name);
            info!(server = %name, "Removed server");
        }

        self.inner.store.save(&new).await?;

        let mut registry = self.registry().await;
        for (name, config) in new.servers {
            match registry.get_mut(&name) {
                Some(entry) => entry.config = config,
                None => {
                    info!(server = %name, "Registered server");
                    registry.insert(name, ServerEntry::new(config));
                }
            }
        }
        Ok(())
    }

    /// Status of every configured server.
    pub async fn statuses(&self) -> Vec<ServerStatusInfo> {
        let registry = self.registry().await;
        registry
            .iter()
            .map(|(name, e)| ServerStatusInfo {
                name: name.clone(),
                status: e.state.status,
                enabled: e.config.is_enabled(),
                auto_start: e.config.auto_start(),
                pid: e.state.pid,
                started_at: e.state.started_at,
                crash_count: e.state.crash_count,
                last_crash_at: e.state.last_crash_at,
                last_error: e.state.last_error.clone(),
                tool_count: self.inner.catalog.tool_count(name),
            })
            .collect()
    }

    /// Status of a single server.
    pub async fn status(&self, name: &str) -> Option<ServerStatus> {
        self.registry().await.get(name).map(|e| e.state.status)
    }

    /// Tools of every server that is running and enabled.
    pub async fn aggregate_tools(&self) -> Vec<ToolDefinition> {
        let registry = self.registry().await;
        let eligible: Vec<&str> = registry
            .iter()
            .filter(|(_, e)| e.state.status.is_running() && e.config.is_enabled())
            .map(|(name, _)| name.as_str())
            .collect();
        self.inner.catalog.aggregate(&eligible)
    }

    /// Wait until the running server's first discovery has completed, then
    /// return its tools. Returns immediately with the cached (possibly empty)
    /// list when the server is not running, and gives up after `timeout`.
    pub async fn wait_for_tools(
        &self,
        name: &str,
        timeout: Duration,
    ) -> Result<Vec<ToolDefinition>, SupervisorError> {
        let mut changes = self.inner.discoveries.subscribe();
        let wait = async {
            loop {
                {
                    let registry = self.registry().await;
                    let entry = registry
                        .get(name)
                        .ok_or_else(|| SupervisorError::ServerNotFound(name.to_string()))?;
                    if entry.discovered || !entry.state.status.is_running() {
                        return Ok::<(), SupervisorError>(());
                    }
                }
                if changes.changed().await.is_err() {
                    return Ok(());
                }
            }
        };

        match tokio::time::timeout(timeout, wait).await {
            Ok(result) => result?,
            Err(_) => debug!(server = %name, "Timed out waiting for tool discovery"),
        }
        Ok(self.inner.catalog.tools_for(name))
    }

    /// Tools cached for one server, regardless of its status.
    pub fn tools_for(&self, name: &str) -> Vec<ToolDefinition> {
        self.inner.catalog.tools_for(name)
    }

    /// Run a tool via `tools/call`.
    ///
    /// Transport failures are `Err(ToolExecution)`; a tool that answers with
    /// `isError: true` is `Ok` with `success == false`.
    pub async fn execute(
        &self,
        server: &str,
        tool: &str,
        args: Value,
    ) -> Result<ToolCallResult, SupervisorError> {
        let (channel, timeout) = {
            let registry = self.registry().await;
            let entry = registry
                .get(server)
                .ok_or_else(|| SupervisorError::ServerNotFound(server.to_string()))?;
            let not_running = || SupervisorError::NotRunning {
                name: server.to_string(),
                status: entry.state.status,
            };
            if !entry.state.status.is_running() {
                return Err(not_running());
            }
            let handle = entry.handle.as_ref().ok_or_else(not_running)?;
            (Arc::clone(&handle.channel), entry.config.request_timeout())
        };

        let arguments = if args.is_null() { json!({}) } else { args };
        let started = Instant::now();
        debug!(server, tool, "Calling tool");

        let result = channel
            .send_request(
                "tools/call",
                json!({"name": tool, "arguments": arguments}),
                timeout,
            )
            .await
            .map_err(|e| SupervisorError::ToolExecution {
                server: server.to_string(),
                tool: tool.to_string(),
                reason: e.to_string(),
            })?;

        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        Ok(interpret_call_result(result, elapsed_ms))
    }

    /// Log manager shared with this supervisor.
    pub fn logs(&self) -> &Arc<LogManager> {
        &self.inner.logs
    }

    async fn registry(&self) -> MutexGuard<'_, BTreeMap<String, ServerEntry>> {
        self.inner.registry.lock().await
    }

    /// Apply `apply` if `generation` is still current. Otherwise the start
    /// was stopped midway and, having no process left, releases the
    /// teardown claim `stop` left for it.
    async fn update_state(&self, name: &str, generation: u64, apply: impl FnOnce(&mut RuntimeState)) {
        let mut registry = self.registry().await;
        if let Some(entry) = registry.get_mut(name) {
            if entry.state.generation == generation {
                apply(&mut entry.state);
            } else {
                entry.terminating = false;
                self.inner.terminations.send_modify(|n| *n = n.wrapping_add(1));
            }
        }
    }

    /// A torn-down process has exited; let waiting starts proceed.
    async fn finish_termination(&self, name: &str) {
        if let Some(entry) = self.registry().await.get_mut(name) {
            entry.terminating = false;
        }
        self.inner.terminations.send_modify(|n| *n = n.wrapping_add(1));
    }

    /// Wire the child's pipes: stdin/stdout to a channel, stderr to the logs.
    fn attach(&self, name: &str, child: &mut Child, tail: &Arc<StderrTail>) -> Option<Arc<RpcChannel>> {
        let stdin = child.stdin.take()?;
        let stdout = child.stdout.take()?;
        let stderr = child.stderr.take()?;

        let channel = Arc::new(RpcChannel::new(name, stdin));
        let logs = Arc::clone(&self.inner.logs);
        let server = name.to_string();
        channel.spawn_reader(stdout, move |line| logs.record(&server, Stream::Stdout, line));

        let logs = Arc::clone(&self.inner.logs);
        let server = name.to_string();
        let tail = Arc::clone(tail);
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        tail.push(&line);
                        logs.record(&server, Stream::Stderr, &line);
                    }
                    Ok(None) => break,
                    Err(e) => {
                        debug!(server = %server, error = %e, "Stopped reading stderr");
                        break;
                    }
                }
            }
        });

        Some(channel)
    }

    /// Spawn the task that owns `child` until it exits or is stopped.
    fn spawn_watcher(
        &self,
        name: &str,
        generation: u64,
        mut child: Child,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let supervisor = self.clone();
        let name = name.to_string();
        let stop_grace = self.inner.options.stop_grace;

        tokio::spawn(async move {
            let exited = tokio::select! {
                status = child.wait() => Some(status),
                () = cancel.cancelled() => None,
            };

            match exited {
                Some(status) => supervisor.on_exit(&name, generation, &status).await,
                None => match shutdown_child(child, stop_grace).await {
                    Ok(status) => debug!(server = %name, %status, "Process terminated"),
                    Err(e) => warn!(server = %name, error = %e, "Failed to terminate process"),
                },
            }
        })
    }

    async fn on_exit(&self, name: &str, generation: u64, status: &std::io::Result<std::process::ExitStatus>) {
        let description = describe_exit(status);

        let (kind, handle) = {
            let mut registry = self.registry().await;
            let Some(entry) = registry.get_mut(name) else {
                return;
            };
            let kind = entry.state.on_exit(generation, Utc::now(), description.clone());
            let handle = if kind == ExitKind::Stale {
                None
            } else {
                self.inner.catalog.clear(name);
                entry.handle.take()
            };
            (kind, handle)
        };

        match kind {
            ExitKind::Stale => {
                debug!(server = %name, generation, "Ignoring exit of superseded process");
                return;
            }
            ExitKind::Crashed => error!(server = %name, reason = %description, "Server crashed"),
            ExitKind::Stopped => info!(server = %name, reason = %description, "Server exited"),
        }

        if let Some(handle) = handle {
            handle.channel.close(&TransportError::Closed);
            handle.channel.clear_buffer();
        }
        self.inner.logs.record(name, Stream::System, &description);
    }

    async fn discover(&self, name: &str, generation: u64, channel: Arc<RpcChannel>, timeout: Duration) {
        let outcome = match transport::initialize(&channel, timeout).await {
            Ok(_) => ToolCatalog::fetch(name, &channel, timeout).await,
            Err(e) => Err(DiscoveryError::Transport(e)),
        };

        let mut registry = self.registry().await;
        match registry.get_mut(name) {
            Some(entry) if entry.state.generation == generation && entry.state.status.is_running() => {
                self.inner.catalog.store(name, outcome);
                entry.discovered = true;
                drop(registry);
                self.inner.discoveries.send_modify(|n| *n = n.wrapping_add(1));
            }
            _ => debug!(server = %name, "Discarding discovery result of a stopped server"),
        }
    }
}

/// Map a `tools/call` result into a [`ToolCallResult`].
fn interpret_call_result(result: Value, elapsed_ms: u64) -> ToolCallResult {
    let is_error = result
        .get("isError")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    if !is_error {
        return ToolCallResult::success(result, elapsed_ms);
    }

    let text = result
        .get("content")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get("text").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default();

    let message = if text.is_empty() {
        "Tool reported an error".to_string()
    } else {
        text
    };
    ToolCallResult::failure(message, elapsed_ms)
}

#[async_trait]
impl ToolExecutor for Supervisor {
    async fn execute(
        &self,
        server: &str,
        tool: &str,
        args: Value,
    ) -> Result<ToolCallResult, SupervisorError> {
        Self::execute(self, server, tool, args).await
    }
}

#[async_trait]
impl StatusSource for Supervisor {
    async fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot::new(self.statuses().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn supervisor(dir: &std::path::Path) -> Supervisor {
        Supervisor::with_parts(
            ConfigStore::new(dir.join("mcp_servers.json")),
            CommandResolver::new(),
            Arc::new(LogManager::new(dir.join("logs"))),
            SupervisorOptions {
                startup_grace: Duration::from_millis(200),
                stop_grace: Duration::from_secs(1),
            },
        )
    }

    fn config(servers: &[(&str, ServerConfig)]) -> McpConfig {
        McpConfig {
            servers: servers
                .iter()
                .map(|(name, s)| ((*name).to_string(), s.clone()))
                .collect(),
        }
    }

    #[test]
    fn test_is_error_result_joins_text() {
        let result = json!({
            "content": [
                {"type": "text", "text": "file not found"},
                {"type": "image", "data": "..."},
                {"type": "text", "text": "/tmp/x"}
            ],
            "isError": true
        });

        let outcome = interpret_call_result(result, 12);

        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("file not found\n/tmp/x"));
        assert_eq!(outcome.execution_time_ms, 12);
    }

    #[test]
    fn test_success_keeps_full_payload() {
        let result = json!({"content": [{"type": "text", "text": "ok"}]});
        let outcome = interpret_call_result(result.clone(), 3);
        assert!(outcome.success);
        assert_eq!(outcome.result, Some(result));
    }

    #[tokio::test]
    async fn test_unknown_server_operations() {
        let dir = tempfile::tempdir().unwrap();
        let supervisor = supervisor(dir.path());

        assert!(matches!(
            supervisor.start("ghost").await,
            Err(SupervisorError::ServerNotFound(_))
        ));
        assert!(matches!(
            supervisor.stop("ghost").await,
            Err(SupervisorError::ServerNotFound(_))
        ));
        assert!(matches!(
            supervisor.execute("ghost", "t", json!({})).await,
            Err(SupervisorError::ServerNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_config_registers_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let supervisor = supervisor(dir.path());
        supervisor.initialize().await.unwrap();

        let disabled = ServerConfig {
            auto_start: Some(false),
            ..ServerConfig::new("does-not-exist", vec![])
        };
        supervisor
            .update_config(config(&[("fs", disabled.clone())]))
            .await
            .unwrap();

        let statuses = supervisor.statuses().await;
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].status, ServerStatus::Stopped);
        assert!(!statuses[0].auto_start);

        let saved = ConfigStore::new(dir.path().join("mcp_servers.json"))
            .load()
            .await
            .unwrap();
        assert_eq!(saved, config(&[("fs", disabled)]));

        supervisor.update_config(McpConfig::default()).await.unwrap();
        assert!(supervisor.statuses().await.is_empty());
        supervisor.shutdown().await;
    }

    #[tokio::test]
    async fn test_invalid_update_is_rejected_without_side_effects() {
        let dir = tempfile::tempdir().unwrap();
        let supervisor = supervisor(dir.path());
        supervisor.initialize().await.unwrap();

        let bad = ServerConfig {
            timeout: Some(5),
            ..ServerConfig::new("npx", vec![])
        };
        let err = supervisor
            .update_config(config(&[("fs", bad)]))
            .await
            .unwrap_err();

        assert!(matches!(err, SupervisorError::Config(_)));
        assert!(supervisor.statuses().await.is_empty());
        assert!(!dir.path().join("mcp_servers.json").exists());
    }

    #[tokio::test]
    async fn test_spawn_failure_sets_error_state() {
        let dir = tempfile::tempdir().unwrap();
        let supervisor = supervisor(dir.path());
        supervisor.initialize().await.unwrap();
        supervisor
            .update_config(config(&[(
                "broken",
                ServerConfig::new("/nonexistent/toolhost-test-binary", vec![]),
            )]))
            .await
            .unwrap();

        let err = supervisor.start("broken").await.unwrap_err();
        assert!(matches!(err, SupervisorError::SpawnFailed { .. }));

        let status = &supervisor.statuses().await[0];
        assert_eq!(status.status, ServerStatus::Error);
        assert!(status.last_error.is_some());

        // no handle was left behind, so a retry is allowed
        assert!(matches!(
            supervisor.start("broken").await,
            Err(SupervisorError::SpawnFailed { .. })
        ));
        supervisor.shutdown().await;
    }

    #[tokio::test]
    async fn test_execute_requires_running() {
        let dir = tempfile::tempdir().unwrap();
        let supervisor = supervisor(dir.path());
        supervisor.initialize().await.unwrap();
        supervisor
            .update_config(config(&[(
                "fs",
                ServerConfig {
                    auto_start: Some(false),
                    ..ServerConfig::new("npx", vec![])
                },
            )]))
            .await
            .unwrap();

        let err = supervisor
            .execute("fs", "read_file", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SupervisorError::NotRunning { status: ServerStatus::Stopped, .. }
        ));
        supervisor.shutdown().await;
    }
}
