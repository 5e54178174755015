//! Buffered, rotated log files for tool server output.
//!
//! Every server gets `<server>.log`; stderr lines from all servers are also
//! collected in `errors.log`, prefixed with the server name. Lines are
//! queued in memory and appended in batches, so a server flooding stdout
//! costs one write per 100 lines rather than one per line.
//!
//! I/O failures are logged and swallowed: losing a log line must never
//! affect the supervised server.

mod buffer;
mod rotation;

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{SecondsFormat, Utc};
use tokio::io::AsyncWriteExt;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub use buffer::{FLUSH_INTERVAL, FLUSH_LINES, LogLineBuffer};
pub use rotation::{
    CHECK_INTERVAL, KEEP_ROTATED, MAX_FILE_BYTES, RotationGate, rotate_if_needed, rotated_path,
};

const ERRORS_FILE: &str = "errors.log";

/// Which stream a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
    /// Lifecycle events written by the supervisor itself.
    System,
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
            Self::System => "system",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum LogTarget {
    Server(String),
    Errors,
}

struct FileState {
    buffer: LogLineBuffer,
    gate: RotationGate,
    /// Serializes appends so batches land in the order they were taken.
    io: Arc<tokio::sync::Mutex<()>>,
}

impl FileState {
    fn new(now: Instant) -> Self {
        Self {
            buffer: LogLineBuffer::new(now),
            gate: RotationGate::default(),
            io: Arc::new(tokio::sync::Mutex::new(())),
        }
    }
}

/// Writes server output to per-server and aggregate error logs.
pub struct LogManager {
    dir: PathBuf,
    max_file_bytes: u64,
    files: Mutex<HashMap<LogTarget, FileState>>,
}

impl LogManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_max_file_bytes(dir, MAX_FILE_BYTES)
    }

    /// Manager with a custom rotation threshold.
    pub fn with_max_file_bytes(dir: impl Into<PathBuf>, max_file_bytes: u64) -> Self {
        Self {
            dir: dir.into(),
            max_file_bytes,
            files: Mutex::new(HashMap::new()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of a server's log file. Always inside [`dir`](Self::dir) and
    /// never the aggregate error log.
    pub fn server_log_path(&self, server: &str) -> PathBuf {
        self.dir.join(format!("{}.log", file_stem(server)))
    }

    /// Path of the aggregate stderr log.
    pub fn errors_log_path(&self) -> PathBuf {
        self.dir.join(ERRORS_FILE)
    }

    /// Queue one line. Triggers a background flush when a buffer is full
    /// or stale; must be called from within a Tokio runtime.
    pub fn record(self: &Arc<Self>, server: &str, stream: Stream, line: &str) {
        let now = Instant::now();
        let stamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let mut due = Vec::new();

        {
            let mut files = self.lock_files();
            let target = LogTarget::Server(server.to_string());
            let state = files
                .entry(target.clone())
                .or_insert_with(|| FileState::new(now));
            if state.buffer.push(format!("{stamp} [{stream}] {line}"), now) {
                due.push(target);
            }

            if stream == Stream::Stderr {
                let state = files
                    .entry(LogTarget::Errors)
                    .or_insert_with(|| FileState::new(now));
                if state.buffer.push(format!("{stamp} [{server}] {line}"), now) {
                    due.push(LogTarget::Errors);
                }
            }
        }

        for target in due {
            let this = Arc::clone(self);
            tokio::spawn(async move { this.flush_target(&target).await });
        }
    }

    /// Flush every buffer that has been pending for at least a second.
    pub async fn flush_due(&self) {
        let now = Instant::now();
        let due: Vec<LogTarget> = self
            .lock_files()
            .iter()
            .filter(|(_, state)| state.buffer.is_due(now))
            .map(|(target, _)| target.clone())
            .collect();

        for target in due {
            self.flush_target(&target).await;
        }
    }

    /// Flush everything pending.
    pub async fn flush_all(&self) {
        let targets: Vec<LogTarget> = self.lock_files().keys().cloned().collect();
        for target in targets {
            self.flush_target(&target).await;
        }
    }

    /// Flush a server's pending lines (and the error log) and forget its state.
    ///
    /// The state is detached before its last batch is written, so a line
    /// recorded concurrently lands in a fresh buffer instead of being lost.
    pub async fn release(&self, server: &str) {
        let target = LogTarget::Server(server.to_string());
        let detached = self.lock_files().remove(&target);

        if let Some(mut state) = detached {
            let io = Arc::clone(&state.io);
            let _guard = io.lock().await;
            if !state.buffer.is_empty() {
                let now = Instant::now();
                let lines = state.buffer.take(now);
                let check_rotation = state.gate.should_check(now);
                self.write_batch(&target, &lines, check_rotation).await;
            }
        }

        self.flush_target(&LogTarget::Errors).await;
    }

    /// Flush all buffers; called on supervisor shutdown.
    pub async fn shutdown(&self) {
        self.flush_all().await;
    }

    /// Run [`flush_due`](Self::flush_due) every second until cancelled.
    pub fn spawn_flusher(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(FLUSH_INTERVAL);
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    _ = ticker.tick() => this.flush_due().await,
                }
            }
            this.flush_all().await;
        })
    }

    async fn flush_target(&self, target: &LogTarget) {
        let Some(io) = self.lock_files().get(target).map(|s| Arc::clone(&s.io)) else {
            return;
        };
        let _guard = io.lock().await;

        let now = Instant::now();
        let (lines, check_rotation) = {
            let mut files = self.lock_files();
            let Some(state) = files.get_mut(target) else {
                return;
            };
            if state.buffer.is_empty() {
                return;
            }
            (state.buffer.take(now), state.gate.should_check(now))
        };

        self.write_batch(target, &lines, check_rotation).await;
    }

    async fn write_batch(&self, target: &LogTarget, lines: &[String], check_rotation: bool) {
        let path = match target {
            LogTarget::Server(name) => self.server_log_path(name),
            LogTarget::Errors => self.errors_log_path(),
        };

        if let Err(e) = self.append(&path, lines, check_rotation).await {
            warn!(path = %path.display(), error = %e, dropped = lines.len(), "Failed to write log lines");
        }
    }

    async fn append(&self, path: &Path, lines: &[String], check_rotation: bool) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;

        if check_rotation && rotate_if_needed(path, self.max_file_bytes).await? {
            debug!(path = %path.display(), "Rotated log file");
        }

        let mut body = lines.join("\n");
        body.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        file.write_all(body.as_bytes()).await?;
        file.flush().await
    }

    fn lock_files(&self) -> MutexGuard<'_, HashMap<LogTarget, FileState>> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// File name stem for a server's log: path separators are replaced and
/// names that could leave the directory or hit a shared file get a prefix.
fn file_stem(server: &str) -> String {
    let stem = server.replace(['/', '\\'], "_");
    let reserved = ERRORS_FILE
        .strip_suffix(".log")
        .is_some_and(|r| stem.eq_ignore_ascii_case(r));
    if stem.is_empty() || stem.starts_with('.') || reserved {
        format!("server-{stem}")
    } else {
        stem
    }
}
