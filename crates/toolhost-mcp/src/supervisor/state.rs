//! Per-server lifecycle state machine.
//!
//! ```text
//! stopped -> starting -> running -> {error | crashed} -> stopped
//! ```
//!
//! Every start and every stop bumps a generation number. Exit events carry
//! the generation of the process they belong to, so an exit from an older
//! process can never change the state of a newer one.

use chrono::{DateTime, Utc};
use toolhost_core::ServerStatus;

/// How an exit event was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitKind {
    /// Exited while running.
    Crashed,
    /// Exited in any other state.
    Stopped,
    /// Event from a process that is no longer current.
    Stale,
}

/// Runtime bookkeeping for one configured server.
#[derive(Debug, Clone, Default)]
pub struct RuntimeState {
    pub status: ServerStatus,
    pub pid: Option<u32>,
    pub started_at: Option<DateTime<Utc>>,
    pub crash_count: u32,
    pub last_crash_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    /// Description of the most recent exit of the current generation.
    pub last_exit: Option<String>,
    pub generation: u64,
}

impl RuntimeState {
    /// A start or stop is in progress or a process exists.
    pub fn is_active(&self) -> bool {
        matches!(self.status, ServerStatus::Starting | ServerStatus::Running)
    }

    /// `stopped | error | crashed -> starting`; returns the new generation.
    pub fn begin_start(&mut self) -> u64 {
        self.generation += 1;
        self.status = ServerStatus::Starting;
        self.pid = None;
        self.started_at = None;
        self.last_error = None;
        self.last_exit = None;
        self.generation
    }

    /// Record the pid of a freshly spawned process.
    pub fn spawned(&mut self, pid: Option<u32>) {
        self.pid = pid;
    }

    /// `starting -> error` when the OS refused to spawn.
    pub fn spawn_failed(&mut self, reason: String) {
        self.status = ServerStatus::Error;
        self.pid = None;
        self.last_error = Some(reason);
    }

    /// `starting -> running` after the stabilization window.
    pub fn mark_running(&mut self, now: DateTime<Utc>) {
        self.status = ServerStatus::Running;
        self.started_at = Some(now);
    }

    /// Exit observed during the stabilization window: `-> error`.
    pub fn startup_failed(&mut self, reason: String) {
        self.status = ServerStatus::Error;
        self.pid = None;
        self.last_error = Some(reason);
    }

    /// Apply an exit event from the process of `generation`.
    pub fn on_exit(&mut self, generation: u64, now: DateTime<Utc>, description: String) -> ExitKind {
        if generation != self.generation {
            return ExitKind::Stale;
        }

        self.pid = None;
        self.last_exit = Some(description.clone());

        if self.status == ServerStatus::Running {
            self.status = ServerStatus::Crashed;
            self.crash_count += 1;
            self.last_crash_at = Some(now);
            self.last_error = Some(description);
            ExitKind::Crashed
        } else {
            self.status = ServerStatus::Stopped;
            ExitKind::Stopped
        }
    }

    /// Any state `-> stopped`; invalidates the current generation.
    pub fn mark_stopped(&mut self) {
        self.generation += 1;
        self.status = ServerStatus::Stopped;
        self.pid = None;
        self.started_at = None;
    }
}
