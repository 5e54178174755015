//! Per-file pending line queue.

use std::time::Duration;

use tokio::time::Instant;

/// Flush once this many lines are pending.
pub const FLUSH_LINES: usize = 100;
/// Flush once this much time has passed since the last flush.
pub const FLUSH_INTERVAL: Duration = Duration::from_secs(1);

/// Lines waiting to be appended to one log file.
#[derive(Debug)]
pub struct LogLineBuffer {
    lines: Vec<String>,
    last_flush: Instant,
}

impl LogLineBuffer {
    pub fn new(now: Instant) -> Self {
        Self {
            lines: Vec::new(),
            last_flush: now,
        }
    }

    /// Queue a line; returns `true` when the buffer should be flushed.
    pub fn push(&mut self, line: String, now: Instant) -> bool {
        self.lines.push(line);
        self.lines.len() >= FLUSH_LINES || self.is_due(now)
    }

    /// Non-empty and older than [`FLUSH_INTERVAL`].
    pub fn is_due(&self, now: Instant) -> bool {
        !self.lines.is_empty() && now.duration_since(self.last_flush) >= FLUSH_INTERVAL
    }

    /// Take every pending line and restart the flush timer.
    pub fn take(&mut self, now: Instant) -> Vec<String> {
        self.last_flush = now;
        std::mem::take(&mut self.lines)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
