//! Reconnect delay schedule.

use std::time::Duration;

use backon::{BackoffBuilder, ExponentialBackoff, ExponentialBuilder};

pub const MIN_DELAY: Duration = Duration::from_secs(1);
pub const MAX_DELAY: Duration = Duration::from_secs(30);

/// Exponential reconnect delays (1 s, 2 s, 4 s ... capped at 30 s) that
/// start over once a session is verified.
#[derive(Debug)]
pub struct ReconnectBackoff {
    builder: ExponentialBuilder,
    current: ExponentialBackoff,
    attempts: u32,
}

impl ReconnectBackoff {
    pub fn new() -> Self {
        Self::with_delays(MIN_DELAY, MAX_DELAY)
    }

    pub fn with_delays(min: Duration, max: Duration) -> Self {
        let builder = ExponentialBuilder::default()
            .with_min_delay(min)
            .with_max_delay(max)
            .with_factor(2.0)
            .with_max_times(usize::MAX);
        Self {
            current: builder.build(),
            builder,
            attempts: 0,
        }
    }

    /// Delay before the next reconnect attempt.
    pub fn next_delay(&mut self) -> Duration {
        self.attempts = self.attempts.saturating_add(1);
        self.current.next().unwrap_or(MAX_DELAY)
    }

    /// Reconnects attempted since the last reset.
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Start the schedule over.
    pub fn reset(&mut self) {
        self.current = self.builder.build();
        self.attempts = 0;
    }
}

impl Default for ReconnectBackoff {
    fn default() -> Self {
        Self::new()
    }
}
