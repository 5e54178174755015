//! Periodic status snapshots for UI and log consumers.
//!
//! The broadcaster polls a [`StatusSource`] on a fixed interval and fans the
//! result out to every subscriber. Snapshots are immutable and shared.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use toolhost_core::{StatusSnapshot, StatusSource};
use tracing::{debug, trace};

/// Default polling period.
pub const POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Broadcast channel capacity for snapshots
const CHANNEL_CAPACITY: usize = 16;

/// Publishes [`StatusSnapshot`]s to subscribers.
pub struct StatusBroadcaster {
    sender: broadcast::Sender<Arc<StatusSnapshot>>,
    interval: Duration,
}

impl StatusBroadcaster {
    pub fn new() -> Self {
        Self::with_interval(POLL_INTERVAL)
    }

    pub fn with_interval(interval: Duration) -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender, interval }
    }

    /// Subscribe to future snapshots.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<StatusSnapshot>> {
        self.sender.subscribe()
    }

    /// Get number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Publish one snapshot to the current subscribers.
    pub fn publish(&self, snapshot: StatusSnapshot) {
        if self.sender.receiver_count() > 0 {
            trace!(servers = snapshot.servers.len(), "Publishing status snapshot");
            let _ = self.sender.send(Arc::new(snapshot));
        }
    }

    /// Poll `source` until `cancel` fires. The first snapshot is published
    /// immediately.
    pub fn spawn<S>(self: &Arc<Self>, source: Arc<S>, cancel: CancellationToken) -> JoinHandle<()>
    where
        S: StatusSource + ?Sized + 'static,
    {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(this.interval);
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    _ = ticker.tick() => this.publish(source.snapshot().await),
                }
            }
            debug!("Status broadcaster stopped");
        })
    }
}

impl Default for StatusBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use toolhost_core::{ServerStatus, ServerStatusInfo};

    use super::*;

    #[derive(Default)]
    struct CountingSource {
        polls: AtomicUsize,
    }

    #[async_trait]
    impl StatusSource for CountingSource {
        async fn snapshot(&self) -> StatusSnapshot {
            let n = self.polls.fetch_add(1, Ordering::SeqCst);
            StatusSnapshot::new(vec![ServerStatusInfo {
                name: format!("server-{n}"),
                status: ServerStatus::Running,
                enabled: true,
                auto_start: true,
                pid: None,
                started_at: None,
                crash_count: 0,
                last_crash_at: None,
                last_error: None,
                tool_count: 0,
            }])
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_publishes_on_interval() {
        let broadcaster = Arc::new(StatusBroadcaster::new());
        let source = Arc::new(CountingSource::default());
        let mut rx = broadcaster.subscribe();
        let cancel = CancellationToken::new();
        let task = broadcaster.spawn(Arc::clone(&source), cancel.clone());

        let first = rx.recv().await.unwrap();
        assert_eq!(first.servers[0].name, "server-0");

        let before = tokio::time::Instant::now();
        let second = rx.recv().await.unwrap();
        assert_eq!(second.servers[0].name, "server-1");
        assert!(before.elapsed() >= POLL_INTERVAL);

        cancel.cancel();
        task.await.unwrap();
        assert_eq!(source.polls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_subscriber_sees_same_snapshot() {
        let broadcaster = Arc::new(StatusBroadcaster::with_interval(Duration::from_secs(1)));
        let mut a = broadcaster.subscribe();
        let mut b = broadcaster.subscribe();
        assert_eq!(broadcaster.subscriber_count(), 2);

        let cancel = CancellationToken::new();
        let task = broadcaster.spawn(Arc::new(CountingSource::default()), cancel.clone());

        let from_a = a.recv().await.unwrap();
        let from_b = b.recv().await.unwrap();
        assert!(Arc::ptr_eq(&from_a, &from_b));

        cancel.cancel();
        task.await.unwrap();
    }

    #[test]
    fn test_publish_without_subscribers_is_noop() {
        let broadcaster = StatusBroadcaster::new();
        broadcaster.publish(StatusSnapshot::new(Vec::new()));
        assert_eq!(broadcaster.subscriber_count(), 0);
    }
}
