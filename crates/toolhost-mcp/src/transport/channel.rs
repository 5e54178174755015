//! Request/response correlation over a single server's stdio.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use super::TransportError;
use super::frame::FrameBuffer;
use super::message::{Incoming, JSONRPC_VERSION, Notification, Request};

type Completion = oneshot::Sender<Result<Value, TransportError>>;
type Writer = Box<dyn AsyncWrite + Send + Unpin>;

const READ_CHUNK: usize = 8 * 1024;

/// A JSON-RPC channel bound to one server process.
///
/// Ids start at 1 and increase monotonically for the channel's lifetime.
/// A channel is discarded together with its process, so ids are never
/// reused for the same stream.
pub struct RpcChannel {
    server: String,
    writer: tokio::sync::Mutex<Writer>,
    pending: Mutex<HashMap<u64, Completion>>,
    frames: Mutex<FrameBuffer>,
    next_id: AtomicU64,
    closed: AtomicBool,
}

impl RpcChannel {
    pub fn new(server: impl Into<String>, writer: impl AsyncWrite + Send + Unpin + 'static) -> Self {
        Self {
            server: server.into(),
            writer: tokio::sync::Mutex::new(Box::new(writer)),
            pending: Mutex::new(HashMap::new()),
            frames: Mutex::new(FrameBuffer::new()),
            next_id: AtomicU64::new(1),
            closed: AtomicBool::new(false),
        }
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    /// Spawn the task that reads `reader` until EOF and dispatches responses.
    ///
    /// `tap` sees every complete line (used to mirror stdout into the logs).
    /// On EOF every pending request is rejected with [`TransportError::Closed`].
    pub fn spawn_reader<R, F>(self: &Arc<Self>, mut reader: R, tap: F) -> JoinHandle<()>
    where
        R: AsyncRead + Send + Unpin + 'static,
        F: Fn(&str) + Send + 'static,
    {
        let channel = Arc::clone(self);
        tokio::spawn(async move {
            let mut chunk = vec![0u8; READ_CHUNK];
            loop {
                match reader.read(&mut chunk).await {
                    Ok(0) => break,
                    Ok(n) => {
                        let lines = channel.lock_frames().push(&chunk[..n]);
                        for line in lines {
                            tap(&line);
                            channel.dispatch(&line);
                        }
                    }
                    Err(e) => {
                        warn!(server = %channel.server, error = %e, "Failed reading server stdout");
                        break;
                    }
                }
            }
            debug!(server = %channel.server, "Server stdout closed");
            channel.close(&TransportError::Closed);
        })
    }

    /// Send a request and wait for its response, bounded by `timeout`.
    pub async fn send_request(
        &self,
        method: &str,
        params: Value,
        timeout: Duration,
    ) -> Result<Value, TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let request = Request {
            jsonrpc: JSONRPC_VERSION,
            id,
            method,
            params: &params,
        };
        let mut line = serde_json::to_vec(&request)
            .map_err(|e| TransportError::Serialize(e.to_string()))?;
        line.push(b'\n');

        let (tx, rx) = oneshot::channel();
        self.lock_pending().insert(id, tx);

        // close() may have drained the map between the check above and the insert
        if self.is_closed() {
            self.evict(id);
            return Err(TransportError::Closed);
        }

        trace!(server = %self.server, id, method, "Sending request");

        let exchange = async {
            self.write_line(&line)
                .await
                .map_err(|e| TransportError::Write(e.to_string()))?;
            rx.await.unwrap_or(Err(TransportError::Closed))
        };

        match tokio::time::timeout(timeout, exchange).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                self.evict(id);
                Err(e)
            }
            Err(_) => {
                self.evict(id);
                let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
                warn!(server = %self.server, id, method, timeout_ms, "Request timed out");
                Err(TransportError::Timeout {
                    method: method.to_string(),
                    timeout_ms,
                })
            }
        }
    }

    /// Send a notification; no response is expected.
    pub async fn notify(&self, method: &str, params: Value) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }

        let notification = Notification {
            jsonrpc: JSONRPC_VERSION,
            method,
            params: &params,
        };
        let mut line = serde_json::to_vec(&notification)
            .map_err(|e| TransportError::Serialize(e.to_string()))?;
        line.push(b'\n');

        self.write_line(&line)
            .await
            .map_err(|e| TransportError::Write(e.to_string()))
    }

    /// Reject every pending request with `error` without closing the channel.
    pub fn reject_all(&self, error: &TransportError) -> usize {
        let drained: Vec<Completion> = self.lock_pending().drain().map(|(_, tx)| tx).collect();
        let count = drained.len();
        for tx in drained {
            // the caller may already have given up
            let _ = tx.send(Err(error.clone()));
        }
        if count > 0 {
            debug!(server = %self.server, count, error = %error, "Rejected pending requests");
        }
        count
    }

    /// Refuse new requests and reject the pending ones.
    pub fn close(&self, error: &TransportError) -> usize {
        self.closed.store(true, Ordering::SeqCst);
        self.reject_all(error)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Drop any partially received stdout data.
    pub fn clear_buffer(&self) {
        self.lock_frames().clear();
    }

    /// Number of requests awaiting a response.
    pub fn pending_count(&self) -> usize {
        self.lock_pending().len()
    }

    fn dispatch(&self, line: &str) {
        let message = match Incoming::parse(line) {
            Ok(message) => message,
            Err(e) => {
                debug!(server = %self.server, error = %e, "Skipping non-JSON-RPC output");
                return;
            }
        };

        match message {
            Incoming::Response { id, outcome } => {
                let Some(tx) = self.lock_pending().remove(&id) else {
                    warn!(server = %self.server, id, "Dropping response with unknown id");
                    return;
                };
                let result = outcome.map_err(|e| TransportError::Rpc {
                    code: e.code,
                    message: e.message,
                });
                let _ = tx.send(result);
            }
            Incoming::ServerInitiated { method } => {
                debug!(server = %self.server, method = %method, "Ignoring server-initiated message");
            }
            Incoming::ForeignId { id } => {
                warn!(server = %self.server, %id, "Dropping response with unrecognized id");
            }
        }
    }

    async fn write_line(&self, line: &[u8]) -> std::io::Result<()> {
        let mut writer = self.writer.lock().await;
        writer.write_all(line).await?;
        writer.flush().await
    }

    fn evict(&self, id: u64) {
        self.lock_pending().remove(&id);
    }

    fn lock_pending(&self) -> MutexGuard<'_, HashMap<u64, Completion>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_frames(&self) -> MutexGuard<'_, FrameBuffer> {
        self.frames.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
