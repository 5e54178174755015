//! Newline-delimited JSON-RPC 2.0 transport over a child's stdio.
//!
//! - `frame`: reassembles lines from arbitrary stdout chunks
//! - `message`: wire types
//! - `channel`: request/response correlation, timeouts, cancellation
//! - `session`: the `initialize` handshake

mod channel;
mod frame;
mod message;
mod session;

use thiserror::Error;

pub use channel::RpcChannel;
pub use frame::{FrameBuffer, HARD_CAP_BYTES, WARN_THRESHOLD_BYTES};
pub use message::{Incoming, RpcErrorObject};
pub use session::{PROTOCOL_VERSION, initialize};

/// Errors surfaced to callers of [`RpcChannel::send_request`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// No response arrived within the request timeout.
    #[error("Request '{method}' timed out after {timeout_ms} ms")]
    Timeout { method: String, timeout_ms: u64 },

    /// The server answered with a JSON-RPC error object.
    #[error("[{code}] {message}")]
    Rpc { code: i64, message: String },

    /// Writing to the server's stdin failed.
    #[error("Failed to write request: {0}")]
    Write(String),

    /// The server is being stopped; all in-flight requests are rejected.
    #[error("server is stopping")]
    Stopping,

    /// The server closed its stdout (process gone).
    #[error("Server closed the connection")]
    Closed,

    /// The request could not be serialized.
    #[error("Failed to serialize request: {0}")]
    Serialize(String),
}
