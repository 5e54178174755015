//! Port definitions (trait abstractions) at the seams between crates.
//!
//! The supervisor implements [`ToolExecutor`] and [`StatusSource`]; the
//! bridge consumes them together with a [`TokenProvider`] supplied by the
//! host application. None of these traits mention processes, sockets or
//! files.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::domain::{StatusSnapshot, ToolCallResult};
use crate::error::SupervisorError;

/// Executes a tool on a named server.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Run `tool` on `server` with `args`.
    ///
    /// `Err` means the call never produced a tool response (unknown server,
    /// not running, transport failure). A tool that reports its own failure
    /// yields `Ok` with `success == false`.
    async fn execute(
        &self,
        server: &str,
        tool: &str,
        args: Value,
    ) -> Result<ToolCallResult, SupervisorError>;
}

/// Produces status snapshots on demand.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn snapshot(&self) -> StatusSnapshot;
}

/// Identity material used for the bridge handshake.
#[derive(Clone, PartialEq, Eq)]
pub struct BridgeCredential {
    /// Bearer token sent in the `Authorization` header.
    pub token: String,
    pub user_id: String,
    pub token_version: u64,
    /// Issue time of the token, as seconds since the Unix epoch.
    pub issued_at: i64,
}

impl std::fmt::Debug for BridgeCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeCredential")
            .field("token", &"<redacted>")
            .field("user_id", &self.user_id)
            .field("token_version", &self.token_version)
            .field("issued_at", &self.issued_at)
            .finish()
    }
}

/// Failure to obtain a bridge credential.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// No credential is configured (user signed out, variable unset).
    #[error("No bridge credential available: {0}")]
    Unavailable(String),

    /// A credential exists but is malformed.
    #[error("Invalid bridge credential: {0}")]
    Invalid(String),
}

/// Supplies bearer credentials for the bridge. Called once per connection
/// attempt so that refreshed tokens are picked up on reconnect.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn credential(&self) -> Result<BridgeCredential, CredentialError>;
}
