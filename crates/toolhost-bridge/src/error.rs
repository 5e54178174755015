//! Bridge error types.

use thiserror::Error;
use toolhost_core::CredentialError;

/// Errors from a single bridge connection attempt.
///
/// Every variant except [`BridgeError::InsecureEndpoint`] and
/// [`BridgeError::InvalidUrl`] is retried with backoff by the client loop.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// A non-loopback endpoint without TLS.
    #[error("Refusing insecure bridge endpoint {0}: use wss:// or a TLS-terminating proxy")]
    InsecureEndpoint(String),

    #[error("Invalid bridge URL: {0}")]
    InvalidUrl(String),

    /// The token provider could not supply a credential.
    #[error("Bridge credential unavailable: {0}")]
    Credential(#[from] CredentialError),

    /// Connecting failed or an established connection dropped.
    #[error("Bridge connection error: {0}")]
    Connection(String),

    /// The remote closed the connection before the session was verified.
    #[error("Bridge authentication failed: {0}")]
    Authentication(String),

    /// The remote sent something we cannot work with.
    #[error("Bridge protocol error: {0}")]
    Protocol(String),
}

impl BridgeError {
    /// Whether retrying the same configuration can ever succeed.
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::InsecureEndpoint(_) | Self::InvalidUrl(_))
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for BridgeError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Connection(e.to_string())
    }
}
