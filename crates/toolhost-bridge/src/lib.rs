//! Remote bridge for toolhost.
//!
//! Connects outward to a WebSocket endpoint, proves the session identity
//! with a challenge-response handshake, then relays `tool_execute`
//! requests to a [`toolhost_core::ToolExecutor`] and answers each one with a
//! `tool_result`. Disconnects are retried with exponential backoff.

pub mod auth;
pub mod backoff;
pub mod client;
pub mod error;
pub mod protocol;
pub mod security;
pub mod session;

pub use backoff::ReconnectBackoff;
pub use client::{BridgeClient, BridgeConfig, PING_INTERVAL};
pub use error::BridgeError;
pub use protocol::{ClientMessage, ServerMessage};
pub use security::validate_endpoint;
