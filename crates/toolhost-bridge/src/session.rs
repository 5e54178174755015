//! Per-connection handshake state.
//!
//! A [`Session`] lives for exactly one WebSocket connection. It turns each
//! inbound frame into at most one [`Action`] for the connection loop and
//! never touches the socket itself.

use serde_json::Value;
use toolhost_core::BridgeCredential;
use tracing::{debug, info, warn};

use crate::auth;
use crate::error::BridgeError;
use crate::protocol::{ClientMessage, ServerMessage, parse_server_message};

/// Error text for tool requests that arrive before `challenge_verified`.
pub const NOT_VERIFIED: &str = "bridge session is not verified";

/// What the connection loop should do in response to a frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Send a message back immediately.
    Reply(ClientMessage),
    /// The session just became verified.
    Verified,
    /// Run a tool and answer with a `tool_result` for `id`.
    Execute {
        id: Value,
        server: String,
        tool: String,
        args: Value,
    },
}

#[derive(Debug)]
pub struct Session {
    credential: BridgeCredential,
    verified: bool,
}

impl Session {
    pub const fn new(credential: BridgeCredential) -> Self {
        Self {
            credential,
            verified: false,
        }
    }

    pub const fn is_verified(&self) -> bool {
        self.verified
    }

    /// Handle one text frame.
    pub fn handle_text(&mut self, text: &str) -> Option<Action> {
        match parse_server_message(text) {
            Ok(message) => self.handle(message),
            Err(failure) => {
                warn!(error = %failure.error, "Ignoring unrecognized bridge message");
                failure.tool_execute_id.map(|id| {
                    Action::Reply(ClientMessage::tool_failure(
                        id,
                        format!("malformed tool_execute: {}", failure.error),
                    ))
                })
            }
        }
    }

    pub fn handle(&mut self, message: ServerMessage) -> Option<Action> {
        match message {
            ServerMessage::Connected { session_id } => {
                info!(session_id = session_id.as_deref().unwrap_or("-"), "Bridge connected");
                None
            }
            ServerMessage::Challenge { challenge } => {
                debug!("Answering bridge challenge");
                Some(Action::Reply(ClientMessage::ChallengeResponse {
                    response: auth::challenge_response(&challenge, &self.credential),
                }))
            }
            ServerMessage::ChallengeVerified => {
                info!("Bridge session verified");
                self.verified = true;
                Some(Action::Verified)
            }
            ServerMessage::Pong { timestamp } => {
                debug!(timestamp, "Bridge pong");
                None
            }
            ServerMessage::Error { error } => {
                warn!(error = %error, "Bridge reported an error");
                None
            }
            ServerMessage::ToolExecute {
                id,
                server_name,
                tool_name,
                args,
            } => {
                if self.verified {
                    Some(Action::Execute {
                        id,
                        server: server_name,
                        tool: tool_name,
                        args,
                    })
                } else {
                    warn!(server = %server_name, tool = %tool_name, "Rejecting tool request before verification");
                    Some(Action::Reply(ClientMessage::tool_failure(id, NOT_VERIFIED)))
                }
            }
        }
    }

    /// Classify a remote close: before verification it is an authentication
    /// failure, afterwards a plain disconnect.
    pub fn closed(&self, reason: &str) -> BridgeError {
        if self.verified {
            BridgeError::Connection(format!("closed by remote: {reason}"))
        } else {
            BridgeError::Authentication(format!("closed before verification: {reason}"))
        }
    }
}
