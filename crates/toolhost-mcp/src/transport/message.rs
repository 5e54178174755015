//! JSON-RPC 2.0 wire types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";

/// Outgoing request.
#[derive(Debug, Serialize)]
pub struct Request<'a> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    pub params: &'a Value,
}

/// Outgoing notification (no id, no response).
#[derive(Debug, Serialize)]
pub struct Notification<'a> {
    pub jsonrpc: &'static str,
    pub method: &'a str,
    pub params: &'a Value,
}

/// JSON-RPC error member.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

/// Any inbound message, before classification.
#[derive(Debug, Deserialize)]
struct RawMessage {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

/// A classified inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
    /// A response to one of our requests.
    Response {
        id: u64,
        outcome: Result<Value, RpcErrorObject>,
    },
    /// A request or notification initiated by the server.
    ServerInitiated { method: String },
    /// A response whose id is not one we could have issued.
    ForeignId { id: Value },
}

impl Incoming {
    /// Parse one line of server output.
    pub fn parse(line: &str) -> Result<Self, serde_json::Error> {
        let raw: RawMessage = serde_json::from_str(line)?;

        if let Some(method) = raw.method {
            return Ok(Self::ServerInitiated { method });
        }

        let id = raw.id.unwrap_or(Value::Null);
        let Some(id) = id.as_u64() else {
            return Ok(Self::ForeignId { id });
        };

        let outcome = match raw.error {
            Some(err) => Err(err),
            None => Ok(raw.result),
        };
        Ok(Self::Response { id, outcome })
    }
}
