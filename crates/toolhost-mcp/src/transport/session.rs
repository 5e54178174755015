//! MCP session handshake.

use std::time::Duration;

use serde_json::{Value, json};
use tracing::debug;

use super::{RpcChannel, TransportError};

/// Protocol revision announced in `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Upper bound on waiting for an `initialize` answer.
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Run the `initialize` / `notifications/initialized` exchange.
///
/// Servers that do not implement `initialize` answer with an RPC error or
/// never answer at all; both are tolerated and the session proceeds
/// without capabilities. The wait is capped at [`HANDSHAKE_TIMEOUT`].
/// Other transport failures are returned.
pub async fn initialize(channel: &RpcChannel, timeout: Duration) -> Result<Value, TransportError> {
    let params = json!({
        "protocolVersion": PROTOCOL_VERSION,
        "clientInfo": {
            "name": "toolhost",
            "version": env!("CARGO_PKG_VERSION"),
        },
        "capabilities": {},
    });

    match channel
        .send_request("initialize", params, timeout.min(HANDSHAKE_TIMEOUT))
        .await
    {
        Ok(result) => {
            channel.notify("notifications/initialized", json!({})).await?;
            Ok(result)
        }
        Err(TransportError::Rpc { code, message }) => {
            debug!(server = %channel.server(), code, %message, "Server rejected initialize, continuing");
            Ok(Value::Null)
        }
        Err(TransportError::Timeout { timeout_ms, .. }) => {
            debug!(server = %channel.server(), timeout_ms, "Server ignored initialize, continuing");
            Ok(Value::Null)
        }
        Err(e) => Err(e),
    }
}
