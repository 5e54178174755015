//! Bridge wire messages.
//!
//! Every frame is a JSON text message with a `type` tag and camelCase fields.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use toolhost_core::ToolCallResult;

/// Messages sent by the remote endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    Connected {
        #[serde(default)]
        session_id: Option<String>,
    },
    Challenge {
        challenge: String,
    },
    ChallengeVerified,
    Pong {
        #[serde(default)]
        timestamp: Option<i64>,
    },
    ToolExecute {
        /// Echoed back verbatim in the matching `tool_result`.
        id: Value,
        server_name: String,
        tool_name: String,
        #[serde(default)]
        args: Value,
    },
    Error {
        #[serde(default)]
        error: String,
    },
}

/// Messages sent by this client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    Ping {
        timestamp: i64,
    },
    ChallengeResponse {
        response: String,
    },
    ToolResult {
        id: Value,
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

impl ClientMessage {
    pub fn ping_now() -> Self {
        Self::Ping {
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// A `tool_result` carrying an executor outcome.
    pub fn tool_result(id: Value, outcome: ToolCallResult) -> Self {
        Self::ToolResult {
            id,
            success: outcome.success,
            result: outcome.result,
            error: outcome.error,
        }
    }

    /// A failed `tool_result`.
    pub fn tool_failure(id: Value, error: impl Into<String>) -> Self {
        Self::ToolResult {
            id,
            success: false,
            result: None,
            error: Some(error.into()),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// A text frame that did not parse as a [`ServerMessage`].
#[derive(Debug)]
pub struct ParseFailure {
    pub error: serde_json::Error,
    /// The `id` of the frame, if it looked like a `tool_execute`, so the
    /// request can still be answered.
    pub tool_execute_id: Option<Value>,
}

/// Parse a text frame.
pub fn parse_server_message(text: &str) -> Result<ServerMessage, ParseFailure> {
    serde_json::from_str(text).map_err(|error| {
        let tool_execute_id = serde_json::from_str::<Value>(text).ok().and_then(|raw| {
            if raw.get("type").and_then(Value::as_str) == Some("tool_execute") {
                raw.get("id").cloned()
            } else {
                None
            }
        });
        ParseFailure {
            error,
            tool_execute_id,
        }
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_parse_tool_execute() {
        let msg = parse_server_message(
            r#"{"type":"tool_execute","id":"req-1","serverName":"fs","toolName":"read_file","args":{"path":"/tmp"}}"#,
        )
        .unwrap();

        assert_eq!(
            msg,
            ServerMessage::ToolExecute {
                id: json!("req-1"),
                server_name: "fs".to_string(),
                tool_name: "read_file".to_string(),
                args: json!({"path": "/tmp"}),
            }
        );
    }

    #[test]
    fn test_parse_unit_and_optional_fields() {
        assert_eq!(
            parse_server_message(r#"{"type":"challenge_verified"}"#).unwrap(),
            ServerMessage::ChallengeVerified
        );
        assert_eq!(
            parse_server_message(r#"{"type":"connected","sessionId":"s1"}"#).unwrap(),
            ServerMessage::Connected {
                session_id: Some("s1".to_string())
            }
        );
        assert!(matches!(
            parse_server_message(r#"{"type":"tool_execute","id":7,"serverName":"fs","toolName":"t"}"#),
            Ok(ServerMessage::ToolExecute { args: Value::Null, .. })
        ));
    }

    #[test]
    fn test_malformed_tool_execute_keeps_id() {
        let failure = parse_server_message(r#"{"type":"tool_execute","id":"req-9"}"#).unwrap_err();
        assert_eq!(failure.tool_execute_id, Some(json!("req-9")));

        let failure = parse_server_message(r#"{"type":"mystery"}"#).unwrap_err();
        assert_eq!(failure.tool_execute_id, None);
    }

    #[test]
    fn test_client_messages_serialize_with_type_tag() {
        let response = ClientMessage::ChallengeResponse {
            response: "abc".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"type": "challenge_response", "response": "abc"})
        );

        let failure = ClientMessage::tool_failure(json!("req-1"), "boom");
        assert_eq!(
            serde_json::to_value(&failure).unwrap(),
            json!({"type": "tool_result", "id": "req-1", "success": false, "error": "boom"})
        );

        let ok = ClientMessage::tool_result(json!(5), ToolCallResult::success(json!({"content": []}), 10));
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            json!({"type": "tool_result", "id": 5, "success": true, "result": {"content": []}})
        );
    }
}
