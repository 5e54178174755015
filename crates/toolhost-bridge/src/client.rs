//! Reconnecting WebSocket client.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{Sink, SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_util::sync::CancellationToken;
use toolhost_core::{CredentialError, TokenProvider, ToolExecutor};
use tracing::{debug, info, warn};
use url::Url;

use crate::backoff::{MAX_DELAY, MIN_DELAY, ReconnectBackoff};
use crate::error::BridgeError;
use crate::protocol::ClientMessage;
use crate::security::validate_endpoint;
use crate::session::{Action, Session};

/// Heartbeat period.
pub const PING_INTERVAL: Duration = Duration::from_secs(30);

/// Outbound messages queued by tool executions.
const OUTBOX_CAPACITY: usize = 64;

/// Bridge client settings.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// `ws://` or `wss://` endpoint.
    pub url: String,
    /// Value of the forwarded-protocol header set by a reverse proxy, if any.
    pub forwarded_proto: Option<String>,
    pub ping_interval: Duration,
    pub reconnect_min: Duration,
    pub reconnect_max: Duration,
}

impl BridgeConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            forwarded_proto: None,
            ping_interval: PING_INTERVAL,
            reconnect_min: MIN_DELAY,
            reconnect_max: MAX_DELAY,
        }
    }
}

/// Relays remote `tool_execute` requests into a [`ToolExecutor`].
pub struct BridgeClient {
    config: BridgeConfig,
    executor: Arc<dyn ToolExecutor>,
    tokens: Arc<dyn TokenProvider>,
}

impl BridgeClient {
    pub fn new(
        config: BridgeConfig,
        executor: Arc<dyn ToolExecutor>,
        tokens: Arc<dyn TokenProvider>,
    ) -> Self {
        Self {
            config,
            executor,
            tokens,
        }
    }

    /// Connect and keep reconnecting until `cancel` fires.
    ///
    /// Returns `Ok` on cancellation. Returns `Err` without retrying only when
    /// the endpoint itself is unacceptable.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), BridgeError> {
        let url = validate_endpoint(&self.config.url, self.config.forwarded_proto.as_deref())?;
        let mut backoff = ReconnectBackoff::with_delays(self.config.reconnect_min, self.config.reconnect_max);

        loop {
            match self.run_session(&url, &cancel, &mut backoff).await {
                Ok(()) => {
                    info!("Bridge stopped");
                    return Ok(());
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => warn!(error = %e, "Bridge disconnected"),
            }

            let delay = backoff.next_delay();
            info!(
                attempt = backoff.attempts(),
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "Reconnecting bridge"
            );
            tokio::select! {
                () = cancel.cancelled() => {
                    info!("Bridge stopped");
                    return Ok(());
                }
                () = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// One connection, from handshake to close. `Ok` means cancelled.
    async fn run_session(
        &self,
        url: &Url,
        cancel: &CancellationToken,
        backoff: &mut ReconnectBackoff,
    ) -> Result<(), BridgeError> {
        let credential = self.tokens.credential().await?;
        let request = authorized_request(url, &credential.token)?;

        debug!(url = %url, "Connecting bridge");
        let (socket, _response) = tokio::select! {
            () = cancel.cancelled() => return Ok(()),
            connected = tokio_tungstenite::connect_async(request) => connected?,
        };
        let (mut sink, mut stream) = socket.split();
        let (outbox, mut outgoing) = mpsc::channel::<ClientMessage>(OUTBOX_CAPACITY);
        let mut session = Session::new(credential);

        let period = self.config.ping_interval;
        let mut heartbeat = tokio::time::interval_at(Instant::now() + period, period);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    let _ = sink.send(Message::Close(None)).await;
                    return Ok(());
                }
                _ = heartbeat.tick() => send(&mut sink, &ClientMessage::ping_now()).await?,
                Some(message) = outgoing.recv() => send(&mut sink, &message).await?,
                frame = stream.next() => match frame {
                    Some(Ok(Message::Text(text))) => match session.handle_text(text.as_str()) {
                        Some(Action::Reply(reply)) => send(&mut sink, &reply).await?,
                        Some(Action::Verified) => backoff.reset(),
                        Some(Action::Execute { id, server, tool, args }) => {
                            self.spawn_execution(id, server, tool, args, outbox.clone());
                        }
                        None => {}
                    },
                    Some(Ok(Message::Close(frame))) => {
                        let reason = frame.map_or_else(String::new, |f| f.reason.as_str().to_string());
                        return Err(session.closed(&reason));
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                    None => return Err(session.closed("stream ended")),
                },
            }
        }
    }

    /// Run a tool on its own task; the result (or failure) is always queued
    /// as a `tool_result`.
    fn spawn_execution(
        &self,
        id: Value,
        server: String,
        tool: String,
        args: Value,
        outbox: mpsc::Sender<ClientMessage>,
    ) {
        let executor = Arc::clone(&self.executor);
        tokio::spawn(async move {
            debug!(server = %server, tool = %tool, "Executing bridged tool call");
            let label = format!("{server}/{tool}");
            let call = tokio::spawn(async move { executor.execute(&server, &tool, args).await });

            let reply = match call.await {
                Ok(Ok(outcome)) => ClientMessage::tool_result(id, outcome),
                Ok(Err(e)) => ClientMessage::tool_failure(id, e.to_string()),
                Err(e) => {
                    warn!(tool = %label, error = %e, "Bridged tool call aborted");
                    ClientMessage::tool_failure(id, format!("tool execution failed: {e}"))
                }
            };

            if outbox.send(reply).await.is_err() {
                debug!(tool = %label, "Connection closed before tool_result was sent");
            }
        });
    }
}

fn authorized_request(url: &Url, token: &str) -> Result<Request, BridgeError> {
    let mut request = url.as_str().into_client_request()?;
    let value = HeaderValue::from_str(&format!("Bearer {token}"))
        .map_err(|_| CredentialError::Invalid("token is not a valid header value".to_string()))?;
    request.headers_mut().insert(AUTHORIZATION, value);
    Ok(request)
}

async fn send<S>(sink: &mut S, message: &ClientMessage) -> Result<(), BridgeError>
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    let text = message
        .to_json()
        .map_err(|e| BridgeError::Protocol(e.to_string()))?;
    sink.send(Message::text(text)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_carries_bearer_token() {
        let url = Url::parse("ws://localhost:9000/bridge").unwrap();
        let request = authorized_request(&url, "abc123").unwrap();
        assert_eq!(request.headers()[AUTHORIZATION], "Bearer abc123");
        assert_eq!(request.uri().path(), "/bridge");
    }

    #[test]
    fn test_invalid_token_is_a_credential_error() {
        let url = Url::parse("ws://localhost:9000/bridge").unwrap();
        let err = authorized_request(&url, "bad\ntoken").unwrap_err();
        assert!(matches!(err, BridgeError::Credential(CredentialError::Invalid(_))));
    }
}
