//! Serve command handler.
//!
//! Runs the supervisor until Ctrl-C. Status changes are logged from the
//! broadcaster's snapshots; when a bridge URL is given, remote tool calls
//! are relayed to the supervisor.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use toolhost_bridge::{BridgeClient, BridgeConfig, validate_endpoint};
use toolhost_core::ServerStatus;
use toolhost_mcp::StatusBroadcaster;
use tracing::{info, warn};

use crate::bootstrap::CliContext;
use crate::credentials::EnvTokenProvider;

/// Execute the serve command.
pub async fn execute(
    ctx: &CliContext,
    bridge_url: Option<String>,
    forwarded_proto: Option<String>,
) -> Result<()> {
    if let Some(url) = &bridge_url {
        validate_endpoint(url, forwarded_proto.as_deref())?;
    }

    let supervisor = ctx.supervisor.clone();
    supervisor.initialize().await?;

    let cancel = CancellationToken::new();
    let broadcaster = Arc::new(StatusBroadcaster::new());
    let reporter = spawn_status_reporter(&broadcaster);
    let poller = broadcaster.spawn(Arc::new(supervisor.clone()), cancel.child_token());
    drop(broadcaster);

    let bridge = bridge_url.map(|url| {
        let config = BridgeConfig {
            forwarded_proto,
            ..BridgeConfig::new(url)
        };
        let client = BridgeClient::new(
            config,
            Arc::new(supervisor.clone()),
            Arc::new(EnvTokenProvider),
        );
        let token = cancel.child_token();
        tokio::spawn(async move { client.run(token).await })
    });

    info!("toolhost is running; press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;
    info!("Shutting down");

    cancel.cancel();
    if let Some(bridge) = bridge {
        match bridge.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "Bridge stopped with an error"),
            Err(e) => warn!(error = %e, "Bridge task failed"),
        }
    }
    let _ = poller.await;
    let _ = reporter.await;

    supervisor.shutdown().await;
    Ok(())
}

/// Log every status transition seen in the snapshot stream.
fn spawn_status_reporter(broadcaster: &StatusBroadcaster) -> tokio::task::JoinHandle<()> {
    let mut snapshots = broadcaster.subscribe();
    tokio::spawn(async move {
        let mut last: HashMap<String, ServerStatus> = HashMap::new();
        loop {
            let snapshot = match snapshots.recv().await {
                Ok(snapshot) => snapshot,
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            };
            for server in &snapshot.servers {
                if last.get(&server.name) != Some(&server.status) {
                    info!(
                        server = %server.name,
                        status = %server.status,
                        tools = server.tool_count,
                        crashes = server.crash_count,
                        error = server.last_error.as_deref().unwrap_or(""),
                        "Server status"
                    );
                    last.insert(server.name.clone(), server.status);
                }
            }
            last.retain(|name, _| snapshot.get(name).is_some());
        }
    })
}
