//! Tools command handler.

use std::time::Duration;

use anyhow::Result;
use futures_util::future::join_all;
use toolhost_core::ServerStatus;

use crate::bootstrap::CliContext;

/// Start every enabled server, wait for discovery, print the tools.
pub async fn execute(ctx: &CliContext, wait: u64) -> Result<()> {
    let supervisor = &ctx.supervisor;
    let config = supervisor.load().await?;
    let timeout = Duration::from_secs(wait);

    let enabled: Vec<&String> = config
        .servers
        .iter()
        .filter(|(_, s)| s.is_enabled())
        .map(|(name, _)| name)
        .collect();

    let results = join_all(enabled.iter().map(|name| async move {
        let started = supervisor.start(name).await;
        let tools = match started {
            Ok(()) => supervisor.wait_for_tools(name, timeout).await,
            Err(e) => Err(e),
        };
        (*name, tools)
    }))
    .await;

    for (name, tools) in results {
        match tools {
            Ok(tools) => {
                println!("{name} ({} tool(s))", tools.len());
                for tool in tools {
                    if tool.description.is_empty() {
                        println!("  {}", tool.name);
                    } else {
                        println!("  {}: {}", tool.name, tool.description);
                    }
                }
            }
            Err(e) => println!("{name}: {e}"),
        }
    }

    for status in supervisor.statuses().await {
        if status.status == ServerStatus::Stopped && !status.enabled {
            println!("{} (disabled)", status.name);
        }
    }

    supervisor.shutdown().await;
    Ok(())
}
