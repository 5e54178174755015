//! Validate command handler.

use anyhow::{Context, Result};
use toolhost_mcp::ConfigStore;

use crate::bootstrap::CliContext;

/// Load and validate the config file, then summarize each server.
pub async fn execute(ctx: &CliContext) -> Result<()> {
    let path = &ctx.config.config_path;
    let config = ConfigStore::new(path)
        .load()
        .await
        .with_context(|| format!("{} is invalid", path.display()))?;

    println!("{}: {} server(s)", path.display(), config.servers.len());
    for (name, server) in &config.servers {
        let mut flags = Vec::new();
        if !server.is_enabled() {
            flags.push("disabled");
        }
        if !server.auto_start() {
            flags.push("manual start");
        }
        let flags = if flags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", flags.join(", "))
        };
        println!(
            "  {name}: {} {} (timeout {} ms){flags}",
            server.command,
            server.args.join(" "),
            server.request_timeout().as_millis(),
        );
    }
    Ok(())
}
