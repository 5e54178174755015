//! Call command handler.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde_json::Value;

use crate::bootstrap::CliContext;

/// How long to wait for the server's handshake before calling.
const READY_TIMEOUT: Duration = Duration::from_secs(30);

/// Start `server`, run `tool` once, print the result.
pub async fn execute(ctx: &CliContext, server: &str, tool: &str, args: Option<&str>) -> Result<()> {
    let args = parse_args(args)?;
    let supervisor = &ctx.supervisor;
    supervisor.load().await?;

    let outcome = async {
        supervisor.start(server).await?;
        supervisor.wait_for_tools(server, READY_TIMEOUT).await?;
        supervisor.execute(server, tool, args).await
    }
    .await;
    supervisor.shutdown().await;

    let result = outcome?;
    if let Some(value) = &result.result {
        println!("{}", serde_json::to_string_pretty(value)?);
    }
    if !result.success {
        bail!(
            "{tool} reported an error after {} ms: {}",
            result.execution_time_ms,
            result.error.unwrap_or_default()
        );
    }
    Ok(())
}

/// Tool arguments must be a JSON object; absent means `{}`.
fn parse_args(raw: Option<&str>) -> Result<Value> {
    let Some(raw) = raw else {
        return Ok(Value::Object(serde_json::Map::new()));
    };
    let value: Value = serde_json::from_str(raw).context("arguments are not valid JSON")?;
    if !value.is_object() {
        bail!("arguments must be a JSON object");
    }
    Ok(value)
}
