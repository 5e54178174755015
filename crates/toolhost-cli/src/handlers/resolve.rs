//! Resolve command handler.

use anyhow::{Result, bail};
use toolhost_mcp::CommandResolver;

/// Print how `command` resolves on the enhanced search path.
pub fn execute(command: &str) -> Result<()> {
    let diagnosis = CommandResolver::new().diagnose(command);
    println!("{diagnosis}");
    if !diagnosis.found {
        bail!("{command} was not found on the enhanced search path");
    }
    Ok(())
}
