//! Paths command handler.

use anyhow::Result;
use toolhost_core::paths::data_root;

use crate::bootstrap::CliContext;

/// Print resolved paths in `key = value` format.
pub fn execute(ctx: &CliContext) -> Result<()> {
    println!("data_root = {}", data_root()?.display());
    println!("config    = {}", ctx.config.config_path.display());
    println!("logs      = {}", ctx.config.logs_dir.display());
    Ok(())
}
