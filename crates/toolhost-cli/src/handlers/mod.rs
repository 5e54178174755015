//! Command handlers.
//!
//! Handlers follow one pattern:
//! - Signature: `pub async fn execute(ctx: &CliContext, ...) -> Result<()>`
//! - Parse CLI-specific input, call the supervisor, format terminal output
//! - Leave every server stopped and every log flushed on return

pub mod call;
pub mod paths;
pub mod resolve;
pub mod serve;
pub mod tools;
pub mod validate;
