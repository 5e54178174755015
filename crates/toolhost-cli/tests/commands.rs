//! Handlers driven through a bootstrapped context on a temporary data dir.

use std::path::Path;

use tempfile::TempDir;
use tokio_test::{assert_err, assert_ok};
use toolhost_cli::handlers;
use toolhost_cli::{CliConfig, CliContext, bootstrap};

fn context(dir: &Path) -> CliContext {
    bootstrap(CliConfig {
        config_path: dir.join("mcp_servers.json"),
        logs_dir: dir.join("logs"),
    })
}

#[tokio::test]
async fn test_validate_accepts_missing_file() {
    let dir = TempDir::new().unwrap();
    assert_ok!(handlers::validate::execute(&context(dir.path())).await);
}

#[tokio::test]
async fn test_validate_rejects_bad_server() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("mcp_servers.json"),
        r#"{"mcpServers": {"fs": {"command": ""}}}"#,
    )
    .unwrap();
    let err = assert_err!(handlers::validate::execute(&context(dir.path())).await);
    assert!(err.to_string().contains("is invalid"));
}

#[tokio::test]
async fn test_call_unknown_server_fails() {
    let dir = TempDir::new().unwrap();
    let ctx = context(dir.path());
    let err = assert_err!(handlers::call::execute(&ctx, "nope", "read_file", None).await);
    assert!(err.to_string().contains("nope"));
}

#[tokio::test]
async fn test_call_rejects_non_object_args() {
    let dir = TempDir::new().unwrap();
    let ctx = context(dir.path());
    assert_err!(handlers::call::execute(&ctx, "fs", "read_file", Some("[1]")).await);
}

#[tokio::test]
async fn test_tools_with_no_servers() {
    let dir = TempDir::new().unwrap();
    assert_ok!(handlers::tools::execute(&context(dir.path()), 1).await);
}
