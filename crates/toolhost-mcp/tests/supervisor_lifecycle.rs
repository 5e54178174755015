//! Process-level lifecycle tests against a fake `sh` tool server.

#![cfg(unix)]

mod common;

use std::time::Duration;

use serde_json::json;
use tokio_test::{assert_err, assert_ok};
use toolhost_core::{McpConfig, ServerConfig, ServerStatus, SupervisorError};
use toolhost_mcp::{CommandResolver, Supervisor};

use common::{Fixture, eventually};

const DISCOVERY_WAIT: Duration = Duration::from_secs(5);

async fn status_of(supervisor: &Supervisor, name: &str) -> ServerStatus {
    supervisor.status(name).await.unwrap()
}

fn process_alive(pid: u32) -> bool {
    let pid = nix::unistd::Pid::from_raw(i32::try_from(pid).unwrap());
    nix::sys::signal::kill(pid, None).is_ok()
}

#[tokio::test]
async fn test_servers_auto_start_by_default() {
    let fixture = Fixture::new();
    fixture.write_config(&[("fs", ""), ("manual", r#""autoStart": false"#)]);
    let supervisor = fixture.supervisor();

    assert_ok!(supervisor.initialize().await);

    assert_eq!(status_of(&supervisor, "fs").await, ServerStatus::Running);
    assert_eq!(status_of(&supervisor, "manual").await, ServerStatus::Stopped);

    let statuses = supervisor.statuses().await;
    let fs = statuses.iter().find(|s| s.name == "fs").unwrap();
    assert!(fs.pid.is_some());
    assert!(fs.started_at.is_some());
    assert!(fs.auto_start);

    supervisor.shutdown().await;
}

#[tokio::test]
async fn test_disabled_server_is_not_auto_started() {
    let fixture = Fixture::new();
    fixture.write_config(&[("fs", r#""enabled": false"#)]);
    let supervisor = fixture.supervisor();

    supervisor.initialize().await.unwrap();

    assert_eq!(status_of(&supervisor, "fs").await, ServerStatus::Stopped);
    supervisor.shutdown().await;
}

#[tokio::test]
async fn test_tools_aggregate_only_while_running() {
    let fixture = Fixture::new();
    fixture.write_config(&[("fs", "")]);
    let supervisor = fixture.supervisor();
    supervisor.initialize().await.unwrap();

    let tools = supervisor.wait_for_tools("fs", DISCOVERY_WAIT).await.unwrap();
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0].name, "read_file");
    assert_eq!(tools[0].server_name, "fs");
    assert_eq!(tools[0].input_schema["properties"]["path"]["type"], "string");

    let aggregated = supervisor.aggregate_tools().await;
    assert_eq!(aggregated, tools);
    assert_eq!(supervisor.statuses().await[0].tool_count, 1);

    supervisor.stop("fs").await.unwrap();

    assert!(supervisor.aggregate_tools().await.is_empty());
    assert!(supervisor.tools_for("fs").is_empty());
    assert_eq!(supervisor.statuses().await[0].tool_count, 0);
    supervisor.shutdown().await;
}

#[tokio::test]
async fn test_stop_rejects_pending_calls() {
    let fixture = Fixture::new();
    fixture.write_config(&[("fs", "")]);
    let supervisor = fixture.supervisor();
    supervisor.initialize().await.unwrap();

    let caller = supervisor.clone();
    let pending = tokio::spawn(async move { caller.execute("fs", "hang", json!({})).await });
    // let the request reach the server
    tokio::time::sleep(Duration::from_millis(200)).await;

    supervisor.stop("fs").await.unwrap();

    let err = pending.await.unwrap().unwrap_err();
    match err {
        SupervisorError::ToolExecution { server, tool, reason } => {
            assert_eq!(server, "fs");
            assert_eq!(tool, "hang");
            assert_eq!(reason, "server is stopping");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(status_of(&supervisor, "fs").await, ServerStatus::Stopped);
    supervisor.shutdown().await;
}

#[tokio::test]
async fn test_execute_success_and_tool_error() {
    let fixture = Fixture::new();
    fixture.write_config(&[("fs", "")]);
    let supervisor = fixture.supervisor();
    supervisor.initialize().await.unwrap();

    let ok = supervisor
        .execute("fs", "read_file", json!({"path": "/tmp/x"}))
        .await
        .unwrap();
    assert!(ok.success);
    assert_eq!(ok.result.unwrap()["content"][0]["text"], "hello");

    let failed = supervisor.execute("fs", "fail", serde_json::Value::Null).await.unwrap();
    assert!(!failed.success);
    assert_eq!(failed.error.as_deref(), Some("no such file"));

    supervisor.shutdown().await;
}

#[tokio::test]
async fn test_exit_while_running_is_a_crash() {
    let fixture = Fixture::new();
    fixture.write_config(&[("fs", "")]);
    let supervisor = fixture.supervisor();
    supervisor.initialize().await.unwrap();

    let err = supervisor.execute("fs", "crash", json!({})).await.unwrap_err();
    assert!(matches!(err, SupervisorError::ToolExecution { .. }));

    let watched = &supervisor;
    assert!(
        eventually(|| async move { status_of(watched, "fs").await == ServerStatus::Crashed })
            .await
    );
    let info = supervisor.statuses().await.remove(0);
    assert_eq!(info.crash_count, 1);
    assert!(info.last_crash_at.is_some());
    assert!(info.pid.is_none());
    assert_eq!(info.tool_count, 0);

    let err = supervisor.execute("fs", "read_file", json!({})).await.unwrap_err();
    assert!(matches!(
        err,
        SupervisorError::NotRunning { status: ServerStatus::Crashed, .. }
    ));

    // crashed servers stay down until restarted
    assert_ok!(supervisor.start("fs").await);
    assert_eq!(status_of(&supervisor, "fs").await, ServerStatus::Running);
    assert_eq!(supervisor.statuses().await[0].crash_count, 1);

    supervisor.shutdown().await;
}

#[tokio::test]
async fn test_second_start_is_rejected() {
    let fixture = Fixture::new();
    fixture.write_config(&[("fs", "")]);
    let supervisor = fixture.supervisor();
    supervisor.initialize().await.unwrap();

    let err = assert_err!(supervisor.start("fs").await);
    assert!(matches!(err, SupervisorError::AlreadyRunning(name) if name == "fs"));

    supervisor.shutdown().await;
}

#[tokio::test]
async fn test_start_waits_for_stopping_process_to_exit() {
    let fixture = Fixture::new();
    fixture.write_config(&[("fs", r#""env": {"FAKE_IGNORE_TERM": "1"}"#)]);
    let supervisor = fixture.supervisor();
    supervisor.initialize().await.unwrap();
    let first = supervisor.statuses().await[0].pid.unwrap();

    let stopping = tokio::spawn({
        let supervisor = supervisor.clone();
        async move { supervisor.stop("fs").await }
    });
    tokio::time::sleep(Duration::from_millis(100)).await;
    // SIGTERM is ignored; the process lives until the grace period ends
    assert_eq!(status_of(&supervisor, "fs").await, ServerStatus::Stopped);
    assert!(process_alive(first));

    assert_ok!(supervisor.start("fs").await);
    assert!(!process_alive(first));
    assert_ok!(stopping.await.unwrap());

    let second = supervisor.statuses().await.remove(0);
    assert_eq!(second.status, ServerStatus::Running);
    assert_ne!(second.pid, Some(first));
    assert!(process_alive(second.pid.unwrap()));

    supervisor.shutdown().await;
}

#[tokio::test]
async fn test_configured_env_overrides_inherited() {
    const CONFIGURED_PATH: &str = "/usr/bin:/bin:/toolhost-test/bin";
    let inherited = CommandResolver::new().enhanced_environment();
    assert_ne!(inherited.get("PATH").map(String::as_str), Some(CONFIGURED_PATH));

    let fixture = Fixture::new();
    fixture.write_config(&[(
        "fs",
        r#""env": {"PATH": "/usr/bin:/bin:/toolhost-test/bin", "FAKE_MARKER": "from-config"}"#,
    )]);
    let supervisor = fixture.supervisor();
    supervisor.initialize().await.unwrap();

    let echoed = supervisor.execute("fs", "env", json!({})).await.unwrap();
    assert_eq!(
        echoed.result.unwrap()["content"][0]["text"],
        format!("{CONFIGURED_PATH}|from-config")
    );

    supervisor.shutdown().await;
}

#[tokio::test]
async fn test_restart_replaces_process() {
    let fixture = Fixture::new();
    fixture.write_config(&[("fs", "")]);
    let supervisor = fixture.supervisor();
    supervisor.initialize().await.unwrap();
    let before = supervisor.statuses().await[0].pid;

    supervisor.restart("fs").await.unwrap();

    let after = supervisor.statuses().await.remove(0);
    assert_eq!(after.status, ServerStatus::Running);
    assert_ne!(after.pid, before);
    assert_eq!(after.crash_count, 0);
    supervisor.shutdown().await;
}

#[tokio::test]
async fn test_exit_during_startup_is_an_error() {
    let fixture = Fixture::new();
    let supervisor = fixture.supervisor();
    supervisor.initialize().await.unwrap();

    let mut config = McpConfig::default();
    config.servers.insert(
        "flaky".to_string(),
        ServerConfig {
            auto_start: Some(false),
            ..ServerConfig::new(
                "/bin/sh",
                vec!["-c".to_string(), "echo 'missing API key' >&2; exit 1".to_string()],
            )
        },
    );
    supervisor.update_config(config).await.unwrap();

    let err = supervisor.start("flaky").await.unwrap_err();
    let SupervisorError::StartupExited { reason, .. } = &err else {
        panic!("unexpected error: {err}");
    };
    assert!(reason.contains("missing API key"), "reason: {reason}");

    let info = supervisor.statuses().await.remove(0);
    assert_eq!(info.status, ServerStatus::Error);
    assert_eq!(info.crash_count, 0);
    assert!(info.last_error.unwrap().contains("missing API key"));
    supervisor.shutdown().await;
}

#[tokio::test]
async fn test_removing_server_from_config_stops_it() {
    let fixture = Fixture::new();
    fixture.write_config(&[("fs", ""), ("git", "")]);
    let supervisor = fixture.supervisor();
    supervisor.initialize().await.unwrap();
    assert_eq!(status_of(&supervisor, "git").await, ServerStatus::Running);

    let mut config = supervisor.get_config().await;
    config.servers.remove("git");
    supervisor.update_config(config).await.unwrap();

    assert!(supervisor.status("git").await.is_none());
    assert_eq!(status_of(&supervisor, "fs").await, ServerStatus::Running);
    assert!(supervisor.aggregate_tools().await.iter().all(|t| t.server_name == "fs"));

    let saved = std::fs::read_to_string(fixture.config_path()).unwrap();
    assert!(!saved.contains("\"git\""));
    supervisor.shutdown().await;
}

#[tokio::test]
async fn test_output_is_mirrored_to_logs() {
    let fixture = Fixture::new();
    fixture.write_config(&[("fs", "")]);
    let supervisor = fixture.supervisor();
    supervisor.initialize().await.unwrap();
    supervisor.wait_for_tools("fs", DISCOVERY_WAIT).await.unwrap();

    supervisor.stop("fs").await.unwrap();

    let server_log = std::fs::read_to_string(fixture.logs_dir().join("fs.log")).unwrap();
    assert!(server_log.contains("[stderr] fake server ready"));
    assert!(server_log.contains("[stdout] {\"jsonrpc\""));
    assert!(server_log.contains("[system] stopping"));

    let errors_log = std::fs::read_to_string(fixture.logs_dir().join("errors.log")).unwrap();
    assert!(errors_log.contains("[fs] fake server ready"));
    assert!(!errors_log.contains("jsonrpc"));

    supervisor.shutdown().await;
    assert!(fixture.path().join("logs").is_dir());
}
