//! Child process spawning and graceful termination.

use std::collections::{HashMap, VecDeque};
use std::io;
use std::process::{ExitStatus, Stdio};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::process::{Child, Command};

#[cfg(unix)]
use nix::sys::signal::{self, Signal};
#[cfg(unix)]
use nix::unistd::Pid;

/// Number of stderr lines kept for startup error messages.
const STDERR_TAIL_LINES: usize = 20;

/// Spawn `program` with piped stdio and exactly the given environment.
///
/// Never goes through a shell.
pub fn spawn(program: &str, args: &[String], env: &HashMap<String, String>) -> io::Result<Child> {
    Command::new(program)
        .args(args)
        .env_clear()
        .envs(env)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
}

/// Shut a child down: SIGTERM, wait up to `grace`, then SIGKILL.
///
/// On Windows there is no SIGTERM equivalent, so the child is killed
/// immediately.
pub async fn shutdown_child(mut child: Child, grace: Duration) -> io::Result<ExitStatus> {
    #[cfg(unix)]
    {
        shutdown_unix(&mut child, grace).await
    }

    #[cfg(not(unix))]
    {
        let _ = grace;
        child.kill().await?;
        child.wait().await
    }
}

#[cfg(unix)]
async fn shutdown_unix(child: &mut Child, grace: Duration) -> io::Result<ExitStatus> {
    let Some(pid) = child.id() else {
        // already reaped
        return child.wait().await;
    };
    let pid = i32::try_from(pid).map_err(io::Error::other)?;

    if let Err(e) = signal::kill(Pid::from_raw(pid), Signal::SIGTERM) {
        if e == nix::errno::Errno::ESRCH {
            return child.wait().await;
        }
        return Err(io::Error::other(e));
    }

    if let Ok(result) = tokio::time::timeout(grace, child.wait()).await {
        return result;
    }

    child.kill().await?;
    child.wait().await
}

/// Human-readable description of how a process ended.
pub fn describe_exit(status: &io::Result<ExitStatus>) -> String {
    match status {
        Ok(status) => format!("process exited ({status})"),
        Err(e) => format!("failed to wait for process: {e}"),
    }
}

/// The most recent stderr lines of a process.
#[derive(Debug, Default)]
pub struct StderrTail {
    lines: Mutex<VecDeque<String>>,
}

impl StderrTail {
    pub fn push(&self, line: &str) {
        let mut lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
        if lines.len() == STDERR_TAIL_LINES {
            lines.pop_front();
        }
        lines.push_back(line.to_string());
    }

    /// Lines joined by newline, oldest first.
    pub fn joined(&self) -> String {
        let lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
        lines.iter().map(String::as_str).collect::<Vec<_>>().join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stderr_tail_is_bounded() {
        let tail = StderrTail::default();
        for i in 0..30 {
            tail.push(&format!("line {i}"));
        }
        let joined = tail.joined();
        assert_eq!(joined.lines().count(), STDERR_TAIL_LINES);
        assert!(joined.starts_with("line 10"));
        assert!(joined.ends_with("line 29"));
    }

    #[cfg(unix)]
    fn sh(script: &str) -> Child {
        let env: HashMap<String, String> = std::env::vars().collect();
        spawn("/bin/sh", &["-c".to_string(), script.to_string()], &env).unwrap()
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_sigterm_stops_cooperative_child() {
        let child = sh("sleep 30");
        let status = shutdown_child(child, Duration::from_secs(5)).await.unwrap();
        assert!(!status.success());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_escalates_to_kill_when_sigterm_ignored() {
        let child = sh("trap '' TERM; while true; do sleep 1; done");
        // give the shell time to install the trap
        tokio::time::sleep(Duration::from_millis(200)).await;

        let started = std::time::Instant::now();
        let status = shutdown_child(child, Duration::from_millis(300)).await.unwrap();

        assert!(!status.success());
        assert!(started.elapsed() >= Duration::from_millis(300));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_already_exited_child() {
        let mut child = sh("exit 0");
        let _ = child.wait().await;
        assert!(shutdown_child(child, Duration::from_secs(1)).await.is_ok());
    }

    #[test]
    fn test_describe_exit_error() {
        let err: io::Result<ExitStatus> = Err(io::Error::other("gone"));
        assert_eq!(describe_exit(&err), "failed to wait for process: gone");
    }
}
