//! Size-based log rotation.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::time::Instant;

/// Files larger than this are rotated.
pub const MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;
/// Number of rotated generations kept (`.1` through `.5`).
pub const KEEP_ROTATED: u32 = 5;
/// Minimum time between size checks of the same file.
pub const CHECK_INTERVAL: Duration = Duration::from_secs(60);

/// Rate limiter for size checks.
#[derive(Debug, Default)]
pub struct RotationGate {
    last_check: Option<Instant>,
}

impl RotationGate {
    /// Returns `true` (and records the check) if a size check is allowed now.
    pub fn should_check(&mut self, now: Instant) -> bool {
        match self.last_check {
            Some(last) if now.duration_since(last) < CHECK_INTERVAL => false,
            _ => {
                self.last_check = Some(now);
                true
            }
        }
    }
}

/// `<path>.<n>`
pub fn rotated_path(path: &Path, n: u32) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(format!(".{n}"));
    PathBuf::from(name)
}

/// Rotate `path` if it is larger than `max_bytes`.
///
/// `.1`..`.4` shift up one suffix, a prior `.5` is dropped and the current
/// file becomes `.1`. Returns whether a rotation happened.
pub async fn rotate_if_needed(path: &Path, max_bytes: u64) -> std::io::Result<bool> {
    let size = match tokio::fs::metadata(path).await {
        Ok(meta) => meta.len(),
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };

    if size <= max_bytes {
        return Ok(false);
    }

    remove_if_exists(&rotated_path(path, KEEP_ROTATED)).await?;
    for n in (1..KEEP_ROTATED).rev() {
        rename_if_exists(&rotated_path(path, n), &rotated_path(path, n + 1)).await?;
    }
    tokio::fs::rename(path, rotated_path(path, 1)).await?;
    Ok(true)
}

async fn remove_if_exists(path: &Path) -> std::io::Result<()> {
    match tokio::fs::remove_file(path).await {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

async fn rename_if_exists(from: &Path, to: &Path) -> std::io::Result<()> {
    match tokio::fs::rename(from, to).await {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}
