//! Canonical locations for toolhost data.
//!
//! - Data root: `$TOOLHOST_DATA_DIR`, else `<system data dir>/toolhost`
//! - Config: `<root>/mcp_servers.json`
//! - Logs: `<root>/logs/`
//!
//! Nothing here creates directories; callers that write are responsible for
//! that.

use std::ffi::OsString;
use std::path::PathBuf;

use thiserror::Error;

/// Environment variable overriding the data root.
pub const DATA_DIR_ENV: &str = "TOOLHOST_DATA_DIR";

const APP_DIR: &str = "toolhost";
const CONFIG_FILE: &str = "mcp_servers.json";
const LOGS_DIR: &str = "logs";

/// Errors that can occur while resolving data paths.
#[derive(Debug, Error)]
pub enum PathError {
    /// Could not determine the system data directory.
    #[error("Cannot determine system data directory")]
    NoDataDir,

    /// The override variable was set to an empty value.
    #[error("{DATA_DIR_ENV} is set but empty")]
    EmptyOverride,
}

/// Root directory for all toolhost state.
pub fn data_root() -> Result<PathBuf, PathError> {
    data_root_from(std::env::var_os(DATA_DIR_ENV), dirs::data_dir())
}

/// Pure resolution used by [`data_root`], split out so it can be tested
/// without touching the process environment.
pub fn data_root_from(
    override_dir: Option<OsString>,
    system_data_dir: Option<PathBuf>,
) -> Result<PathBuf, PathError> {
    match override_dir {
        Some(dir) if dir.is_empty() => Err(PathError::EmptyOverride),
        Some(dir) => Ok(PathBuf::from(dir)),
        None => system_data_dir
            .map(|d| d.join(APP_DIR))
            .ok_or(PathError::NoDataDir),
    }
}

/// Path of the server configuration file.
pub fn config_file_path() -> Result<PathBuf, PathError> {
    Ok(data_root()?.join(CONFIG_FILE))
}

/// Directory holding per-server and aggregate error logs.
pub fn logs_dir() -> Result<PathBuf, PathError> {
    Ok(data_root()?.join(LOGS_DIR))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_wins() {
        let root = data_root_from(Some("/srv/toolhost".into()), Some("/home/u/.local/share".into()));
        assert_eq!(root.unwrap(), PathBuf::from("/srv/toolhost"));
    }

    #[test]
    fn test_system_dir_fallback() {
        let root = data_root_from(None, Some("/home/u/.local/share".into())).unwrap();
        assert_eq!(root, PathBuf::from("/home/u/.local/share/toolhost"));
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            data_root_from(Some(OsString::new()), None),
            Err(PathError::EmptyOverride)
        ));
        assert!(matches!(data_root_from(None, None), Err(PathError::NoDataDir)));
    }
}
