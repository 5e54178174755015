//! Executable lookup strategies.

use std::ffi::OsStr;
use std::path::PathBuf;

/// Finds an executable by name on a given search path.
///
/// The production strategy delegates to the `which` crate, which handles
/// `PATHEXT` on Windows and permission bits on Unix.
pub trait PathLookup: Send + Sync {
    fn lookup(&self, command: &str, search_path: &OsStr) -> Option<PathBuf>;
}

/// [`PathLookup`] backed by `which::which_in`.
pub struct WhichLookup;

impl PathLookup for WhichLookup {
    fn lookup(&self, command: &str, search_path: &OsStr) -> Option<PathBuf> {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        which::which_in(command, Some(search_path), cwd).ok()
    }
}
