//! Command resolution for tool server executables.
//!
//! Turns a configured command such as `npx` into an absolute path using an
//! enhanced search path, and builds the environment handed to children.
//!
//! ## Architecture
//!
//! - `env`: environment variable access (injectable for testing)
//! - `fs`: filesystem checks (injectable for testing)
//! - `lookup`: the executable lookup strategy (`which` in production)
//! - `search_path`: enhanced PATH construction
//! - `types`: diagnostic report types
//!
//! Resolution never fails: when nothing is found the raw command is returned
//! and the spawn attempt reports the real error.

mod env;
mod fs;
mod lookup;
mod search_path;
mod types;

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::{debug, warn};

pub use env::{EnvProvider, SystemEnv};
pub use fs::{FsProvider, SystemFs};
pub use lookup::{PathLookup, WhichLookup};
pub use types::{Attempt, AttemptOutcome, Diagnosis};

#[cfg(test)]
pub use env::MockEnv;
#[cfg(test)]
pub use fs::MockFs;

/// Resolves commands to absolute paths, caching hits for the process lifetime.
pub struct CommandResolver {
    env: Box<dyn EnvProvider>,
    fs: Box<dyn FsProvider>,
    lookup: Box<dyn PathLookup>,
    cache: Mutex<HashMap<String, PathBuf>>,
}

impl Default for CommandResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandResolver {
    /// Resolver backed by the real environment, filesystem and `which`.
    pub fn new() -> Self {
        Self::with_providers(Box::new(SystemEnv), Box::new(SystemFs), Box::new(WhichLookup))
    }

    /// Resolver with injected dependencies (for testing).
    pub fn with_providers(
        env: Box<dyn EnvProvider>,
        fs: Box<dyn FsProvider>,
        lookup: Box<dyn PathLookup>,
    ) -> Self {
        Self {
            env,
            fs,
            lookup,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve `command` to an absolute path, or return it unchanged.
    pub fn resolve(&self, command: &str) -> String {
        if command.is_empty() || Path::new(command).is_absolute() {
            return command.to_string();
        }

        if let Some(hit) = self.cached(command) {
            return hit.to_string_lossy().into_owned();
        }

        let search_path = self.enhanced_path();
        if let Some(found) = self.lookup.lookup(command, &search_path) {
            debug!(command, resolved = %found.display(), "Resolved command");
            self.cache
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(command.to_string(), found.clone());
            return found.to_string_lossy().into_owned();
        }

        warn!(
            command,
            "Could not resolve command on enhanced PATH, using it as-is"
        );
        command.to_string()
    }

    /// The enhanced search path as a single PATH value.
    pub fn enhanced_path(&self) -> OsString {
        let dirs = search_path::enhanced_dirs(self.env.as_ref(), self.fs.as_ref());
        OsString::from(search_path::join(&dirs, self.env.path_separator()))
    }

    /// The inherited environment with PATH replaced by the enhanced path.
    pub fn enhanced_environment(&self) -> HashMap<String, String> {
        let mut vars: HashMap<String, String> = self.env.vars().into_iter().collect();

        // Windows variables are case-insensitive; drop any `Path` spelling
        vars.retain(|k, _| !k.eq_ignore_ascii_case("PATH"));
        vars.insert(
            "PATH".to_string(),
            self.enhanced_path().to_string_lossy().into_owned(),
        );
        vars
    }

    /// Report every candidate considered for `command`.
    pub fn diagnose(&self, command: &str) -> Diagnosis {
        let search_path = search_path::enhanced_dirs(self.env.as_ref(), self.fs.as_ref());
        let mut attempts = Vec::new();

        if Path::new(command).is_absolute() {
            let candidate = PathBuf::from(command);
            let outcome = self.fs.check_executable(&candidate);
            let found = outcome == AttemptOutcome::Ok;
            attempts.push(Attempt { candidate, outcome });
            return Diagnosis {
                command: command.to_string(),
                resolved: command.to_string(),
                found,
                search_path,
                attempts,
            };
        }

        'dirs: for dir in &search_path {
            for name in self.candidate_names(command) {
                let candidate = dir.join(name);
                let outcome = self.fs.check_executable(&candidate);
                let hit = outcome == AttemptOutcome::Ok;
                attempts.push(Attempt { candidate, outcome });
                if hit {
                    break 'dirs;
                }
            }
        }

        let joined = OsString::from(search_path::join(&search_path, self.env.path_separator()));
        let found = self.lookup.lookup(command, &joined);

        Diagnosis {
            command: command.to_string(),
            resolved: found
                .as_ref()
                .map_or_else(|| command.to_string(), |p| p.to_string_lossy().into_owned()),
            found: found.is_some(),
            search_path,
            attempts,
        }
    }

    fn cached(&self, command: &str) -> Option<PathBuf> {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(command)
            .cloned()
    }

    /// File names to try for `command` (adds `PATHEXT` variants on Windows).
    fn candidate_names(&self, command: &str) -> Vec<String> {
        let mut names = vec![command.to_string()];
        if cfg!(windows) {
            let pathext = self
                .env
                .get("PATHEXT")
                .map_or_else(|| ".COM;.EXE;.BAT;.CMD".to_string(), |v| v.to_string_lossy().into_owned());
            names.extend(
                pathext
                    .split(';')
                    .filter(|ext| !ext.is_empty())
                    .map(|ext| format!("{command}{}", ext.to_ascii_lowercase())),
            );
        }
        names
    }
}
