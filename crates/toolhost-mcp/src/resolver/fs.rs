//! Filesystem provider trait for testable path resolution.

use std::path::Path;

use super::types::AttemptOutcome;

/// Trait for filesystem operations (injectable for testing).
pub trait FsProvider: Send + Sync {
    /// Check if a path exists and is a valid executable.
    fn check_executable(&self, path: &Path) -> AttemptOutcome;

    /// Whether `path` is an existing directory.
    fn is_dir(&self, path: &Path) -> bool;

    /// Names of the subdirectories of `path`; empty if it cannot be read.
    fn subdirs(&self, path: &Path) -> Vec<String>;
}

/// Production filesystem provider that uses real filesystem operations.
pub struct SystemFs;

impl FsProvider for SystemFs {
    fn check_executable(&self, path: &Path) -> AttemptOutcome {
        if !path.exists() {
            return AttemptOutcome::NotFound;
        }

        if !path.is_file() {
            return AttemptOutcome::NotAFile;
        }

        // Windows treats anything matching PATHEXT as executable
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            match std::fs::metadata(path) {
                Ok(metadata) => {
                    if metadata.permissions().mode() & 0o111 == 0 {
                        return AttemptOutcome::NotExecutable;
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                    return AttemptOutcome::PermissionDenied;
                }
                Err(e) => return AttemptOutcome::IoError(e.to_string()),
            }
        }

        AttemptOutcome::Ok
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn subdirs(&self, path: &Path) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(path) else {
            return Vec::new();
        };

        entries
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_ok_and(|t| t.is_dir()))
            .filter_map(|e| e.file_name().into_string().ok())
            .collect()
    }
}

/// Test/mock filesystem: a set of executables plus the directories that
/// contain them (and any extra directories registered explicitly).
#[cfg(test)]
#[derive(Default)]
pub struct MockFs {
    executables: std::collections::HashSet<std::path::PathBuf>,
    dirs: std::collections::BTreeSet<std::path::PathBuf>,
}

#[cfg(test)]
impl MockFs {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_executable(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        let path = path.into();
        if let Some(parent) = path.parent() {
            self = self.with_dir(parent);
        }
        self.executables.insert(path);
        self
    }

    /// Register a directory and all of its ancestors.
    #[must_use]
    pub fn with_dir(mut self, path: impl AsRef<Path>) -> Self {
        for ancestor in path.as_ref().ancestors() {
            self.dirs.insert(ancestor.to_path_buf());
        }
        self
    }
}

#[cfg(test)]
impl FsProvider for MockFs {
    fn check_executable(&self, path: &Path) -> AttemptOutcome {
        if self.executables.contains(path) {
            AttemptOutcome::Ok
        } else if self.dirs.contains(path) {
            AttemptOutcome::NotAFile
        } else {
            AttemptOutcome::NotFound
        }
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.dirs.contains(path)
    }

    fn subdirs(&self, path: &Path) -> Vec<String> {
        self.dirs
            .iter()
            .filter(|d| d.parent() == Some(path))
            .filter_map(|d| d.file_name()?.to_str().map(String::from))
            .collect()
    }
}
