//! Environment provider trait for testable path resolution.

use std::ffi::OsString;

#[cfg(unix)]
const PATH_SEPARATOR: char = ':';
#[cfg(windows)]
const PATH_SEPARATOR: char = ';';

/// Trait for accessing environment variables (injectable for testing).
pub trait EnvProvider: Send + Sync {
    /// Get an environment variable.
    fn get(&self, key: &str) -> Option<OsString>;

    /// Every variable of the inherited environment that is valid UTF-8.
    fn vars(&self) -> Vec<(String, String)>;

    /// Separator between PATH entries.
    fn path_separator(&self) -> char {
        PATH_SEPARATOR
    }

    /// The user's home directory.
    fn home(&self) -> Option<OsString> {
        if cfg!(windows) {
            self.get("USERPROFILE").or_else(|| self.get("HOME"))
        } else {
            self.get("HOME")
        }
    }
}

/// Production environment provider that reads from the actual process environment.
pub struct SystemEnv;

impl EnvProvider for SystemEnv {
    fn get(&self, key: &str) -> Option<OsString> {
        std::env::var_os(key)
    }

    fn vars(&self) -> Vec<(String, String)> {
        std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect()
    }
}

/// Test/mock environment provider with predefined variables.
#[cfg(test)]
#[derive(Default)]
pub struct MockEnv {
    vars: std::collections::BTreeMap<String, OsString>,
}

#[cfg(test)]
impl MockEnv {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<OsString>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
impl EnvProvider for MockEnv {
    fn get(&self, key: &str) -> Option<OsString> {
        self.vars.get(key).cloned()
    }

    fn vars(&self) -> Vec<(String, String)> {
        self.vars
            .iter()
            .filter_map(|(k, v)| Some((k.clone(), v.to_str()?.to_string())))
            .collect()
    }
}
