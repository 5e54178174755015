//! Types reported by resolver diagnostics.

use std::fmt;
use std::path::PathBuf;

/// A single candidate location checked during diagnosis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub candidate: PathBuf,
    pub outcome: AttemptOutcome,
}

/// Result of checking one candidate path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Ok,
    NotFound,
    NotAFile,
    NotExecutable,
    PermissionDenied,
    IoError(String),
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "OK"),
            Self::NotFound => write!(f, "not found"),
            Self::NotAFile => write!(f, "not a file"),
            Self::NotExecutable => write!(f, "not executable"),
            Self::PermissionDenied => write!(f, "permission denied"),
            Self::IoError(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

/// Full report for one command, as printed by `toolhost resolve`.
#[derive(Debug, Clone)]
pub struct Diagnosis {
    pub command: String,
    /// What `resolve` would hand to the spawner.
    pub resolved: String,
    /// Whether a lookup actually succeeded (as opposed to falling back).
    pub found: bool,
    /// The enhanced search path, in order.
    pub search_path: Vec<PathBuf>,
    /// Every candidate checked, up to and including the first hit.
    pub attempts: Vec<Attempt>,
}

impl fmt::Display for Diagnosis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "command:  {}", self.command)?;
        if self.found {
            writeln!(f, "resolved: {}", self.resolved)?;
        } else {
            writeln!(f, "resolved: {} (not found, raw command used)", self.resolved)?;
        }
        writeln!(f, "search path:")?;
        for dir in &self.search_path {
            writeln!(f, "  {}", dir.display())?;
        }
        writeln!(f, "attempts:")?;
        for attempt in &self.attempts {
            let mark = if attempt.outcome == AttemptOutcome::Ok { '+' } else { '-' };
            writeln!(f, "  {mark} {}: {}", attempt.candidate.display(), attempt.outcome)?;
        }
        Ok(())
    }
}
