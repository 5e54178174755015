//! Enhanced PATH construction.
//!
//! Packaged applications inherit a minimal environment that lacks the
//! user's interactive shell PATH, so `npx`, `uvx` and friends fail to spawn
//! unless their install locations are added back. The enhanced PATH is:
//!
//! 1. every installed version's `bin` directory for nvm, fnm and pyenv,
//!    newest version first
//! 2. standard package-manager locations (Homebrew, `~/.local/bin`,
//!    `~/.cargo/bin`, ...)
//! 3. the inherited PATH
//!
//! Only existing directories are kept, and duplicates are dropped in order.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use super::env::EnvProvider;
use super::fs::FsProvider;

/// A version manager layout: where versions live and where each version
/// keeps its executables.
struct VersionManager {
    root_env: &'static str,
    default_roots: &'static [&'static str],
    versions_subdir: &'static str,
    bin_subdir: &'static str,
}

#[cfg(not(windows))]
const VERSION_MANAGERS: &[VersionManager] = &[
    VersionManager {
        root_env: "NVM_DIR",
        default_roots: &[".nvm"],
        versions_subdir: "versions/node",
        bin_subdir: "bin",
    },
    VersionManager {
        root_env: "FNM_DIR",
        default_roots: &[
            ".local/share/fnm",
            "Library/Application Support/fnm",
            ".fnm",
        ],
        versions_subdir: "node-versions",
        bin_subdir: "installation/bin",
    },
    VersionManager {
        root_env: "PYENV_ROOT",
        default_roots: &[".pyenv"],
        versions_subdir: "versions",
        bin_subdir: "bin",
    },
];

#[cfg(windows)]
const VERSION_MANAGERS: &[VersionManager] = &[
    VersionManager {
        root_env: "NVM_HOME",
        default_roots: &["AppData\\Roaming\\nvm"],
        versions_subdir: "",
        bin_subdir: "",
    },
    VersionManager {
        root_env: "FNM_DIR",
        default_roots: &["AppData\\Roaming\\fnm"],
        versions_subdir: "node-versions",
        bin_subdir: "installation",
    },
    VersionManager {
        root_env: "PYENV_ROOT",
        default_roots: &[".pyenv\\pyenv-win"],
        versions_subdir: "versions",
        bin_subdir: "",
    },
];

#[cfg(not(windows))]
const ABSOLUTE_DIRS: &[&str] = &[
    "/opt/homebrew/bin",
    "/opt/homebrew/sbin",
    "/home/linuxbrew/.linuxbrew/bin",
    "/usr/local/bin",
    "/usr/bin",
    "/bin",
];

#[cfg(not(windows))]
const HOME_DIRS: &[&str] = &[
    ".local/bin",
    ".cargo/bin",
    ".bun/bin",
    ".volta/bin",
    ".asdf/shims",
    ".deno/bin",
];

#[cfg(windows)]
const ABSOLUTE_DIRS: &[&str] = &[];

#[cfg(windows)]
const HOME_DIRS: &[&str] = &[
    "AppData\\Roaming\\npm",
    "scoop\\shims",
    ".cargo\\bin",
    ".bun\\bin",
    ".deno\\bin",
    ".volta\\bin",
];

/// Build the ordered, de-duplicated list of directories to search.
pub fn enhanced_dirs(env: &dyn EnvProvider, fs: &dyn FsProvider) -> Vec<PathBuf> {
    let home = env.home().map(PathBuf::from);
    let mut candidates = Vec::new();

    for manager in VERSION_MANAGERS {
        candidates.extend(version_manager_dirs(manager, env, fs, home.as_deref()));
    }

    candidates.extend(ABSOLUTE_DIRS.iter().map(PathBuf::from));
    if let Some(home) = &home {
        candidates.extend(HOME_DIRS.iter().map(|d| home.join(d)));
    }
    #[cfg(windows)]
    if let Some(program_files) = env.get("ProgramFiles") {
        candidates.push(PathBuf::from(program_files).join("nodejs"));
    }

    if let Some(inherited) = env.get("PATH") {
        let inherited = inherited.to_string_lossy().into_owned();
        candidates.extend(
            inherited
                .split(env.path_separator())
                .filter(|e| !e.is_empty())
                .map(PathBuf::from),
        );
    }

    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|dir| fs.is_dir(dir))
        .filter(|dir| seen.insert(dir.clone()))
        .collect()
}

/// Join directories with the platform separator.
pub fn join(dirs: &[PathBuf], separator: char) -> String {
    dirs.iter()
        .map(|d| d.to_string_lossy())
        .collect::<Vec<_>>()
        .join(&separator.to_string())
}

fn version_manager_dirs(
    manager: &VersionManager,
    env: &dyn EnvProvider,
    fs: &dyn FsProvider,
    home: Option<&Path>,
) -> Vec<PathBuf> {
    let roots: Vec<PathBuf> = match env.get(manager.root_env) {
        Some(root) if !root.is_empty() => vec![PathBuf::from(root)],
        _ => home
            .map(|h| manager.default_roots.iter().map(|r| h.join(r)).collect())
            .unwrap_or_default(),
    };

    let mut dirs = Vec::new();
    for root in roots {
        let versions_dir = join_nonempty(&root, manager.versions_subdir);
        let mut versions = fs.subdirs(&versions_dir);
        versions.sort_by(|a, b| compare_versions(b, a));

        for version in versions {
            let version_root = versions_dir.join(&version);
            dirs.push(join_nonempty(&version_root, manager.bin_subdir));
        }
    }
    dirs
}

fn join_nonempty(base: &Path, sub: &str) -> PathBuf {
    if sub.is_empty() {
        base.to_path_buf()
    } else {
        base.join(sub)
    }
}

/// Numeric components of a version directory name (`v20.11.0` -> `[20, 11, 0]`).
fn version_key(name: &str) -> Option<Vec<u64>> {
    let trimmed = name.trim_start_matches(['v', 'V']);
    let parts: Vec<u64> = trimmed
        .split('.')
        .map_while(|part| {
            let digits: String = part.chars().take_while(char::is_ascii_digit).collect();
            digits.parse().ok()
        })
        .collect();

    if parts.is_empty() { None } else { Some(parts) }
}

/// Version ordering; names without a numeric version sort below all versions.
fn compare_versions(a: &str, b: &str) -> Ordering {
    match (version_key(a), version_key(b)) {
        (Some(ka), Some(kb)) => ka.cmp(&kb).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => a.cmp(b),
    }
}
