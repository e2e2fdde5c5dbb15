//! Target resolution
//!
//! Turns a list of target patterns into an ordered, deduplicated list of
//! absolute directory paths. A pattern is one of:
//!
//! - a literal path or glob (`~/src/*`, `$WORK/api`, `services/*/`)
//! - a group reference (`group:work`), looked up in the [`GroupTable`]
//!
//! Group entries may reference other groups. Expansion is bounded by
//! [`MAX_GROUP_DEPTH`] rather than by cycle detection, so a cyclic chain
//! terminates with whatever it resolved before the bound was hit.
//!
//! Resolution never fails. Patterns that match nothing, paths that are not
//! directories, and unknown groups simply contribute nothing; each such case is
//! recorded as a [`ResolveWarning`] for callers that want to surface it.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Group name -> ordered target patterns
pub type GroupTable = HashMap<String, Vec<String>>;

/// Prefix marking a group reference
pub const GROUP_PREFIX: &str = "group:";

/// Nesting depth past which group references are dropped
pub const MAX_GROUP_DEPTH: usize = 10;

/// Something the resolver skipped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveWarning {
    /// `group:<name>` with no such group
    UnknownGroup(String),
    /// Group nesting exceeded [`MAX_GROUP_DEPTH`]
    DepthExceeded(String),
    /// Pattern is not a valid glob
    InvalidPattern { pattern: String, message: String },
    /// Pattern matched nothing on disk
    NoMatch(String),
    /// A match exists but is not a directory (or could not be stat'd)
    NotADirectory(PathBuf),
}

impl fmt::Display for ResolveWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownGroup(name) => write!(f, "unknown group '{name}'"),
            Self::DepthExceeded(pattern) => write!(
                f,
                "group nesting deeper than {MAX_GROUP_DEPTH} at '{pattern}', ignoring"
            ),
            Self::InvalidPattern { pattern, message } => {
                write!(f, "invalid pattern '{pattern}': {message}")
            }
            Self::NoMatch(pattern) => write!(f, "'{pattern}' matched nothing"),
            Self::NotADirectory(path) => write!(f, "not a directory: {}", path.display()),
        }
    }
}

/// Directories plus whatever was skipped on the way
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub dirs: Vec<PathBuf>,
    pub warnings: Vec<ResolveWarning>,
}

/// Resolves target patterns against a group table and the filesystem
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    groups: &'a GroupTable,
}

impl<'a> Resolver<'a> {
    pub fn new(groups: &'a GroupTable) -> Self {
        Self { groups }
    }

    /// Resolve `patterns` to absolute directories, first occurrence wins
    pub fn resolve<S: AsRef<str>>(&self, patterns: &[S]) -> Vec<PathBuf> {
        self.resolve_detailed(patterns).dirs
    }

    /// Like [`Resolver::resolve`], also returning what was skipped
    pub fn resolve_detailed<S: AsRef<str>>(&self, patterns: &[S]) -> Resolution {
        let mut walk = Walk::default();
        for pattern in patterns {
            self.walk(pattern.as_ref(), 0, &mut walk);
        }
        log::debug!(
            "resolved {} pattern(s) to {} dir(s)",
            patterns.len(),
            walk.resolution.dirs.len()
        );
        walk.resolution
    }

    fn walk(&self, pattern: &str, depth: usize, walk: &mut Walk) {
        if depth > MAX_GROUP_DEPTH {
            walk.warn(ResolveWarning::DepthExceeded(pattern.to_string()));
            return;
        }

        if let Some(name) = pattern.strip_prefix(GROUP_PREFIX) {
            match self.groups.get(name) {
                Some(entries) => {
                    for entry in entries {
                        self.walk(entry, depth + 1, walk);
                    }
                }
                None => walk.warn(ResolveWarning::UnknownGroup(name.to_string())),
            }
            return;
        }

        let expanded = expand(pattern);
        let matches = match glob::glob(&expanded) {
            Ok(paths) => paths,
            Err(e) => {
                walk.warn(ResolveWarning::InvalidPattern {
                    pattern: pattern.to_string(),
                    message: e.to_string(),
                });
                return;
            }
        };

        let mut matched_any = false;
        for entry in matches {
            // Unreadable entries are skipped like any other stat failure
            let Ok(path) = entry else { continue };
            matched_any = true;

            let Some(abs) = absolute(&path) else { continue };
            if !abs.is_dir() {
                walk.warn(ResolveWarning::NotADirectory(abs));
                continue;
            }
            walk.add(abs);
        }

        if !matched_any {
            walk.warn(ResolveWarning::NoMatch(pattern.to_string()));
        }
    }
}

/// Resolve `patterns` against `groups`, discarding warnings
pub fn resolve<S: AsRef<str>>(patterns: &[S], groups: &GroupTable) -> Vec<PathBuf> {
    Resolver::new(groups).resolve(patterns)
}

#[derive(Default)]
struct Walk {
    seen: HashSet<PathBuf>,
    resolution: Resolution,
}

impl Walk {
    fn add(&mut self, dir: PathBuf) {
        if self.seen.insert(dir.clone()) {
            self.resolution.dirs.push(dir);
        }
    }

    fn warn(&mut self, warning: ResolveWarning) {
        if !self.resolution.warnings.contains(&warning) {
            self.resolution.warnings.push(warning);
        }
    }
}

/// Expand `~` and environment variables. Unknown variables are left as-is.
pub fn expand(pattern: &str) -> String {
    expand_with(pattern, |name| std::env::var(name).ok())
}

/// [`expand`] with an explicit variable lookup. `~` is always expanded;
/// a variable the lookup does not know stays in the output verbatim.
pub fn expand_with<F>(pattern: &str, lookup: F) -> String
where
    F: FnMut(&str) -> Option<String>,
{
    let home_expanded = shellexpand::tilde(pattern);
    shellexpand::env_with_context_no_errors(&home_expanded, lookup).into_owned()
}

/// Absolute, lexically cleaned form of `path` (symlinks are not resolved)
fn absolute(path: &Path) -> Option<PathBuf> {
    std::path::absolute(path).ok().map(|abs| normalize(&abs))
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
