//! Dirty filtering - keep only repositories with local work
//!
//! A directory is dirty when its working tree has tracked modifications, or
//! when its branch is ahead of or behind its upstream. Anything that cannot be
//! checked (not a repository, no upstream, git missing) counts as clean, so a
//! `--dirty` run never touches a directory it could not verify.

use std::path::{Path, PathBuf};
use std::process::Command;

use rayon::prelude::*;

/// Version-control queries used by [`filter_dirty`].
///
/// `None` means the answer is unknown and is treated as "no".
pub trait VcsProbe: Sync {
    /// Uncommitted changes to tracked files?
    fn has_local_changes(&self, dir: &Path) -> Option<bool>;

    /// Ahead of or behind the upstream branch?
    fn diverges_from_upstream(&self, dir: &Path) -> Option<bool>;
}

/// Whether `dir` has local work according to `probe`
pub fn is_dirty(probe: &dyn VcsProbe, dir: &Path) -> bool {
    match probe.has_local_changes(dir) {
        Some(true) => true,
        Some(false) => probe.diverges_from_upstream(dir).unwrap_or(false),
        None => false,
    }
}

/// Order-preserving subset of `dirs` that are dirty. Checks run in parallel.
pub fn filter_dirty(dirs: &[PathBuf], probe: &dyn VcsProbe) -> Vec<PathBuf> {
    let dirty: Vec<PathBuf> = dirs
        .par_iter()
        .filter(|dir| {
            let dirty = is_dirty(probe, dir);
            log::debug!("{}: {}", dir.display(), if dirty { "dirty" } else { "clean" });
            dirty
        })
        .cloned()
        .collect();
    log::info!("{} of {} dir(s) dirty", dirty.len(), dirs.len());
    dirty
}

/// [`VcsProbe`] backed by the `git` executable
#[derive(Debug, Clone)]
pub struct GitProbe {
    program: String,
}

impl Default for GitProbe {
    fn default() -> Self {
        Self::new("git")
    }
}

impl GitProbe {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Run git in `dir`, returning stdout only on success
    fn output(&self, dir: &Path, args: &[&str]) -> Option<String> {
        let output = match Command::new(&self.program)
            .args(args)
            .current_dir(dir)
            .output()
        {
            Ok(output) => output,
            Err(e) => {
                log::debug!("{} {} failed in {}: {e}", self.program, args.join(" "), dir.display());
                return None;
            }
        };

        if output.status.success() {
            Some(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            log::debug!(
                "{} {} in {}: {}",
                self.program,
                args.join(" "),
                dir.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
            None
        }
    }
}

impl VcsProbe for GitProbe {
    fn has_local_changes(&self, dir: &Path) -> Option<bool> {
        self.output(dir, &["status", "--porcelain", "-uno"])
            .map(|out| parse_status(&out))
    }

    fn diverges_from_upstream(&self, dir: &Path) -> Option<bool> {
        self.output(dir, &["rev-list", "--count", "--left-right", "@{u}...HEAD"])
            .map(|out| parse_divergence(&out))
    }
}

/// `git status --porcelain` output -> has changes
pub fn parse_status(output: &str) -> bool {
    !output.trim().is_empty()
}

/// `git rev-list --count --left-right` output (`"<behind>\t<ahead>"`) -> diverged
pub fn parse_divergence(output: &str) -> bool {
    let counts = output.trim();
    !counts.is_empty() && counts != "0\t0"
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    /// Probe answering from a fixed table
    #[derive(Default)]
    struct ScriptedProbe {
        answers: HashMap<PathBuf, (Option<bool>, Option<bool>)>,
    }

    impl ScriptedProbe {
        fn with(mut self, dir: &str, local: Option<bool>, upstream: Option<bool>) -> Self {
            self.answers.insert(PathBuf::from(dir), (local, upstream));
            self
        }
    }

    impl VcsProbe for ScriptedProbe {
        fn has_local_changes(&self, dir: &Path) -> Option<bool> {
            self.answers.get(dir).and_then(|a| a.0)
        }

        fn diverges_from_upstream(&self, dir: &Path) -> Option<bool> {
            self.answers.get(dir).and_then(|a| a.1)
        }
    }

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn test_parse_status() {
        assert!(!parse_status(""));
        assert!(!parse_status("  \n\n"));
        assert!(parse_status(" M src/main.rs\n"));
    }

    #[test]
    fn test_parse_divergence() {
        assert!(!parse_divergence("0\t0\n"));
        assert!(!parse_divergence(""));
        assert!(parse_divergence("0\t2\n"));
        assert!(parse_divergence("1\t0"));
    }

    #[test]
    fn test_is_dirty_rules() {
        let probe = ScriptedProbe::default()
            .with("/modified", Some(true), None)
            .with("/ahead", Some(false), Some(true))
            .with("/clean", Some(false), Some(false))
            .with("/no-upstream", Some(false), None)
            .with("/not-a-repo", None, Some(true));

        assert!(is_dirty(&probe, Path::new("/modified")));
        assert!(is_dirty(&probe, Path::new("/ahead")));
        assert!(!is_dirty(&probe, Path::new("/clean")));
        assert!(!is_dirty(&probe, Path::new("/no-upstream")));
        assert!(!is_dirty(&probe, Path::new("/not-a-repo")));
    }

    #[test]
    fn test_filter_preserves_order() {
        let probe = ScriptedProbe::default()
            .with("/a", Some(true), None)
            .with("/b", Some(false), Some(false))
            .with("/c", Some(false), Some(true))
            .with("/d", Some(true), None);

        let dirty = filter_dirty(&paths(&["/d", "/a", "/b", "/c"]), &probe);

        assert_eq!(dirty, paths(&["/d", "/a", "/c"]));
    }

    #[test]
    fn test_missing_git_counts_as_clean() {
        let temp = TempDir::new().unwrap();
        let probe = GitProbe::new("fanout-test-no-such-git-4242");

        assert_eq!(probe.has_local_changes(temp.path()), None);
        assert!(filter_dirty(&[temp.path().to_path_buf()], &probe).is_empty());
    }

    fn git_available() -> bool {
        Command::new("git")
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn git(dir: &Path, args: &[&str]) {
        let status = Command::new("git")
            .args([
                "-c",
                "user.name=test",
                "-c",
                "user.email=test@example.com",
                "-c",
                "commit.gpgsign=false",
            ])
            .args(args)
            .current_dir(dir)
            .output()
            .unwrap()
            .status;
        assert!(status.success(), "git {args:?} failed");
    }

    #[test]
    fn test_real_git_clean_and_modified() {
        if !git_available() {
            return;
        }
        let temp = TempDir::new().unwrap();
        let clean = temp.path().join("clean");
        let modified = temp.path().join("modified");
        let plain = temp.path().join("plain");
        fs::create_dir(&plain).unwrap();

        for repo in [&clean, &modified] {
            fs::create_dir(repo).unwrap();
            git(repo, &["init", "-q"]);
            fs::write(repo.join("file.txt"), "one\n").unwrap();
            git(repo, &["add", "file.txt"]);
            git(repo, &["commit", "-q", "-m", "init"]);
        }
        fs::write(modified.join("file.txt"), "two\n").unwrap();
        // Untracked files do not count
        fs::write(clean.join("untracked.txt"), "new\n").unwrap();

        let probe = GitProbe::default();
        let dirty = filter_dirty(&[clean.clone(), modified.clone(), plain], &probe);

        assert_eq!(dirty, vec![modified]);
    }

    #[test]
    fn test_real_git_upstream_tracking() {
        if !git_available() {
            return;
        }
        let temp = TempDir::new().unwrap();
        let remote = temp.path().join("remote.git");
        let synced = temp.path().join("synced");
        let ahead = temp.path().join("ahead");
        fs::create_dir(&remote).unwrap();
        git(&remote, &["init", "-q", "--bare"]);

        fs::create_dir(&synced).unwrap();
        git(&synced, &["init", "-q"]);
        fs::write(synced.join("file.txt"), "one\n").unwrap();
        git(&synced, &["add", "file.txt"]);
        git(&synced, &["commit", "-q", "-m", "init"]);
        git(&synced, &["remote", "add", "origin", &remote.to_string_lossy()]);
        git(&synced, &["push", "-q", "-u", "origin", "HEAD"]);

        git(temp.path(), &["clone", "-q", &remote.to_string_lossy(), "ahead"]);
        fs::write(ahead.join("file.txt"), "two\n").unwrap();
        git(&ahead, &["commit", "-q", "-am", "local only"]);

        let probe = GitProbe::default();
        assert_eq!(probe.has_local_changes(&synced), Some(false));
        assert_eq!(probe.diverges_from_upstream(&synced), Some(false));
        assert_eq!(probe.has_local_changes(&ahead), Some(false));
        assert_eq!(probe.diverges_from_upstream(&ahead), Some(true));

        let dirty = filter_dirty(&[synced, ahead.clone()], &probe);
        assert_eq!(dirty, vec![ahead]);
    }
}
