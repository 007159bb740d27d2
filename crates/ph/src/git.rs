//! Project root discovery and best-effort version-control reads
//!
//! All git queries shell out to the git binary and degrade to None on any
//! failure: no repository, no commits yet, detached head, missing remote.
//! Nothing here is ever fatal.

use std::path::{Path, PathBuf};
use std::process::Command;

/// Walk from `start` through its ancestors (inclusive) and return the
/// first directory containing a `.git` marker. Falls back to `start`
/// unchanged when nothing matches.
pub fn find_project_root(start: &Path) -> PathBuf {
    for dir in start.ancestors() {
        if dir.join(".git").exists() {
            return dir.to_path_buf();
        }
    }
    start.to_path_buf()
}

/// Read-only queries against a version-control working copy
pub trait RepoInfo {
    fn current_commit(&self) -> Option<String>;
    fn current_branch(&self) -> Option<String>;
    fn remote_url(&self) -> Option<String>;
}

/// Queries a working copy by shelling out to the git binary
pub struct GitRepo {
    root: PathBuf,
}

impl GitRepo {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    /// Run a git subcommand in the repo root, returning trimmed stdout
    fn git(&self, args: &[&str]) -> Option<String> {
        let output = Command::new("git")
            .arg("-C")
            .arg(&self.root)
            .args(args)
            .output()
            .ok()?;

        if !output.status.success() {
            return None;
        }

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

impl RepoInfo for GitRepo {
    fn current_commit(&self) -> Option<String> {
        self.git(&["rev-parse", "HEAD"])
    }

    fn current_branch(&self) -> Option<String> {
        // symbolic-ref fails on a detached head; that is "no branch", not an error
        self.git(&["symbolic-ref", "--short", "HEAD"])
    }

    fn remote_url(&self) -> Option<String> {
        let remotes = self.git(&["remote"])?;
        let first = remotes.lines().next()?.trim();
        self.git(&["remote", "get-url", first])
    }
}
