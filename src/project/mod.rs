// project module: one local working copy and its derived state

mod history;
mod status;

use std::fmt;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Serialize;
use thiserror::Error;

use crate::git::{self, GitError};

pub use history::CommitSummary;
pub use status::Status;

/// Branch names tried, in order, before asking the remote for its HEAD.
pub const DEFAULT_BRANCHES: [&str; 2] = ["main", "master"];

/// Remote used for ahead/behind computations.
pub const DEFAULT_REMOTE: &str = "origin";

#[derive(Debug, Error)]
#[error("cannot infer default branch for repo {project}")]
pub struct InferenceError {
    pub project: String,
}

/// A development project: a git working copy identified by its path.
///
/// The path is the identity (equality, hashing, ordering and lock key).
/// Nothing is cached: every query below runs against the live working copy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Project {
    path: PathBuf,
}

impl Project {
    /// Create a project, making relative paths absolute against the CWD.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let path = std::path::absolute(&path).unwrap_or(path);
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Name of the project (last path component).
    pub fn name(&self) -> String {
        self.path.file_name().map_or_else(
            || self.path.display().to_string(),
            |n| n.to_string_lossy().into_owned(),
        )
    }

    /// Whether the working copy has uncommitted changes, untracked files included.
    pub fn is_dirty(&self) -> Result<bool, GitError> {
        let out = git::run(&self.path, ["status", "--porcelain", "--untracked-files=normal"])?;
        Ok(!out.trim().is_empty())
    }

    /// Currently checked out branch.
    pub fn current_branch(&self) -> Result<String, GitError> {
        git::run(&self.path, ["symbolic-ref", "--short", "HEAD"])
    }

    /// Local branches, in `for-each-ref` order.
    pub fn branches(&self) -> Result<Vec<String>, GitError> {
        git::lines(
            &self.path,
            ["for-each-ref", "--format=%(refname:short)", "refs/heads"],
        )
    }

    /// Number of local commits not on `origin/<branch>`, per branch.
    ///
    /// Branches without a remote-tracking counterpart are left out.
    pub fn unpushed(&self) -> Result<IndexMap<String, usize>, GitError> {
        self.divergence(DEFAULT_REMOTE, Direction::Ahead)
    }

    /// Number of `origin/<branch>` commits not merged locally, per branch.
    ///
    /// Branches without a remote-tracking counterpart are left out.
    pub fn unpulled(&self) -> Result<IndexMap<String, usize>, GitError> {
        self.divergence(DEFAULT_REMOTE, Direction::Behind)
    }

    fn divergence(
        &self,
        remote: &str,
        direction: Direction,
    ) -> Result<IndexMap<String, usize>, GitError> {
        let mut result = IndexMap::new();
        for branch in self.branches()? {
            let range = match direction {
                Direction::Ahead => format!("refs/remotes/{remote}/{branch}..refs/heads/{branch}"),
                Direction::Behind => format!("refs/heads/{branch}..refs/remotes/{remote}/{branch}"),
            };
            match git::run(&self.path, ["rev-list", "--count", range.as_str()]) {
                Ok(count) => {
                    if let Ok(n) = count.trim().parse::<usize>() {
                        result.insert(branch, n);
                    }
                }
                Err(e) => {
                    tracing::trace!("{}: no {remote}/{branch}: {e}", self.name());
                }
            }
        }
        Ok(result)
    }

    /// Default branch, as checked out when cloning.
    ///
    /// Tries [`DEFAULT_BRANCHES`] first, then the remote HEAD recorded
    /// locally, then the HEAD branch advertised by `git remote show origin`.
    pub fn default_branch(&self) -> Result<String, InferenceError> {
        for name in DEFAULT_BRANCHES {
            let reference = format!("refs/heads/{name}");
            if git::succeeds(&self.path, ["show-ref", "--verify", "--quiet", reference.as_str()]) {
                return Ok(name.to_owned());
            }
        }

        if let Ok(head) = git::run(
            &self.path,
            ["symbolic-ref", "--short", "refs/remotes/origin/HEAD"],
        ) && let Some(branch) = head.trim().strip_prefix("origin/")
        {
            return Ok(branch.to_owned());
        }

        git::run(&self.path, ["remote", "show", DEFAULT_REMOTE])
            .ok()
            .and_then(|text| parse_remote_head(&text))
            .ok_or_else(|| InferenceError {
                project: self.name(),
            })
    }

    /// `git status` output, coloured, for display.
    pub fn status_text(&self) -> Result<String, GitError> {
        git::run(&self.path, ["-c", "color.status=always", "status"])
    }

    /// `git diff` output, coloured, for display.
    pub fn diff_text(&self) -> Result<String, GitError> {
        git::run(&self.path, ["-c", "color.ui=always", "diff"])
    }
}

impl fmt::Display for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

#[derive(Clone, Copy)]
enum Direction {
    Ahead,
    Behind,
}

/// Extract the branch from the `HEAD branch: <name>` line of `git remote show`.
fn parse_remote_head(text: &str) -> Option<String> {
    text.lines()
        .find_map(|line| line.trim().strip_prefix("HEAD branch:"))
        .map(|name| name.trim().to_owned())
        .filter(|name| !name.is_empty() && name != "(unknown)")
}
