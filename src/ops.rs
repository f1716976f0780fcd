use std::fmt;

use thiserror::Error;

use crate::git::{self, GitError};
use crate::project::Project;

/// Mutating operations offered on a branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Pull,
    Push,
    DeleteBranch,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pull => "pull",
            Self::Push => "push",
            Self::DeleteBranch => "delete branch",
        })
    }
}

/// A pull, push or branch deletion that failed.
#[derive(Debug, Error)]
#[error("{operation} {} in {project} failed: {message}", branch.as_deref().unwrap_or("HEAD"))]
pub struct GitOperationError {
    pub operation: Operation,
    pub project: String,
    pub branch: Option<String>,
    pub message: String,
}

impl GitOperationError {
    fn new(operation: Operation, project: &Project, branch: Option<&str>, err: &GitError) -> Self {
        Self {
            operation,
            project: project.name(),
            branch: branch.map(str::to_owned),
            message: match err {
                GitError::Failed { stderr, .. } => stderr.clone(),
                GitError::Spawn { .. } => err.to_string(),
            },
        }
    }
}

/// Mutating git operations on a working copy.
///
/// Implemented by [`GitCli`]; tests substitute recording fakes.
pub trait GitOperations: Send + Sync + 'static {
    /// Pull `branch` (or the current branch) from `origin`.
    fn pull(&self, project: &Project, branch: Option<&str>) -> Result<(), GitOperationError>;

    /// Push `branch` (or the current branch) to `origin`.
    fn push(&self, project: &Project, branch: Option<&str>) -> Result<(), GitOperationError>;

    /// Force-delete a local branch.
    fn delete_branch(&self, project: &Project, branch: &str) -> Result<(), GitOperationError>;

    /// Fetch `origin` and `upstream`. Best effort: failures are swallowed.
    fn fetch(&self, project: &Project);
}

/// [`GitOperations`] backed by the `git` command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitCli;

impl GitOperations for GitCli {
    fn pull(&self, project: &Project, branch: Option<&str>) -> Result<(), GitOperationError> {
        let _checkout = CheckoutGuard::switch(project, branch)
            .map_err(|e| GitOperationError::new(Operation::Pull, project, branch, &e))?;
        let mut args = vec!["pull", "origin"];
        if let Some(b) = branch {
            args.push(b);
        }
        git::run(project.path(), args)
            .map(drop)
            .map_err(|e| GitOperationError::new(Operation::Pull, project, branch, &e))
    }

    fn push(&self, project: &Project, branch: Option<&str>) -> Result<(), GitOperationError> {
        let _checkout = CheckoutGuard::switch(project, branch)
            .map_err(|e| GitOperationError::new(Operation::Push, project, branch, &e))?;
        let mut args = vec!["push", "origin"];
        if let Some(b) = branch {
            args.push(b);
        }
        git::run(project.path(), args)
            .map(drop)
            .map_err(|e| GitOperationError::new(Operation::Push, project, branch, &e))
    }

    fn delete_branch(&self, project: &Project, branch: &str) -> Result<(), GitOperationError> {
        git::run(project.path(), ["branch", "-D", branch])
            .map(drop)
            .map_err(|e| GitOperationError::new(Operation::DeleteBranch, project, Some(branch), &e))
    }

    fn fetch(&self, project: &Project) {
        for remote in ["origin", "upstream"] {
            if let Err(e) = git::run(project.path(), ["fetch", remote]) {
                tracing::debug!("fetch {remote} in {project}: {e}");
            }
        }
    }
}

/// Checks out a branch and switches back to the previous one on drop.
///
/// Restoration runs on every exit path, failed operations and panics
/// included. A restore failure is logged, not reported.
#[must_use = "the previous branch is restored when the guard is dropped"]
pub struct CheckoutGuard<'a> {
    project: &'a Project,
    previous: Option<String>,
}

impl<'a> CheckoutGuard<'a> {
    /// Switch `project` to `branch`. No-op when `branch` is `None` or
    /// already checked out.
    pub fn switch(project: &'a Project, branch: Option<&str>) -> Result<Self, GitError> {
        let Some(branch) = branch else {
            return Ok(Self {
                project,
                previous: None,
            });
        };
        let current = project.current_branch()?;
        if current == branch {
            return Ok(Self {
                project,
                previous: None,
            });
        }
        git::run(project.path(), ["checkout", branch])?;
        tracing::debug!("{project}: switched from {current} to {branch}");
        Ok(Self {
            project,
            previous: Some(current),
        })
    }

    /// Branch that will be restored, if a switch happened.
    pub fn previous(&self) -> Option<&str> {
        self.previous.as_deref()
    }
}

impl Drop for CheckoutGuard<'_> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take()
            && let Err(e) = git::run(self.project.path(), ["checkout", previous.as_str()])
        {
            tracing::warn!("{}: cannot restore branch {previous}: {e}", self.project);
        }
    }
}
