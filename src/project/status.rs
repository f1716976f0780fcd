use std::path::PathBuf;

use serde::Serialize;

use crate::git::{self, GitError};

use super::Project;

/// Working copy status, one list of relative paths per change kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Status {
    pub added: Vec<PathBuf>,
    pub deleted: Vec<PathBuf>,
    pub modified: Vec<PathBuf>,
    pub renamed: Vec<PathBuf>,
    pub typechanged: Vec<PathBuf>,
    pub untracked: Vec<PathBuf>,
}

impl Status {
    /// Parse the output of `git status --porcelain=v1 -z`.
    ///
    /// The worktree column wins over the index column, so a file staged as
    /// added and modified again afterwards counts as modified. A staged
    /// rename stays a rename whatever the worktree column says.
    pub fn parse_porcelain(output: &str) -> Self {
        let mut status = Self::default();
        let mut entries = output.split('\0').filter(|e| !e.is_empty());
        while let Some(entry) = entries.next() {
            let (Some(codes), Some(path)) = (entry.get(..2), entry.get(3..)) else {
                continue;
            };
            let path = PathBuf::from(path);
            let mut chars = codes.chars();
            let (x, y) = (chars.next().unwrap_or(' '), chars.next().unwrap_or(' '));
            // Renames and copies are followed by their source path.
            if matches!(x, 'R' | 'C') || matches!(y, 'R' | 'C') {
                entries.next();
            }
            if codes == "??" {
                status.untracked.push(path);
                continue;
            }
            let code = if x == 'R' || y == ' ' { x } else { y };
            match code {
                'A' | 'C' => status.added.push(path),
                'D' => status.deleted.push(path),
                'M' | 'U' => status.modified.push(path),
                'R' => status.renamed.push(path),
                'T' => status.typechanged.push(path),
                _ => {}
            }
        }
        status
    }

    /// Compact summary such as `"1M 2U"`.
    ///
    /// Order: added, deleted, modified, renamed, typechanged, untracked;
    /// empty categories are omitted.
    pub fn line(&self) -> String {
        [
            (self.added.len(), 'A'),
            (self.deleted.len(), 'D'),
            (self.modified.len(), 'M'),
            (self.renamed.len(), 'R'),
            (self.typechanged.len(), 'T'),
            (self.untracked.len(), 'U'),
        ]
        .into_iter()
        .filter(|(count, _)| *count > 0)
        .map(|(count, letter)| format!("{count}{letter}"))
        .collect::<Vec<_>>()
        .join(" ")
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.deleted.is_empty()
            && self.modified.is_empty()
            && self.renamed.is_empty()
            && self.typechanged.is_empty()
            && self.untracked.is_empty()
    }
}

impl Project {
    /// Status of the working copy.
    pub fn status(&self) -> Result<Status, GitError> {
        let out = git::run(
            self.path(),
            ["status", "--porcelain=v1", "-z", "--untracked-files=all"],
        )?;
        Ok(Status::parse_porcelain(&out))
    }

    /// Status of the working copy as a compact string, see [`Status::line`].
    pub fn status_line(&self) -> Result<String, GitError> {
        Ok(self.status()?.line())
    }
}
