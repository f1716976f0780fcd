use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::git::{self, GitError};

use super::Project;

const FIELD_SEP: char = '\u{1f}';

/// One commit, as listed by `git log`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitSummary {
    pub id: String,
    pub summary: String,
    pub author: String,
    pub committed_at: Option<DateTime<Utc>>,
}

impl CommitSummary {
    /// Parse one `%H%x1f%ct%x1f%an%x1f%s` line.
    fn parse(line: &str) -> Option<Self> {
        let mut parts = line.splitn(4, FIELD_SEP);
        let id = parts.next()?.trim().to_owned();
        if id.is_empty() {
            return None;
        }
        let committed_at = parts
            .next()?
            .trim()
            .parse::<i64>()
            .ok()
            .and_then(|ts| DateTime::from_timestamp(ts, 0));
        let author = parts.next().unwrap_or_default().to_owned();
        let summary = parts.next().unwrap_or_default().to_owned();
        Some(Self {
            id,
            summary,
            author,
            committed_at,
        })
    }

    /// Conventional-commit type prefix (`"feat"` for `"feat: Add x"`).
    pub fn commit_type(&self) -> Option<&str> {
        let (prefix, _) = self.summary.split_once(':')?;
        let prefix = prefix.split_once('(').map_or(prefix, |(t, _)| t);
        let prefix = prefix.trim_end_matches('!');
        (!prefix.is_empty() && !prefix.contains(char::is_whitespace)).then_some(prefix)
    }
}

impl Project {
    /// Ids of every tagged commit. Annotated tags are peeled to their commit.
    pub fn tagged_commits(&self) -> Result<HashSet<String>, GitError> {
        let lines = git::lines(
            self.path(),
            [
                "for-each-ref",
                "--format=%(*objectname) %(objectname)",
                "refs/tags",
            ],
        )?;
        Ok(lines
            .iter()
            .filter_map(|line| line.split_whitespace().next())
            .map(str::to_owned)
            .collect())
    }

    /// Commits on `branch` (default branch when `None`) newer than its most
    /// recent tagged commit, newest first.
    ///
    /// Without any tag the whole history is returned. When no default branch
    /// can be inferred the list is empty.
    pub fn unreleased(&self, branch: Option<&str>) -> Result<Vec<CommitSummary>, GitError> {
        let branch = match branch {
            Some(b) => b.to_owned(),
            None => match self.default_branch() {
                Ok(b) => b,
                Err(e) => {
                    tracing::debug!("{e}: no unreleased commits");
                    return Ok(Vec::new());
                }
            },
        };

        let log = git::lines(
            self.path(),
            [
                "log",
                "--format=%H%x1f%ct%x1f%an%x1f%s",
                branch.as_str(),
                "--",
            ],
        )?;
        let commits = log.iter().filter_map(|line| CommitSummary::parse(line));

        let tagged = self.tagged_commits()?;
        Ok(commits.take_while(|c| !tagged.contains(&c.id)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commit(summary: &str) -> CommitSummary {
        CommitSummary {
            id: "abc".into(),
            summary: summary.into(),
            author: "me".into(),
            committed_at: None,
        }
    }

    #[test]
    fn parse_log_line() {
        let c = CommitSummary::parse("deadbeef\u{1f}1700000000\u{1f}Jo Doe\u{1f}fix: a: b").unwrap();
        assert_eq!(c.id, "deadbeef");
        assert_eq!(c.author, "Jo Doe");
        assert_eq!(c.summary, "fix: a: b");
        assert_eq!(c.committed_at.unwrap().timestamp(), 1_700_000_000);
    }

    #[test]
    fn parse_rejects_empty_line() {
        assert!(CommitSummary::parse("").is_none());
    }

    #[test]
    fn commit_type_variants() {
        assert_eq!(commit("feat: Add x").commit_type(), Some("feat"));
        assert_eq!(commit("fix(core): y").commit_type(), Some("fix"));
        assert_eq!(commit("refactor!: z").commit_type(), Some("refactor"));
        assert_eq!(commit("Merge branch main").commit_type(), None);
        assert_eq!(commit("not a type: x").commit_type(), None);
    }
}
