use std::sync::Arc;

use crate::listing::ProjectListing;
use crate::project::Project;

use super::{ActionContext, ActionOutcome, Cell, Column, ColumnError, Row};

/// Conventional-commit types counted by [`ToRelease`], with their letter.
pub const RELEASE_COMMIT_TYPES: [(&str, char); 5] = [
    ("feat", 'F'),
    ("fix", 'X'),
    ("refactor", 'R'),
    ("build", 'B'),
    ("deps", 'D'),
];

fn branch_of(row: &Row) -> Result<&str, ColumnError> {
    row.cell(1)
        .and_then(Cell::as_text)
        .ok_or(ColumnError::MalformedRow("branch"))
}

/// One row per branch with a non-zero count.
fn branch_rows(project: &Project, counts: indexmap::IndexMap<String, usize>) -> Vec<Row> {
    counts
        .into_iter()
        .filter(|(_, commits)| *commits > 0)
        .map(|(branch, commits)| {
            Row::new(
                project.clone(),
                vec![
                    Cell::Project(project.clone()),
                    Cell::Text(branch),
                    Cell::Count(commits),
                ],
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// To Commit
// ---------------------------------------------------------------------------

/// Projects with uncommitted changes.
pub struct ToCommit {
    title: String,
    listing: Arc<dyn ProjectListing>,
}

impl ToCommit {
    pub const TITLE: &'static str = "To Commit";

    pub fn new(listing: Arc<dyn ProjectListing>) -> Self {
        Self {
            title: Self::TITLE.to_owned(),
            listing,
        }
    }

    pub fn titled(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }
}

impl Column for ToCommit {
    fn title(&self) -> &str {
        &self.title
    }

    fn headers(&self) -> &[&'static str] {
        &["Project", "Details"]
    }

    // Actions show a modal.
    fn threaded(&self) -> bool {
        false
    }

    fn actions(&self) -> &[&'static str] {
        &["status", "diff"]
    }

    fn list_projects(&self) -> Box<dyn Iterator<Item = Project> + '_> {
        self.listing.projects()
    }

    fn populate_rows(&self, project: &Project) -> Result<Vec<Row>, ColumnError> {
        if !project.is_dirty()? {
            return Ok(Vec::new());
        }
        Ok(vec![Row::new(
            project.clone(),
            vec![
                Cell::Project(project.clone()),
                Cell::Text(project.status_line()?),
            ],
        )])
    }

    fn apply(
        &self,
        _ctx: &ActionContext<'_>,
        action: &str,
        row: &Row,
    ) -> Result<ActionOutcome, ColumnError> {
        let project = &row.project;
        match action {
            "status" => Ok(ActionOutcome::Show {
                title: format!("{project}: status"),
                text: project.status_text()?,
            }),
            "diff" => Ok(ActionOutcome::Show {
                title: format!("{project}: diff"),
                text: project.diff_text()?,
            }),
            _ => Err(self.unrecognized(action)),
        }
    }
}

// ---------------------------------------------------------------------------
// To Pull
// ---------------------------------------------------------------------------

/// Branches with commits to pull from the remote.
pub struct ToPull {
    title: String,
    listing: Arc<dyn ProjectListing>,
}

impl ToPull {
    pub const TITLE: &'static str = "To Pull";

    pub fn new(listing: Arc<dyn ProjectListing>) -> Self {
        Self {
            title: Self::TITLE.to_owned(),
            listing,
        }
    }

    pub fn titled(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }
}

impl Column for ToPull {
    fn title(&self) -> &str {
        &self.title
    }

    fn headers(&self) -> &[&'static str] {
        &["Project", "Branch", "Commits"]
    }

    fn actions(&self) -> &[&'static str] {
        &["pull", "delete"]
    }

    fn list_projects(&self) -> Box<dyn Iterator<Item = Project> + '_> {
        self.listing.projects()
    }

    fn populate_rows(&self, project: &Project) -> Result<Vec<Row>, ColumnError> {
        Ok(branch_rows(project, project.unpulled()?))
    }

    fn apply(
        &self,
        ctx: &ActionContext<'_>,
        action: &str,
        row: &Row,
    ) -> Result<ActionOutcome, ColumnError> {
        let project = &row.project;
        let branch = branch_of(row)?;
        match action {
            "pull" => {
                let message = format!("Pulling branch {branch} in {project}");
                Ok(ctx.run_locked(project, &message, true, || {
                    ctx.git.pull(project, Some(branch))
                }))
            }
            "delete" => {
                let message = format!("Deleting branch {branch} in {project}");
                Ok(ctx.run_locked(project, &message, true, || {
                    ctx.git.delete_branch(project, branch)
                }))
            }
            _ => Err(self.unrecognized(action)),
        }
    }
}

// ---------------------------------------------------------------------------
// To Push
// ---------------------------------------------------------------------------

/// Branches with commits to push to the remote.
pub struct ToPush {
    title: String,
    listing: Arc<dyn ProjectListing>,
}

impl ToPush {
    pub const TITLE: &'static str = "To Push";

    pub fn new(listing: Arc<dyn ProjectListing>) -> Self {
        Self {
            title: Self::TITLE.to_owned(),
            listing,
        }
    }

    pub fn titled(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }
}

impl Column for ToPush {
    fn title(&self) -> &str {
        &self.title
    }

    fn headers(&self) -> &[&'static str] {
        &["Project", "Branch", "Commits"]
    }

    fn actions(&self) -> &[&'static str] {
        &["push"]
    }

    fn list_projects(&self) -> Box<dyn Iterator<Item = Project> + '_> {
        self.listing.projects()
    }

    fn populate_rows(&self, project: &Project) -> Result<Vec<Row>, ColumnError> {
        Ok(branch_rows(project, project.unpushed()?))
    }

    fn apply(
        &self,
        ctx: &ActionContext<'_>,
        action: &str,
        row: &Row,
    ) -> Result<ActionOutcome, ColumnError> {
        if action != "push" {
            return Err(self.unrecognized(action));
        }
        let project = &row.project;
        let branch = branch_of(row)?;
        let message = format!("Pushing branch {branch} in {project}");
        Ok(ctx.run_locked(project, &message, true, || {
            ctx.git.push(project, Some(branch))
        }))
    }
}

// ---------------------------------------------------------------------------
// To Release
// ---------------------------------------------------------------------------

/// Projects whose default branch has typed commits since the latest tag.
///
/// Scoped (`feat(parser):`) and breaking (`feat!:`) commits count as their
/// base type, not only the bare `feat:` form.
pub struct ToRelease {
    title: String,
    listing: Arc<dyn ProjectListing>,
}

impl ToRelease {
    pub const TITLE: &'static str = "To Release";

    pub fn new(listing: Arc<dyn ProjectListing>) -> Self {
        Self {
            title: Self::TITLE.to_owned(),
            listing,
        }
    }

    pub fn titled(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }
}

/// Summarise commit types as e.g. `"2F 1X"`, empty when none match.
pub fn release_summary<'a>(types: impl IntoIterator<Item = Option<&'a str>>) -> String {
    let mut counts = [0usize; RELEASE_COMMIT_TYPES.len()];
    for commit_type in types.into_iter().flatten() {
        if let Some(i) = RELEASE_COMMIT_TYPES
            .iter()
            .position(|(name, _)| *name == commit_type)
        {
            counts[i] += 1;
        }
    }
    RELEASE_COMMIT_TYPES
        .iter()
        .zip(counts)
        .filter(|(_, n)| *n > 0)
        .map(|((_, letter), n)| format!("{n}{letter}"))
        .collect::<Vec<_>>()
        .join(" ")
}

impl Column for ToRelease {
    fn title(&self) -> &str {
        &self.title
    }

    fn headers(&self) -> &[&'static str] {
        &["Project", "Details"]
    }

    fn list_projects(&self) -> Box<dyn Iterator<Item = Project> + '_> {
        self.listing.projects()
    }

    fn populate_rows(&self, project: &Project) -> Result<Vec<Row>, ColumnError> {
        let commits = project.unreleased(None)?;
        let summary = release_summary(commits.iter().map(|c| c.commit_type()));
        if summary.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![Row::new(
            project.clone(),
            vec![Cell::Project(project.clone()), Cell::Text(summary)],
        )])
    }
}
