// column module: column capability interface, rows and built-in columns

pub mod builtin;

use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::git::GitError;
use crate::lock::ProjectLocks;
use crate::notify::Notifier;
use crate::ops::{GitOperationError, GitOperations};
use crate::project::Project;

pub use builtin::{ToCommit, ToPull, ToPush, ToRelease};

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

/// A single typed table cell.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Project(Project),
    Text(String),
    Count(usize),
}

impl Cell {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Project(p) => write!(f, "{p}"),
            Self::Text(s) => f.write_str(s),
            Self::Count(n) => write!(f, "{n}"),
        }
    }
}

/// Identifies a row within the board. Assigned when a refresh is published,
/// so ids from an older refresh never match rows of a newer one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
pub struct RowId(pub u64);

/// One displayable unit of derived state, tied back to its project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Row {
    #[serde(skip)]
    pub id: RowId,
    pub project: Project,
    pub cells: Vec<Cell>,
    pub selected: bool,
}

impl Row {
    pub fn new(project: Project, cells: Vec<Cell>) -> Self {
        Self {
            id: RowId::default(),
            project,
            cells,
            selected: false,
        }
    }

    pub fn cell(&self, idx: usize) -> Option<&Cell> {
        self.cells.get(idx)
    }

    /// Order rows by their first cell.
    pub fn cmp_by_first_cell(&self, other: &Self) -> Ordering {
        self.cells.first().cmp(&other.cells.first())
    }
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ColumnError {
    #[error("unrecognized action {action:?} for column {column:?}")]
    UnrecognizedAction { column: String, action: String },
    #[error("action aborted: {0}")]
    Aborted(String),
    #[error("row is missing its {0} cell")]
    MalformedRow(&'static str),
    #[error(transparent)]
    Git(#[from] GitError),
    #[error(transparent)]
    Operation(#[from] GitOperationError),
}

/// What the presentation layer should do once an action finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// Leave the row in place.
    Keep,
    /// The row's pending work is done: drop it from the table.
    RemoveRow,
    /// Show `text` in a modal titled `title`.
    Show { title: String, text: String },
}

/// Collaborators handed to [`Column::apply`].
#[derive(Clone, Copy)]
pub struct ActionContext<'a> {
    pub locks: &'a ProjectLocks,
    pub git: &'a dyn GitOperations,
    pub notifier: &'a Notifier,
}

impl ActionContext<'_> {
    /// Run a mutating git operation under the project's lock.
    ///
    /// Refuses (with a warning) when another operation holds the lock or,
    /// if `require_clean`, when the project is dirty. The lock covers the
    /// dirty check and the operation. The dirty check can be stale by the
    /// time the operation runs: edits made in between are not detected.
    pub fn run_locked(
        &self,
        project: &Project,
        message: &str,
        require_clean: bool,
        operation: impl FnOnce() -> Result<(), GitOperationError>,
    ) -> ActionOutcome {
        let Some(_guard) = self.locks.try_acquire(project) else {
            self.notifier
                .warning(format!("Prevented: {message}: An operation is already in progress"));
            return ActionOutcome::Keep;
        };

        if require_clean {
            match project.is_dirty() {
                Ok(false) => {}
                Ok(true) => {
                    self.notifier
                        .warning(format!("Prevented: {message}: project is dirty"));
                    return ActionOutcome::Keep;
                }
                Err(e) => {
                    self.notifier.error(format!("{message}: {e}"));
                    return ActionOutcome::Keep;
                }
            }
        }

        self.notifier.info(format!("Started: {message}"));
        match operation() {
            Ok(()) => {
                self.notifier.success(format!("Finished: {message}"));
                ActionOutcome::RemoveRow
            }
            Err(e) => {
                tracing::debug!("{e}");
                self.notifier.error(format!("{message}: {}", e.message));
                ActionOutcome::Keep
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Column capability interface
// ---------------------------------------------------------------------------

/// A named, independently refreshed view over a set of projects.
pub trait Column: Send + Sync + 'static {
    fn title(&self) -> &str;

    /// Table headers; every row has one cell per header.
    fn headers(&self) -> &[&'static str];

    /// Whether actions run on background workers. Columns whose actions
    /// need a blocking prompt return `false`.
    fn threaded(&self) -> bool {
        true
    }

    /// Action names accepted by [`Column::apply`], default first.
    fn actions(&self) -> &[&'static str] {
        &[]
    }

    fn list_projects(&self) -> Box<dyn Iterator<Item = Project> + '_>;

    /// Zero, one or many rows for `project`. "Nothing to show" is an empty
    /// vector, not an error.
    fn populate_rows(&self, project: &Project) -> Result<Vec<Row>, ColumnError>;

    /// Apply a named action to one row.
    fn apply(
        &self,
        ctx: &ActionContext<'_>,
        action: &str,
        row: &Row,
    ) -> Result<ActionOutcome, ColumnError> {
        let _ = (ctx, row);
        Err(self.unrecognized(action))
    }

    fn unrecognized(&self, action: &str) -> ColumnError {
        ColumnError::UnrecognizedAction {
            column: self.title().to_owned(),
            action: action.to_owned(),
        }
    }
}
