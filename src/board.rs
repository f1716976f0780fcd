use std::collections::BTreeSet;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::{JoinHandle, JoinSet};

use crate::column::{ActionContext, ActionOutcome, Column, ColumnError, Row, RowId};
use crate::lock::ProjectLocks;
use crate::notify::Notifier;
use crate::ops::GitOperations;
use crate::project::Project;

#[derive(Debug, Error)]
pub enum BoardError {
    #[error("no column at index {0}")]
    UnknownColumn(usize),
}

/// Result of one refresh request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The new row set, sorted by first cell, all unselected.
    Published(Vec<Row>),
    /// The cycle produced no rows at all.
    Collapsed,
    /// A refresh of this column was already running.
    Skipped,
}

/// How an action request was dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Rows were processed one by one before `apply` returned.
    Inline(usize),
    /// One detached worker task per row.
    Background(usize),
}

/// Result of applying an action to one row.
#[derive(Debug)]
pub struct ActionReport {
    pub column_idx: usize,
    pub row_id: RowId,
    pub result: Result<ActionOutcome, ColumnError>,
}

struct ColumnSlot {
    column: Arc<dyn Column>,
    refreshing: AtomicBool,
}

/// Clears a column's in-flight flag when the refresh ends, however it ends.
struct RefreshGuard<'a>(&'a AtomicBool);

impl<'a> RefreshGuard<'a> {
    fn begin(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Coordinator owning the columns, the project lock registry and the
/// worker pool.
///
/// Every per-project computation and git operation runs on Tokio's blocking
/// pool, gated by a semaphore with one permit per worker. The async methods
/// must run inside a Tokio runtime.
pub struct Board {
    slots: Vec<ColumnSlot>,
    locks: ProjectLocks,
    git: Arc<dyn GitOperations>,
    pool: Arc<Semaphore>,
    workers: usize,
    next_row_id: AtomicU64,
    fetch_started: AtomicBool,
}

impl Board {
    pub fn new(columns: Vec<Arc<dyn Column>>, git: Arc<dyn GitOperations>) -> Self {
        let workers = std::thread::available_parallelism().map_or(4, NonZeroUsize::get);
        Self {
            slots: columns
                .into_iter()
                .map(|column| ColumnSlot {
                    column,
                    refreshing: AtomicBool::new(false),
                })
                .collect(),
            locks: ProjectLocks::new(),
            git,
            pool: Arc::new(Semaphore::new(workers)),
            workers,
            next_row_id: AtomicU64::new(1),
            fetch_started: AtomicBool::new(false),
        }
    }

    /// Size the worker pool explicitly (at least one worker).
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self.pool = Arc::new(Semaphore::new(self.workers));
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn locks(&self) -> &ProjectLocks {
        &self.locks
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &Arc<dyn Column>> {
        self.slots.iter().map(|s| &s.column)
    }

    pub fn column(&self, column_idx: usize) -> Result<&Arc<dyn Column>, BoardError> {
        self.slot(column_idx).map(|s| &s.column)
    }

    fn slot(&self, column_idx: usize) -> Result<&ColumnSlot, BoardError> {
        self.slots
            .get(column_idx)
            .ok_or(BoardError::UnknownColumn(column_idx))
    }

    async fn worker(&self) -> Option<OwnedSemaphorePermit> {
        Arc::clone(&self.pool).acquire_owned().await.ok()
    }

    // -----------------------------------------------------------------------
    // Refresh
    // -----------------------------------------------------------------------

    /// Recompute a column's rows.
    ///
    /// Rows of all projects are computed in parallel, then sorted by their
    /// first cell and returned as one set. A project whose computation fails
    /// (or panics) contributes no rows; the others are unaffected. While a
    /// refresh of the same column is running, this returns
    /// [`RefreshOutcome::Skipped`] immediately.
    pub async fn refresh(&self, column_idx: usize) -> Result<RefreshOutcome, BoardError> {
        let slot = self.slot(column_idx)?;
        let title = slot.column.title().to_owned();
        let Some(_in_flight) = RefreshGuard::begin(&slot.refreshing) else {
            tracing::debug!("board: refresh of {title:?} already running, skipped");
            return Ok(RefreshOutcome::Skipped);
        };

        let listing = Arc::clone(&slot.column);
        let projects =
            match tokio::task::spawn_blocking(move || listing.list_projects().collect::<Vec<_>>())
                .await
            {
                Ok(projects) => projects,
                Err(e) => {
                    tracing::warn!("board: listing projects of {title:?} failed: {e}");
                    Vec::new()
                }
            };
        tracing::debug!("board: refreshing {title:?} over {} projects", projects.len());

        let mut per_project: Vec<Vec<Row>> = vec![Vec::new(); projects.len()];
        let mut tasks = JoinSet::new();
        for (idx, project) in projects.into_iter().enumerate() {
            let Some(permit) = self.worker().await else {
                break;
            };
            let column = Arc::clone(&slot.column);
            tasks.spawn_blocking(move || {
                let _permit = permit;
                let result = column.populate_rows(&project);
                (idx, project, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, _, Ok(rows))) => per_project[idx] = rows,
                Ok((_, project, Err(e))) => {
                    tracing::warn!("board: {title:?}: skipping {project}: {e}");
                }
                Err(e) => tracing::warn!("board: {title:?}: row computation aborted: {e}"),
            }
        }

        let mut rows: Vec<Row> = per_project.into_iter().flatten().collect();
        rows.sort_by(Row::cmp_by_first_cell);
        for row in &mut rows {
            row.id = RowId(self.next_row_id.fetch_add(1, Ordering::Relaxed));
            row.selected = false;
        }

        tracing::debug!("board: {title:?} refreshed, {} rows", rows.len());
        Ok(if rows.is_empty() {
            RefreshOutcome::Collapsed
        } else {
            RefreshOutcome::Published(rows)
        })
    }

    // -----------------------------------------------------------------------
    // Actions
    // -----------------------------------------------------------------------

    /// Apply `action` to each of `rows`.
    ///
    /// Threaded columns get one detached worker task per row and this
    /// returns right away. Other columns have their rows processed one at a
    /// time before this returns. Each row's result is handed to `report`.
    pub async fn apply(
        self: &Arc<Self>,
        column_idx: usize,
        action: &str,
        rows: Vec<Row>,
        notifier: &Notifier,
        report: impl Fn(ActionReport) + Send + Sync + 'static,
    ) -> Result<Dispatch, BoardError> {
        let column = Arc::clone(self.column(column_idx)?);
        let count = rows.len();
        tracing::debug!(
            "board: applying {action:?} to {count} rows of {:?}",
            column.title()
        );

        if !column.threaded() {
            for row in rows {
                let row_id = row.id;
                let result = self.apply_blocking(&column, action, row, notifier, None).await;
                report(ActionReport {
                    column_idx,
                    row_id,
                    result,
                });
            }
            return Ok(Dispatch::Inline(count));
        }

        let report = Arc::new(report);
        for row in rows {
            let board = Arc::clone(self);
            let column = Arc::clone(&column);
            let action = action.to_owned();
            let notifier = notifier.clone();
            let report = Arc::clone(&report);
            tokio::spawn(async move {
                let permit = board.worker().await;
                let row_id = row.id;
                let result = board
                    .apply_blocking(&column, &action, row, &notifier, permit)
                    .await;
                (*report)(ActionReport {
                    column_idx,
                    row_id,
                    result,
                });
            });
        }
        Ok(Dispatch::Background(count))
    }

    async fn apply_blocking(
        self: &Arc<Self>,
        column: &Arc<dyn Column>,
        action: &str,
        row: Row,
        notifier: &Notifier,
        permit: Option<OwnedSemaphorePermit>,
    ) -> Result<ActionOutcome, ColumnError> {
        let board = Arc::clone(self);
        let column = Arc::clone(column);
        let action = action.to_owned();
        let notifier = notifier.clone();
        let joined = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let ctx = ActionContext {
                locks: &board.locks,
                git: board.git.as_ref(),
                notifier: &notifier,
            };
            column.apply(&ctx, &action, &row)
        })
        .await;
        joined.unwrap_or_else(|e| {
            tracing::warn!("board: action aborted: {e}");
            Err(ColumnError::Aborted(e.to_string()))
        })
    }

    // -----------------------------------------------------------------------
    // Background fetch
    // -----------------------------------------------------------------------

    /// Every project referenced by any column, without duplicates.
    pub fn all_projects(&self) -> BTreeSet<Project> {
        self.slots
            .iter()
            .flat_map(|s| s.column.list_projects())
            .collect()
    }

    /// Fetch every project once, in the background.
    ///
    /// Runs at most once per board unless `force` is set; returns `None`
    /// when skipped. The handle resolves to the number of projects fetched
    /// and may be dropped. Fetch failures are never reported. Must be
    /// called from within a Tokio runtime.
    pub fn fetch_all(self: &Arc<Self>, force: bool) -> Option<JoinHandle<usize>> {
        if self.fetch_started.swap(true, Ordering::AcqRel) && !force {
            tracing::debug!("board: background fetch already ran");
            return None;
        }
        let board = Arc::clone(self);
        Some(tokio::spawn(async move { board.run_fetch().await }))
    }

    async fn run_fetch(self: Arc<Self>) -> usize {
        let board = Arc::clone(&self);
        let projects = tokio::task::spawn_blocking(move || board.all_projects())
            .await
            .unwrap_or_default();
        tracing::debug!("board: fetching {} projects", projects.len());

        let mut tasks = JoinSet::new();
        for project in projects {
            let Some(permit) = self.worker().await else {
                break;
            };
            let git = Arc::clone(&self.git);
            tasks.spawn_blocking(move || {
                let _permit = permit;
                git.fetch(&project);
            });
        }
        let mut fetched = 0;
        while let Some(joined) = tasks.join_next().await {
            if joined.is_ok() {
                fetched += 1;
            }
        }
        tracing::debug!("board: background fetch done ({fetched} projects)");
        fetched
    }
}
