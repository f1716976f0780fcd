use std::sync::mpsc::Sender;

use crate::column::{Row, RowId};
use crate::notify::Notification;

/// Handle to the board engine held by the presentation layer.
///
/// Cheaply cloneable. When the last handle is dropped the sender channel
/// closes, signalling the engine to shut down.
#[derive(Clone)]
pub struct EngineHandle {
    tx: tokio::sync::mpsc::UnboundedSender<Request>,
}

impl EngineHandle {
    pub(super) fn new(tx: tokio::sync::mpsc::UnboundedSender<Request>) -> Self {
        Self { tx }
    }

    /// Queue a request for the engine without waiting for it.
    pub fn send(&self, req: Request) {
        // Ignore errors: if the receiver is gone the engine has already shut down.
        let _ = self.tx.send(req);
    }
}

pub trait Engine: Send + 'static {
    fn start(self) -> EngineHandle;
}

/// All operations the presentation layer can send to the engine.
pub enum Request {
    // -----------------------------------------------------------------------
    // Refresh
    // -----------------------------------------------------------------------
    Refresh {
        column_idx: usize,
        reply_tx: Sender<Event>,
    },
    RefreshAll {
        reply_tx: Sender<Event>,
    },

    // -----------------------------------------------------------------------
    // Actions
    // -----------------------------------------------------------------------
    /// Apply `action` to `rows`, usually `Table::targets()`.
    Apply {
        column_idx: usize,
        action: String,
        rows: Vec<Row>,
        reply_tx: Sender<Event>,
    },

    // -----------------------------------------------------------------------
    // Background fetch
    // -----------------------------------------------------------------------
    /// Fetch every project. Without `force`, ignored once a fetch ran.
    FetchAll {
        force: bool,
        reply_tx: Option<Sender<Event>>,
    },

    // -----------------------------------------------------------------------
    // Control
    // -----------------------------------------------------------------------
    Shutdown,
}

/// All events the engine can push back to the presentation layer.
#[derive(Debug)]
pub enum Event {
    // -----------------------------------------------------------------------
    // Refresh results
    // -----------------------------------------------------------------------
    /// Replace the column's rows with `rows` (never empty).
    RowsPublished { column_idx: usize, rows: Vec<Row> },
    /// The refresh produced no rows: show the column collapsed.
    ColumnCollapsed { column_idx: usize },
    /// A refresh of this column was already running.
    RefreshSkipped { column_idx: usize },

    // -----------------------------------------------------------------------
    // Action results
    // -----------------------------------------------------------------------
    /// The row's action succeeded; remove it from the table.
    RowDone { column_idx: usize, row_id: RowId },
    /// Show `text` in a modal.
    ShowText { title: String, text: String },
    /// Every row of an `Apply` request has been handled.
    ActionsFinished { column_idx: usize, count: usize },
    Notify(Notification),

    // -----------------------------------------------------------------------
    // Misc
    // -----------------------------------------------------------------------
    FetchDone { projects: usize },
    /// Unified error event for requests that could not be served.
    Error { context: String, message: String },
}
