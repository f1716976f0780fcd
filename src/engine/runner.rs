use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::Sender;

use tokio::sync::mpsc::UnboundedReceiver;

use crate::board::{ActionReport, Board, RefreshOutcome};
use crate::column::ActionOutcome;
use crate::notify::{Level, Notification, Notifier, Timeouts};

use super::interface::{Engine, EngineHandle, Event, Request};

/// The engine driving a [`Board`] on its own thread.
pub struct BoardEngine {
    board: Board,
    fetch_on_startup: bool,
    timeouts: Timeouts,
}

impl BoardEngine {
    pub fn new(board: Board) -> Self {
        Self {
            board,
            fetch_on_startup: false,
            timeouts: Timeouts::default(),
        }
    }

    /// Fetch every project as soon as the engine starts.
    pub fn fetch_on_startup(mut self, enabled: bool) -> Self {
        self.fetch_on_startup = enabled;
        self
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }
}

impl Engine for BoardEngine {
    fn start(self) -> EngineHandle {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<Request>();
        let handle = EngineHandle::new(tx);
        let _ = std::thread::Builder::new()
            .name("devboard-engine".to_owned())
            .spawn(move || {
                let rt = tokio::runtime::Runtime::new().expect("tokio runtime init");
                rt.block_on(self.run_loop(rx));
                // Already dispatched work is not interrupted.
                rt.shutdown_background();
            });
        handle
    }
}

impl BoardEngine {
    async fn run_loop(self, mut rx: UnboundedReceiver<Request>) {
        let board = Arc::new(self.board);
        let timeouts = self.timeouts;

        if self.fetch_on_startup {
            let _ = board.fetch_all(false);
        }

        while let Some(req) = rx.recv().await {
            if matches!(req, Request::Shutdown) {
                break;
            }
            handle_request(req, &board, timeouts).await;
        }
        tracing::debug!("engine: shutting down");
    }
}

// ---------------------------------------------------------------------------
// Request dispatch
// ---------------------------------------------------------------------------

async fn handle_request(req: Request, board: &Arc<Board>, timeouts: Timeouts) {
    match req {
        Request::Refresh {
            column_idx,
            reply_tx,
        } => spawn_refresh(board, column_idx, reply_tx),

        Request::RefreshAll { reply_tx } => {
            for column_idx in 0..board.len() {
                spawn_refresh(board, column_idx, reply_tx.clone());
            }
        }

        Request::Apply {
            column_idx,
            action,
            rows,
            reply_tx,
        } => {
            let count = rows.len();
            let notifier = {
                let tx = reply_tx.clone();
                Notifier::new(move |n| {
                    let _ = tx.send(Event::Notify(n));
                })
                .with_timeouts(timeouts)
            };
            let remaining = Arc::new(AtomicUsize::new(count));
            let report = {
                let tx = reply_tx.clone();
                move |report: ActionReport| {
                    send_report(&tx, report, timeouts);
                    if remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
                        let _ = tx.send(Event::ActionsFinished { column_idx, count });
                    }
                }
            };
            match board
                .apply(column_idx, &action, rows, &notifier, report)
                .await
            {
                Ok(dispatch) => {
                    tracing::debug!("engine: Apply[{column_idx}] {action:?} {dispatch:?}");
                    if count == 0 {
                        let _ = reply_tx.send(Event::ActionsFinished {
                            column_idx,
                            count: 0,
                        });
                    }
                }
                Err(e) => {
                    tracing::debug!("engine: Apply[{column_idx}] error: {e}");
                    let _ = reply_tx.send(Event::Error {
                        context: format!("Apply[{column_idx}]"),
                        message: e.to_string(),
                    });
                }
            }
        }

        Request::FetchAll { force, reply_tx } => {
            if let Some(fetch) = board.fetch_all(force)
                && let Some(tx) = reply_tx
            {
                tokio::spawn(async move {
                    if let Ok(projects) = fetch.await {
                        let _ = tx.send(Event::FetchDone { projects });
                    }
                });
            }
        }

        Request::Shutdown => {}
    }
}

fn spawn_refresh(board: &Arc<Board>, column_idx: usize, reply_tx: Sender<Event>) {
    let board = Arc::clone(board);
    tokio::spawn(async move {
        let event = match board.refresh(column_idx).await {
            Ok(RefreshOutcome::Published(rows)) => {
                tracing::debug!(
                    "engine: sending RowsPublished[{column_idx}] count={}",
                    rows.len()
                );
                Event::RowsPublished { column_idx, rows }
            }
            Ok(RefreshOutcome::Collapsed) => Event::ColumnCollapsed { column_idx },
            Ok(RefreshOutcome::Skipped) => Event::RefreshSkipped { column_idx },
            Err(e) => {
                tracing::debug!("engine: Refresh[{column_idx}] error: {e}");
                Event::Error {
                    context: format!("Refresh[{column_idx}]"),
                    message: e.to_string(),
                }
            }
        };
        let _ = reply_tx.send(event);
    });
}

fn send_report(tx: &Sender<Event>, report: ActionReport, timeouts: Timeouts) {
    let event = match report.result {
        Ok(ActionOutcome::Keep) => return,
        Ok(ActionOutcome::RemoveRow) => Event::RowDone {
            column_idx: report.column_idx,
            row_id: report.row_id,
        },
        Ok(ActionOutcome::Show { title, text }) => Event::ShowText { title, text },
        Err(e) => Event::Notify(Notification {
            level: Level::Error,
            message: e.to_string(),
            timeout: Some(timeouts.error),
        }),
    };
    let _ = tx.send(event);
}
