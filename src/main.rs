use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use devboard::board::Board;
use devboard::column::{Column, Row};
use devboard::config::{self, loader, types::AppConfig};
use devboard::engine::{BoardEngine, Engine, EngineHandle, Event, Request};
use devboard::notify::Level;
use devboard::ops::GitCli;
use devboard::render::{self, ColumnSnapshot};
use devboard::table::Table;

#[derive(Parser)]
#[command(name = "devboard", version, about = "Dashboard of your local git projects")]
struct Cli {
    /// Path to config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging to debug.log.
    #[arg(long)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Refresh every column and print it (the default).
    Snapshot {
        /// Print JSON instead of text tables.
        #[arg(long)]
        json: bool,
        /// Skip the background fetch.
        #[arg(long)]
        no_fetch: bool,
    },
    /// List the configured columns and their actions.
    Columns,
    /// Apply an action to rows of a column.
    Apply {
        /// Column title or index.
        column: String,
        /// Action name, e.g. `pull`.
        action: String,
        /// Select the rows of this project (repeatable). Without any, the
        /// first row is used.
        #[arg(short, long = "project", value_name = "NAME")]
        projects: Vec<String>,
    },
    /// Fetch every project from its remotes.
    Fetch,
    /// Write a default configuration file.
    Init,
}

fn main() -> Result<()> {
    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::force_capture();
        let msg = format!("{info}\n\n{backtrace}");
        let _ = std::fs::write("panic.log", &msg);
        eprintln!("{msg}");
    }));

    let cli = Cli::parse();

    if cli.debug {
        let file = std::fs::File::create("debug.log")?;
        tracing_subscriber::fmt()
            .with_writer(file)
            .with_ansi(false)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_env("RUST_LOG")
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
            )
            .init();
    }

    let command = cli.command.unwrap_or(Commands::Snapshot {
        json: false,
        no_fetch: false,
    });
    if let Commands::Init = command {
        return init(cli.config);
    }

    let config = loader::load_config(cli.config.as_deref())?;
    let columns = config::build_columns(&config);
    tracing::info!("devboard starting with {} columns", columns.len());

    match command {
        Commands::Columns => {
            for (idx, column) in columns.iter().enumerate() {
                println!(
                    "{idx}  {}  ({})  actions: {}",
                    column.title(),
                    column.headers().join(", "),
                    if column.actions().is_empty() {
                        "-".to_owned()
                    } else {
                        column.actions().join(", ")
                    }
                );
            }
            Ok(())
        }
        Commands::Snapshot { json, no_fetch } => {
            let fetch = config.defaults.fetch_on_startup && !no_fetch;
            snapshot(&config, columns, json, fetch)
        }
        Commands::Apply {
            column,
            action,
            projects,
        } => apply(&config, columns, &column, &action, &projects),
        Commands::Fetch | Commands::Init => {
            let engine = start_engine(&config, columns);
            fetch(&engine)?;
            engine.send(Request::Shutdown);
            Ok(())
        }
    }
}

fn init(explicit: Option<PathBuf>) -> Result<()> {
    let path = explicit
        .or_else(loader::default_config_path)
        .context("cannot determine the config path, pass --config")?;
    if loader::write_default_config(&path)? {
        println!("wrote {}", path.display());
    } else {
        println!("{} already exists, left untouched", path.display());
    }
    Ok(())
}

fn start_engine(config: &AppConfig, columns: Vec<Arc<dyn Column>>) -> EngineHandle {
    let mut board = Board::new(columns, Arc::new(GitCli));
    if let Some(workers) = config.defaults.workers {
        board = board.with_workers(workers);
    }
    BoardEngine::new(board)
        .with_timeouts(config.defaults.timeouts())
        .start()
}

// ---------------------------------------------------------------------------
// Subcommands
// ---------------------------------------------------------------------------

fn fetch(engine: &EngineHandle) -> Result<()> {
    let (tx, rx) = std::sync::mpsc::channel();
    engine.send(Request::FetchAll {
        force: true,
        reply_tx: Some(tx),
    });
    loop {
        if let Event::FetchDone { projects } = recv(&rx)? {
            eprintln!("fetched {projects} projects");
            return Ok(());
        }
    }
}

fn snapshot(
    config: &AppConfig,
    columns: Vec<Arc<dyn Column>>,
    json: bool,
    fetch_first: bool,
) -> Result<()> {
    let engine = start_engine(config, columns.clone());
    if fetch_first {
        fetch(&engine)?;
    }

    let (tx, rx) = std::sync::mpsc::channel();
    engine.send(Request::RefreshAll { reply_tx: tx });
    let mut tables = vec![Table::new(); columns.len()];
    for _ in 0..columns.len() {
        apply_refresh_event(&mut tables, recv(&rx)?)?;
    }
    engine.send(Request::Shutdown);

    let snapshots: Vec<ColumnSnapshot> = columns
        .iter()
        .zip(&tables)
        .map(|(column, table)| ColumnSnapshot::new(column.as_ref(), table))
        .collect();
    if json {
        println!("{}", render::render_json(&snapshots)?);
    } else {
        print!("{}", render::render_text(&snapshots));
    }
    Ok(())
}

fn apply(
    config: &AppConfig,
    columns: Vec<Arc<dyn Column>>,
    column: &str,
    action: &str,
    projects: &[String],
) -> Result<()> {
    let column_idx = find_column(&columns, column)?;
    let actions = columns[column_idx].actions();
    if !actions.iter().any(|a| *a == action) {
        bail!(
            "column {:?} has no action {action:?} (available: {})",
            columns[column_idx].title(),
            actions.join(", ")
        );
    }

    let engine = start_engine(config, columns.clone());
    let (tx, rx) = std::sync::mpsc::channel();

    engine.send(Request::Refresh {
        column_idx,
        reply_tx: tx.clone(),
    });
    let mut tables = vec![Table::new(); columns.len()];
    apply_refresh_event(&mut tables, recv(&rx)?)?;
    let table = &mut tables[column_idx];

    let matching: Vec<usize> = table
        .rows()
        .iter()
        .enumerate()
        .filter(|(_, row)| projects.contains(&row.project.name()))
        .map(|(idx, _)| idx)
        .collect();
    for idx in matching {
        table.toggle(idx);
    }
    if !projects.is_empty() && table.selected_rows().next().is_none() {
        bail!("no row of {:?} matches {projects:?}", columns[column_idx].title());
    }
    let rows = table.targets();
    if rows.is_empty() {
        println!("nothing to do");
        return Ok(());
    }

    let failures = run_actions(&engine, &rx, tx, column_idx, action, rows, table)?;
    engine.send(Request::Shutdown);
    if failures > 0 {
        bail!("{failures} action(s) failed");
    }
    Ok(())
}

fn run_actions(
    engine: &EngineHandle,
    rx: &Receiver<Event>,
    tx: Sender<Event>,
    column_idx: usize,
    action: &str,
    rows: Vec<Row>,
    table: &mut Table,
) -> Result<usize> {
    engine.send(Request::Apply {
        column_idx,
        action: action.to_owned(),
        rows,
        reply_tx: tx,
    });
    let mut failures = 0;
    loop {
        match recv(rx)? {
            Event::Notify(n) => {
                if n.level == Level::Error {
                    failures += 1;
                }
                eprintln!("{n}");
            }
            Event::ShowText { title, text } => println!("── {title} ──\n{text}"),
            Event::RowDone { row_id, .. } => {
                table.remove(row_id);
            }
            Event::ActionsFinished { .. } => return Ok(failures),
            Event::Error { context, message } => bail!("{context}: {message}"),
            other => tracing::debug!("cli: ignoring {other:?}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn recv(rx: &Receiver<Event>) -> Result<Event> {
    rx.recv().context("engine stopped unexpectedly")
}

fn apply_refresh_event(tables: &mut [Table], event: Event) -> Result<()> {
    match event {
        Event::RowsPublished { column_idx, rows } => tables[column_idx].publish(rows),
        Event::ColumnCollapsed { column_idx } => tables[column_idx].publish(Vec::new()),
        Event::RefreshSkipped { column_idx } => {
            tracing::debug!("cli: refresh of column {column_idx} skipped");
        }
        Event::Error { context, message } => bail!("{context}: {message}"),
        other => tracing::debug!("cli: ignoring {other:?}"),
    }
    Ok(())
}

/// Resolve a column by index or (case-insensitive) title.
fn find_column(columns: &[Arc<dyn Column>], name: &str) -> Result<usize> {
    if let Ok(idx) = name.parse::<usize>()
        && idx < columns.len()
    {
        return Ok(idx);
    }
    columns
        .iter()
        .position(|c| c.title().eq_ignore_ascii_case(name))
        .with_context(|| format!("no column named {name:?}"))
}
