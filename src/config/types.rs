use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::notify::Timeouts;

/// Environment variable naming the default projects directory.
pub const PROJECTS_ENV: &str = "DEVBOARD_PROJECTS";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory whose git working copies are listed by every column.
    pub projects_dir: Option<PathBuf>,
    /// Additional projects, outside of `projects_dir`.
    pub projects: Vec<PathBuf>,
    pub defaults: Defaults,
    pub columns: Vec<ColumnConfig>,
}

impl AppConfig {
    /// Projects directory: config, then `$DEVBOARD_PROJECTS`, then `~/dev`.
    pub fn projects_dir(&self) -> PathBuf {
        if let Some(dir) = &self.projects_dir {
            return super::loader::expand_tilde_path(dir);
        }
        if let Ok(dir) = std::env::var(PROJECTS_ENV) {
            return super::loader::expand_tilde_path(&PathBuf::from(dir));
        }
        super::loader::home_dir().map_or_else(|| PathBuf::from("dev"), |h| h.join("dev"))
    }

    /// Configured columns, or the default board when none are configured.
    pub fn effective_columns(&self) -> Vec<ColumnConfig> {
        if self.columns.is_empty() {
            ColumnKind::ALL.iter().copied().map(ColumnConfig::of).collect()
        } else {
            self.columns.clone()
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Defaults {
    /// Worker pool size; the available parallelism when unset.
    pub workers: Option<usize>,
    /// Run `git fetch` on every project when the engine starts.
    pub fetch_on_startup: bool,
    pub notification_timeout_secs: u64,
    pub error_timeout_secs: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            workers: None,
            fetch_on_startup: true,
            notification_timeout_secs: 3,
            error_timeout_secs: 10,
        }
    }
}

impl Defaults {
    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            default: Duration::from_secs(self.notification_timeout_secs),
            error: Duration::from_secs(self.error_timeout_secs),
        }
    }
}

// ---------------------------------------------------------------------------
// Columns
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    ToCommit,
    ToPull,
    ToPush,
    ToRelease,
}

impl ColumnKind {
    pub const ALL: [ColumnKind; 4] = [
        ColumnKind::ToCommit,
        ColumnKind::ToPull,
        ColumnKind::ToPush,
        ColumnKind::ToRelease,
    ];
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ColumnConfig {
    pub kind: ColumnKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Overrides the top-level `projects_dir` for this column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projects_dir: Option<PathBuf>,
}

impl ColumnConfig {
    pub fn of(kind: ColumnKind) -> Self {
        Self {
            kind,
            title: None,
            projects_dir: None,
        }
    }
}
