// config module: TOML configuration and board construction

pub mod loader;
pub mod types;

use std::sync::Arc;

use crate::column::{Column, ToCommit, ToPull, ToPush, ToRelease};
use crate::listing::{ChainListing, DirectoryListing, ProjectListing, StaticListing};
use crate::project::Project;

use types::{AppConfig, ColumnConfig, ColumnKind};

/// Build the configured columns, in order.
pub fn build_columns(config: &AppConfig) -> Vec<Arc<dyn Column>> {
    config
        .effective_columns()
        .iter()
        .map(|c| build_column(config, c))
        .collect()
}

fn build_column(config: &AppConfig, column: &ColumnConfig) -> Arc<dyn Column> {
    let listing = listing_for(config, column);
    let built: Arc<dyn Column> = match (column.kind, column.title.clone()) {
        (ColumnKind::ToCommit, None) => Arc::new(ToCommit::new(listing)),
        (ColumnKind::ToCommit, Some(t)) => Arc::new(ToCommit::new(listing).titled(t)),
        (ColumnKind::ToPull, None) => Arc::new(ToPull::new(listing)),
        (ColumnKind::ToPull, Some(t)) => Arc::new(ToPull::new(listing).titled(t)),
        (ColumnKind::ToPush, None) => Arc::new(ToPush::new(listing)),
        (ColumnKind::ToPush, Some(t)) => Arc::new(ToPush::new(listing).titled(t)),
        (ColumnKind::ToRelease, None) => Arc::new(ToRelease::new(listing)),
        (ColumnKind::ToRelease, Some(t)) => Arc::new(ToRelease::new(listing).titled(t)),
    };
    built
}

/// Scan of the column's (or the global) projects directory plus the
/// explicitly listed projects.
fn listing_for(config: &AppConfig, column: &ColumnConfig) -> Arc<dyn ProjectListing> {
    let base_dir = column
        .projects_dir
        .as_deref()
        .map_or_else(|| config.projects_dir(), loader::expand_tilde_path);
    let explicit = config
        .projects
        .iter()
        .map(|p| Project::new(loader::expand_tilde_path(p)));
    Arc::new(
        ChainListing::new()
            .with(DirectoryListing::new(base_dir))
            .with(StaticListing::new(explicit)),
    )
}
