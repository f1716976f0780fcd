use std::path::PathBuf;

use crate::project::Project;

/// Produces the projects a column looks at.
///
/// The sequence is finite and can be restarted by calling `projects` again.
/// No ordering or uniqueness is promised.
pub trait ProjectListing: Send + Sync + 'static {
    fn projects(&self) -> Box<dyn Iterator<Item = Project> + '_>;
}

/// Every direct child of a base directory that holds a `.git` directory.
#[derive(Debug, Clone)]
pub struct DirectoryListing {
    base_dir: PathBuf,
}

impl DirectoryListing {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }
}

impl ProjectListing for DirectoryListing {
    fn projects(&self) -> Box<dyn Iterator<Item = Project> + '_> {
        let entries = match std::fs::read_dir(&self.base_dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("cannot list projects in {}: {e}", self.base_dir.display());
                return Box::new(std::iter::empty());
            }
        };
        Box::new(
            entries
                .filter_map(Result::ok)
                .map(|entry| entry.path())
                .filter(|path| path.is_dir() && path.join(".git").is_dir())
                .map(Project::new),
        )
    }
}

/// A fixed list of projects.
#[derive(Debug, Clone, Default)]
pub struct StaticListing {
    projects: Vec<Project>,
}

impl StaticListing {
    pub fn new(projects: impl IntoIterator<Item = Project>) -> Self {
        Self {
            projects: projects.into_iter().collect(),
        }
    }
}

impl ProjectListing for StaticListing {
    fn projects(&self) -> Box<dyn Iterator<Item = Project> + '_> {
        Box::new(self.projects.iter().cloned())
    }
}

/// Concatenation of several listings.
#[derive(Default)]
pub struct ChainListing {
    parts: Vec<Box<dyn ProjectListing>>,
}

impl ChainListing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, listing: impl ProjectListing) -> Self {
        self.parts.push(Box::new(listing));
        self
    }
}

impl ProjectListing for ChainListing {
    fn projects(&self) -> Box<dyn Iterator<Item = Project> + '_> {
        Box::new(self.parts.iter().flat_map(|part| part.projects()))
    }
}
