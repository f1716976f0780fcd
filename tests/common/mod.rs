#![allow(dead_code)]

use std::path::Path;
use std::process::Command;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use devboard::column::{ActionContext, ActionOutcome, Cell, Column, ColumnError, Row};
use devboard::ops::{GitOperationError, GitOperations};
use devboard::project::Project;

// ---------------------------------------------------------------------------
// Fake column
// ---------------------------------------------------------------------------

/// Column over a fixed project list: one row per project, with the length of
/// the project name as second cell.
pub struct FakeColumn {
    pub title: String,
    pub projects: Vec<Project>,
    /// Project names whose row computation fails.
    pub failing: Vec<String>,
    /// Project names whose row computation panics.
    pub panicking: Vec<String>,
    pub delay: Duration,
    pub threaded: bool,
    pub populate_calls: AtomicUsize,
}

impl FakeColumn {
    pub fn new(title: &str, names: &[&str]) -> Self {
        Self {
            title: title.to_owned(),
            projects: names
                .iter()
                .map(|n| Project::new(format!("/nonexistent/{n}")))
                .collect(),
            failing: Vec::new(),
            panicking: Vec::new(),
            delay: Duration::ZERO,
            threaded: true,
            populate_calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(mut self, name: &str) -> Self {
        self.failing.push(name.to_owned());
        self
    }

    pub fn panicking(mut self, name: &str) -> Self {
        self.panicking.push(name.to_owned());
        self
    }

    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn inline(mut self) -> Self {
        self.threaded = false;
        self
    }
}

impl Column for FakeColumn {
    fn title(&self) -> &str {
        &self.title
    }

    fn headers(&self) -> &[&'static str] {
        &["Project", "Length"]
    }

    fn threaded(&self) -> bool {
        self.threaded
    }

    fn actions(&self) -> &[&'static str] {
        &["push", "show"]
    }

    fn list_projects(&self) -> Box<dyn Iterator<Item = Project> + '_> {
        Box::new(self.projects.iter().cloned())
    }

    fn populate_rows(&self, project: &Project) -> Result<Vec<Row>, ColumnError> {
        self.populate_calls.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        let name = project.name();
        if self.panicking.contains(&name) {
            panic!("row computation of {name} panicked");
        }
        if self.failing.contains(&name) {
            return Err(ColumnError::Aborted(format!("{name} is broken")));
        }
        Ok(vec![Row::new(
            project.clone(),
            vec![Cell::Project(project.clone()), Cell::Count(name.len())],
        )])
    }

    fn apply(
        &self,
        ctx: &ActionContext<'_>,
        action: &str,
        row: &Row,
    ) -> Result<ActionOutcome, ColumnError> {
        let project = &row.project;
        match action {
            "push" => {
                let message = format!("Pushing {project}");
                Ok(ctx.run_locked(project, &message, false, || {
                    ctx.git.push(project, None)
                }))
            }
            "show" => Ok(ActionOutcome::Show {
                title: project.name(),
                text: "details".to_owned(),
            }),
            _ => Err(self.unrecognized(action)),
        }
    }
}

// ---------------------------------------------------------------------------
// Recording git operations
// ---------------------------------------------------------------------------

/// Records every call instead of running git.
#[derive(Default)]
pub struct RecordingGit {
    pub calls: Mutex<Vec<String>>,
    pub fetches: AtomicUsize,
}

impl RecordingGit {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

impl GitOperations for RecordingGit {
    fn pull(&self, project: &Project, branch: Option<&str>) -> Result<(), GitOperationError> {
        self.record(format!("pull {} {}", project.name(), branch.unwrap_or("HEAD")));
        Ok(())
    }

    fn push(&self, project: &Project, branch: Option<&str>) -> Result<(), GitOperationError> {
        self.record(format!("push {} {}", project.name(), branch.unwrap_or("HEAD")));
        Ok(())
    }

    fn delete_branch(&self, project: &Project, branch: &str) -> Result<(), GitOperationError> {
        self.record(format!("delete {} {branch}", project.name()));
        Ok(())
    }

    fn fetch(&self, _project: &Project) {
        self.fetches.fetch_add(1, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Scratch repositories
// ---------------------------------------------------------------------------

/// Run git in `dir`, panicking on failure.
pub fn git(dir: &Path, args: &[&str]) -> String {
    let out = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_TERMINAL_PROMPT", "0")
        .output()
        .expect("git is installed");
    assert!(
        out.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn configure(dir: &Path) {
    git(dir, &["config", "user.name", "Test"]);
    git(dir, &["config", "user.email", "test@example.com"]);
    git(dir, &["config", "commit.gpgsign", "false"]);
    git(dir, &["config", "tag.gpgsign", "false"]);
}

/// A fresh repository on branch `main`.
pub fn init_repo(dir: &Path) {
    std::fs::create_dir_all(dir).unwrap();
    git(dir, &["init", "-q"]);
    git(dir, &["symbolic-ref", "HEAD", "refs/heads/main"]);
    configure(dir);
}

/// A bare repository whose HEAD is `main`.
pub fn init_bare(dir: &Path) {
    std::fs::create_dir_all(dir).unwrap();
    git(dir, &["init", "-q", "--bare"]);
    git(dir, &["symbolic-ref", "HEAD", "refs/heads/main"]);
}

pub fn clone_repo(remote: &Path, dir: &Path) {
    let parent = dir.parent().unwrap();
    git(
        parent,
        &[
            "clone",
            "-q",
            remote.to_str().unwrap(),
            dir.to_str().unwrap(),
        ],
    );
    configure(dir);
}

/// Write `file` and commit it with `message`.
pub fn commit(dir: &Path, file: &str, contents: &str, message: &str) {
    std::fs::write(dir.join(file), contents).unwrap();
    git(dir, &["add", file]);
    git(dir, &["commit", "-q", "-m", message]);
}
