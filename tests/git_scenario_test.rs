mod common;

use std::sync::{Arc, Mutex, mpsc};
use std::time::Duration;

use devboard::board::{ActionReport, Board, RefreshOutcome};
use devboard::column::{ActionOutcome, Cell, Column, ToCommit, ToPull, ToPush, ToRelease};
use devboard::listing::{DirectoryListing, ProjectListing, StaticListing};
use devboard::notify::Notifier;
use devboard::ops::{CheckoutGuard, GitCli, GitOperationError, GitOperations, Operation};
use devboard::project::Project;

use common::{RecordingGit, clone_repo, commit, git, init_bare, init_repo};

fn listing(projects: &[&Project]) -> Arc<dyn ProjectListing> {
    Arc::new(StaticListing::new(projects.iter().map(|p| (*p).clone())))
}

/// `origin` bare repository plus one clone of it, both on `main`.
fn repo_with_origin(tmp: &std::path::Path) -> (std::path::PathBuf, Project) {
    let origin = tmp.join("origin.git");
    let seed = tmp.join("seed");
    init_bare(&origin);
    init_repo(&seed);
    commit(&seed, "README", "hello\n", "chore: initial commit");
    git(&seed, &["remote", "add", "origin", origin.to_str().unwrap()]);
    git(&seed, &["push", "-q", "origin", "main"]);

    let work = tmp.join("work");
    clone_repo(&origin, &work);
    (seed, Project::new(work))
}

async fn apply_one(board: &Arc<Board>, action: &str, rows: Vec<devboard::column::Row>) -> ActionReport {
    let (tx, rx) = mpsc::channel();
    let tx = Mutex::new(tx);
    board
        .apply(0, action, rows, &Notifier::silent(), move |r| {
            let _ = tx.lock().unwrap().send(r);
        })
        .await
        .unwrap();
    tokio::task::spawn_blocking(move || rx.recv_timeout(Duration::from_secs(30)))
        .await
        .unwrap()
        .unwrap()
}

// ---------------------------------------------------------------------------
// Project state
// ---------------------------------------------------------------------------

#[test]
fn status_line_counts_modified_and_untracked() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("duty");
    init_repo(&dir);
    commit(&dir, "a.txt", "one\n", "chore: add a");

    std::fs::write(dir.join("a.txt"), "two\n").unwrap();
    std::fs::write(dir.join("b.txt"), "new\n").unwrap();
    std::fs::create_dir(dir.join("sub")).unwrap();
    std::fs::write(dir.join("sub/c.txt"), "new\n").unwrap();

    let project = Project::new(&dir);
    assert!(project.is_dirty().unwrap());
    assert_eq!(project.status_line().unwrap(), "1M 2U");

    let rows = ToCommit::new(listing(&[&project]))
        .populate_rows(&project)
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].cells[1], Cell::text("1M 2U"));
}

#[test]
fn clean_project_has_nothing_to_commit() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("clean");
    init_repo(&dir);
    commit(&dir, "a.txt", "one\n", "chore: add a");

    let project = Project::new(&dir);
    assert!(!project.is_dirty().unwrap());
    assert_eq!(project.status_line().unwrap(), "");
    assert!(
        ToCommit::new(listing(&[&project]))
            .populate_rows(&project)
            .unwrap()
            .is_empty()
    );
}

#[test]
fn branches_without_remote_counterpart_are_omitted() {
    let tmp = tempfile::tempdir().unwrap();
    let (_, project) = repo_with_origin(tmp.path());
    git(project.path(), &["branch", "local-only"]);

    let unpushed = project.unpushed().unwrap();
    assert_eq!(unpushed.get("main"), Some(&0));
    assert!(!unpushed.contains_key("local-only"));
    assert_eq!(project.branches().unwrap(), ["local-only", "main"]);
}

#[test]
fn local_commits_are_unpushed() {
    let tmp = tempfile::tempdir().unwrap();
    let (_, project) = repo_with_origin(tmp.path());
    commit(project.path(), "a.txt", "1\n", "feat: one");
    commit(project.path(), "b.txt", "2\n", "feat: two");

    assert_eq!(project.unpushed().unwrap().get("main"), Some(&2));
    let rows = ToPush::new(listing(&[&project]))
        .populate_rows(&project)
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(
        rows[0].cells,
        [
            Cell::Project(project.clone()),
            Cell::text("main"),
            Cell::Count(2)
        ]
    );
}

#[test]
fn unreleased_commits_since_latest_tag_newest_first() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("lib");
    init_repo(&dir);
    commit(&dir, "a", "a", "chore: initial");
    git(&dir, &["tag", "v1.0.0"]);
    commit(&dir, "b", "b", "feat: one");
    commit(&dir, "c", "c", "fix(parser): two");
    commit(&dir, "d", "d", "docs: three");

    let project = Project::new(&dir);
    let commits = project.unreleased(None).unwrap();
    let summaries: Vec<_> = commits.iter().map(|c| c.summary.as_str()).collect();
    assert_eq!(summaries, ["docs: three", "fix(parser): two", "feat: one"]);

    let rows = ToRelease::new(listing(&[&project]))
        .populate_rows(&project)
        .unwrap();
    assert_eq!(rows[0].cells[1], Cell::text("1F 1X"));
}

#[test]
fn unreleased_stops_at_newest_of_tags_made_together() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("quick");
    init_repo(&dir);
    commit(&dir, "a", "a", "chore: initial");
    git(&dir, &["tag", "v1.0.0"]);
    commit(&dir, "b", "b", "feat: released in 1.1");
    git(&dir, &["tag", "-a", "v1.1.0", "-m", "v1.1.0"]);
    commit(&dir, "c", "c", "feat: one");
    commit(&dir, "d", "d", "fix: two");
    commit(&dir, "e", "e", "docs: three");

    let project = Project::new(&dir);
    assert_eq!(project.tagged_commits().unwrap().len(), 2);
    let commits = project.unreleased(None).unwrap();
    let summaries: Vec<_> = commits.iter().map(|c| c.summary.as_str()).collect();
    assert_eq!(summaries, ["docs: three", "fix: two", "feat: one"]);
}

#[test]
fn without_tags_whole_history_is_unreleased() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("fresh");
    init_repo(&dir);
    commit(&dir, "a", "a", "feat: first");
    commit(&dir, "b", "b", "chore: second");

    let project = Project::new(&dir);
    assert!(project.tagged_commits().unwrap().is_empty());
    assert_eq!(project.unreleased(None).unwrap().len(), 2);
}

#[test]
fn no_default_branch_means_nothing_to_release() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("odd");
    init_repo(&dir);
    git(&dir, &["symbolic-ref", "HEAD", "refs/heads/trunk"]);
    commit(&dir, "a", "a", "feat: first");

    let project = Project::new(&dir);
    assert!(project.default_branch().is_err());
    assert!(project.unreleased(None).unwrap().is_empty());
    assert_eq!(project.unreleased(Some("trunk")).unwrap().len(), 1);
}

#[test]
fn checkout_guard_restores_previous_branch() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("guarded");
    init_repo(&dir);
    commit(&dir, "a", "a", "chore: first");
    git(&dir, &["branch", "feature"]);

    let project = Project::new(&dir);
    {
        let guard = CheckoutGuard::switch(&project, Some("feature")).unwrap();
        assert_eq!(guard.previous(), Some("main"));
        assert_eq!(project.current_branch().unwrap(), "feature");
    }
    assert_eq!(project.current_branch().unwrap(), "main");
}

#[test]
fn failed_pull_restores_previous_branch() {
    let tmp = tempfile::tempdir().unwrap();
    let (_, project) = repo_with_origin(tmp.path());
    git(project.path(), &["branch", "feature"]);

    let result = GitCli.pull(&project, Some("feature"));
    assert!(matches!(
        result,
        Err(GitOperationError {
            operation: Operation::Pull,
            ..
        })
    ));
    assert_eq!(project.current_branch().unwrap(), "main");
}

#[test]
fn directory_listing_finds_working_copies() {
    let tmp = tempfile::tempdir().unwrap();
    init_repo(&tmp.path().join("one"));
    init_repo(&tmp.path().join("two"));
    std::fs::create_dir(tmp.path().join("not-a-repo")).unwrap();

    let mut names: Vec<_> = DirectoryListing::new(tmp.path())
        .projects()
        .map(|p| p.name())
        .collect();
    names.sort();
    assert_eq!(names, ["one", "two"]);
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fetch_then_pull_clears_the_row() {
    let tmp = tempfile::tempdir().unwrap();
    let (seed, project) = repo_with_origin(tmp.path());
    git(project.path(), &["checkout", "-q", "-b", "feature"]);
    commit(&seed, "new.txt", "x\n", "feat: upstream work");
    git(&seed, &["push", "-q", "origin", "main"]);

    let columns: Vec<Arc<dyn Column>> = vec![Arc::new(ToPull::new(listing(&[&project])))];
    let board = Arc::new(Board::new(columns, Arc::new(GitCli)));

    // Nothing to pull until the remote-tracking branch is updated.
    assert_eq!(board.refresh(0).await.unwrap(), RefreshOutcome::Collapsed);
    assert_eq!(board.fetch_all(false).unwrap().await.unwrap(), 1);

    let RefreshOutcome::Published(rows) = board.refresh(0).await.unwrap() else {
        panic!("expected a row to pull");
    };
    assert_eq!(rows[0].cells[1], Cell::text("main"));
    assert_eq!(rows[0].cells[2], Cell::Count(1));

    let report = apply_one(&board, "pull", rows).await;
    assert_eq!(report.result.unwrap(), ActionOutcome::RemoveRow);
    assert_eq!(project.unpulled().unwrap().get("main"), Some(&0));
    assert_eq!(project.current_branch().unwrap(), "feature");
    assert!(!board.locks().is_locked(&project));
}

#[tokio::test]
async fn dirty_project_is_not_pushed() {
    let tmp = tempfile::tempdir().unwrap();
    let (_, project) = repo_with_origin(tmp.path());
    commit(project.path(), "a.txt", "1\n", "feat: one");
    std::fs::write(project.path().join("a.txt"), "edited\n").unwrap();

    let git_ops = Arc::new(RecordingGit::default());
    let columns: Vec<Arc<dyn Column>> = vec![Arc::new(ToPush::new(listing(&[&project])))];
    let board = Arc::new(Board::new(columns, git_ops.clone()));

    let RefreshOutcome::Published(rows) = board.refresh(0).await.unwrap() else {
        panic!("expected a row to push");
    };
    let report = apply_one(&board, "push", rows).await;
    assert_eq!(report.result.unwrap(), ActionOutcome::Keep);
    assert!(git_ops.calls().is_empty());
}

#[tokio::test]
async fn clean_project_is_pushed_by_branch() {
    let tmp = tempfile::tempdir().unwrap();
    let (_, project) = repo_with_origin(tmp.path());
    commit(project.path(), "a.txt", "1\n", "feat: one");

    let git_ops = Arc::new(RecordingGit::default());
    let columns: Vec<Arc<dyn Column>> = vec![Arc::new(ToPush::new(listing(&[&project])))];
    let board = Arc::new(Board::new(columns, git_ops.clone()));

    let RefreshOutcome::Published(rows) = board.refresh(0).await.unwrap() else {
        panic!("expected a row to push");
    };
    let report = apply_one(&board, "push", rows).await;
    assert_eq!(report.result.unwrap(), ActionOutcome::RemoveRow);
    assert_eq!(git_ops.calls(), ["push work main"]);
}
