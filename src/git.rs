use std::path::Path;
use std::process::Command;

use thiserror::Error;

/// Failure of a single `git` invocation.
#[derive(Debug, Error)]
pub enum GitError {
    #[error("cannot run git {command} in {path}: {source}")]
    Spawn {
        command: String,
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("git {command} failed: {stderr}")]
    Failed { command: String, stderr: String },
}

/// Run `git <args>` in `path` and return its trimmed stdout.
///
/// A non-zero exit status is reported as [`GitError::Failed`] carrying the
/// trimmed stderr (or stdout when stderr is empty).
pub fn run<I, S>(path: &Path, args: I) -> Result<String, GitError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let args: Vec<String> = args.into_iter().map(|a| a.as_ref().to_owned()).collect();
    let command = args.join(" ");
    tracing::trace!("git {command} in {}", path.display());

    let output = Command::new("git")
        .args(&args)
        .current_dir(path)
        // Never block on a credential prompt from a worker thread.
        .env("GIT_TERMINAL_PROMPT", "0")
        .output()
        .map_err(|source| GitError::Spawn {
            command: command.clone(),
            path: path.display().to_string(),
            source,
        })?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).trim_end().to_owned())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_owned();
        let stderr = if stderr.is_empty() {
            String::from_utf8_lossy(&output.stdout).trim().to_owned()
        } else {
            stderr
        };
        Err(GitError::Failed { command, stderr })
    }
}

/// Like [`run`], but only reports whether the command succeeded.
pub fn succeeds<I, S>(path: &Path, args: I) -> bool
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    run(path, args).is_ok()
}

/// Return the output lines of `git <args>`, skipping empty ones.
pub fn lines<I, S>(path: &Path, args: I) -> Result<Vec<String>, GitError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    Ok(run(path, args)?
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::to_owned)
        .collect())
}
