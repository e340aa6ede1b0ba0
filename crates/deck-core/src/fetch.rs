//! Pull-only access to the remote artifact source.

use crate::error::{DeckError, Result};
use std::path::Path;
use std::process::{Command, Stdio};

/// How the cache obtains and refreshes its tree.
pub trait Fetcher {
    /// Full fetch of `source` into the empty or absent directory `dest`.
    fn fetch(&self, source: &str, dest: &Path) -> Result<()>;

    /// Incremental update of a tree previously produced by [`Fetcher::fetch`].
    fn refresh(&self, source: &str, dest: &Path) -> Result<()>;
}

/// Fetches with the `git` binary: shallow clone, then fast-forward pulls.
#[derive(Debug, Default, Clone)]
pub struct GitFetcher;

impl Fetcher for GitFetcher {
    fn fetch(&self, source: &str, dest: &Path) -> Result<()> {
        let dest_str = dest.to_string_lossy();
        run_git(
            source,
            dest,
            &["clone", "--depth", "1", "--quiet", source, dest_str.as_ref()],
            None,
        )
    }

    fn refresh(&self, source: &str, dest: &Path) -> Result<()> {
        run_git(source, dest, &["pull", "--ff-only", "--quiet"], Some(dest))
    }
}

fn run_git(source: &str, dest: &Path, args: &[&str], cwd: Option<&Path>) -> Result<()> {
    let fail = |reason: String| DeckError::FetchFailed {
        source_url: source.to_string(),
        path: dest.to_path_buf(),
        reason,
    };

    let git = which::which("git").map_err(|_| fail("git not found on PATH".to_string()))?;
    let mut cmd = Command::new(git);
    cmd.args(args)
        .env("GIT_TERMINAL_PROMPT", "0")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped());
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    tracing::debug!(args = ?args, "running git");

    let output = cmd.output().map_err(|e| fail(e.to_string()))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(fail(stderr.trim().to_string()));
    }
    Ok(())
}
