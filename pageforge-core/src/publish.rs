//! Publishing: stage, commit and push the working tree, then report the
//! resulting commit identifier.
//!
//! The sequence is strictly linear; a failure at any step aborts the
//! remaining steps and the whole request. Empty commits are allowed so a
//! round that regenerated byte-identical content still publishes.

use std::path::Path;

use tracing::info;

use crate::contract::{PublishError, Vcs, DEFAULT_BRANCH};

const COMMIT_MESSAGE: &str = "auto: build";

/// Stage all changes, commit (allowing empty), re-assert the `origin`
/// remote, push to the default branch with upstream tracking, and return
/// the full hash of the resulting commit.
pub fn commit_and_push<V>(
    vcs: &V,
    work_dir: &Path,
    remote_url: &str,
) -> Result<String, PublishError>
where
    V: Vcs + ?Sized,
{
    vcs.stage_all(work_dir)?;
    vcs.commit(work_dir, COMMIT_MESSAGE)?;
    vcs.set_remote(work_dir, "origin", remote_url)?;
    vcs.push(work_dir, "origin", DEFAULT_BRANCH)?;
    let commit_sha = vcs.current_commit(work_dir)?;

    info!(
        commit_sha = %commit_sha,
        work_dir = %work_dir.display(),
        "Pushed working tree to remote"
    );
    Ok(commit_sha)
}
