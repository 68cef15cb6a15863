//! `git` as a subprocess: the production implementation of the [`Vcs`]
//! trait. Each method is one invocation with captured output; a non-zero
//! exit becomes a [`VcsError::Command`] carrying the captured
//! stdout/stderr for diagnostics.

use std::path::Path;
use std::process::Command;

use tracing::{debug, error};

use crate::contract::{Vcs, VcsError};

/// Shell-invoked git.
#[derive(Debug, Default, Clone, Copy)]
pub struct GitCli;

impl GitCli {
    fn run(&self, work_dir: &Path, args: &[&str]) -> Result<String, VcsError> {
        let output = Command::new("git")
            .args(args)
            .current_dir(work_dir)
            .output()
            .map_err(|e| {
                error!(error = ?e, args = ?args, "Failed to launch git process");
                VcsError::Spawn(e)
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !output.status.success() {
            error!(
                args = ?args,
                code = output.status.code(),
                stderr = %stderr,
                "git exited with non-zero code"
            );
            return Err(VcsError::Command {
                args: args.join(" "),
                code: output.status.code(),
                stdout,
                stderr,
            });
        }
        debug!(args = ?args, work_dir = %work_dir.display(), "git succeeded");
        Ok(stdout)
    }
}

impl Vcs for GitCli {
    fn init(&self, work_dir: &Path, branch: &str) -> Result<(), VcsError> {
        self.run(work_dir, &["init", "-b", branch]).map(|_| ())
    }

    fn set_identity(&self, work_dir: &Path, name: &str, email: &str) -> Result<(), VcsError> {
        self.run(work_dir, &["config", "user.name", name])?;
        self.run(work_dir, &["config", "user.email", email])
            .map(|_| ())
    }

    fn set_remote(&self, work_dir: &Path, name: &str, url: &str) -> Result<(), VcsError> {
        // Removal of a stale remote may fail because it does not exist yet;
        // absence is not an error.
        if let Err(e) = self.run(work_dir, &["remote", "remove", name]) {
            debug!(remote = name, error = %e, "No stale remote to remove");
        }
        self.run(work_dir, &["remote", "add", name, url]).map(|_| ())
    }

    fn stage_all(&self, work_dir: &Path) -> Result<(), VcsError> {
        self.run(work_dir, &["add", "."]).map(|_| ())
    }

    fn commit(&self, work_dir: &Path, message: &str) -> Result<(), VcsError> {
        self.run(work_dir, &["commit", "-m", message, "--allow-empty"])
            .map(|_| ())
    }

    fn push(&self, work_dir: &Path, remote: &str, branch: &str) -> Result<(), VcsError> {
        self.run(work_dir, &["push", "-u", remote, branch]).map(|_| ())
    }

    fn current_commit(&self, work_dir: &Path) -> Result<String, VcsError> {
        self.run(work_dir, &["rev-parse", "HEAD"])
    }
}
