//! # contract: data model and trait seams for the build pipeline
//!
//! This module defines the request/response types exchanged with the caller,
//! the error taxonomy of the pipeline, and the two abstractions the
//! orchestrator depends on:
//!
//! - [`Vcs`]: a narrow interface over shell-invoked version control. The
//!   orchestrator only ever talks to this trait; the production
//!   implementation ([`crate::vcs::GitCli`]) shells out to `git`.
//! - [`RepoHost`]: repository creation at the hosting provider plus URL
//!   derivation for the remote, the public repository page and the published
//!   site.
//!
//! ## Mocking & Testing
//! Both traits are annotated for `mockall`, so consumers can generate
//! deterministic mocks for unit/integration tests. The mocks are exported
//! behind the default-on `test-export-mocks` feature so dependent crates can
//! use them in their own test suites.

use std::path::Path;

use async_trait::async_trait;
use mockall::automock;
use serde::{Deserialize, Serialize};

/// Branch every repository is initialised with and pushed to. The CI
/// workflow descriptor triggers on pushes to this branch, so the three must
/// never disagree.
pub const DEFAULT_BRANCH: &str = "main";

/// A named attachment on the build request. Only the URL is consumed: the
/// first attachment's URL becomes the fallback page's default image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    pub url: String,
}

/// One build request, as posted to the `/task` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildRequest {
    /// Opaque caller identifier, echoed back in the result.
    pub email: String,
    /// Shared secret; checked before any side effect.
    pub secret: String,
    /// Task identifier. Sanitized into the repository name (path separators
    /// become dashes); the mapping is 1:1 for the lifetime of the request.
    pub task: String,
    /// Monotonically increasing round number, >= 1.
    pub round: u32,
    /// Caller-supplied idempotency/correlation token, opaque.
    pub nonce: String,
    /// Free-text description of what to build.
    pub brief: String,
    /// Advisory check names; not evaluated by the pipeline.
    #[serde(default)]
    pub checks: Vec<String>,
    /// Callback URL the result payload is delivered to.
    pub evaluation_url: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

/// A single generated file: a path relative to the working tree and UTF-8
/// content. This is also the element shape of the generation provider's
/// `{"files": [...]}` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedFile {
    pub path: String,
    pub content: String,
}

/// The outcome payload: correlation fields echoed from the request plus the
/// published locations. Produced exactly once per request, regardless of
/// notification outcome.
#[derive(Debug, Clone, Serialize)]
pub struct TaskReport {
    pub email: String,
    pub task: String,
    pub round: u32,
    pub nonce: String,
    pub repo_url: String,
    pub commit_sha: String,
    pub pages_url: String,
}

/// Response returned to the original caller. `status` is `"ok"` when the
/// callback was delivered and `"accepted"` when delivery gave up; `note`
/// carries the delivery failure summary in the latter case.
#[derive(Debug, Clone, Serialize)]
pub struct TaskResponse {
    pub status: String,
    #[serde(flatten)]
    pub report: TaskReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// A version-control invocation failed.
#[derive(Debug, thiserror::Error)]
pub enum VcsError {
    #[error("failed to launch git: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("git {args} exited with code {code:?}: {stderr}")]
    Command {
        args: String,
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },
}

/// Repository provisioning failed for a reason other than "already exists".
/// Fatal: aborts the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error("failed to prepare working tree: {0}")]
    Workspace(#[from] std::io::Error),
    #[error(transparent)]
    Vcs(#[from] VcsError),
    #[error("repository creation request failed: {0}")]
    RepoRequest(#[from] reqwest::Error),
    #[error("repository creation failed ({status}): {body}")]
    RepoCreate { status: u16, body: String },
}

/// Staging, committing or pushing failed. Fatal: aborts the pipeline. The
/// wrapped [`VcsError`] carries the captured stdout/stderr for diagnostics;
/// callers must log it, never forward it verbatim to the external caller.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error(transparent)]
    Vcs(#[from] VcsError),
}

/// Top-level pipeline failure. `Unauthorized` is the only variant produced
/// before any side effect; everything else leaves partial artifacts in
/// place (no rollback).
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("invalid secret")]
    Unauthorized,
    #[error("failed to write generated files: {0}")]
    Materialize(#[source] std::io::Error),
    #[error(transparent)]
    Provision(#[from] ProvisionError),
    #[error(transparent)]
    Publish(#[from] PublishError),
}

/// Narrow interface over shell-invoked version control. Every method maps
/// to a single underlying invocation and is blocking from the caller's
/// point of view. Implementations must be idempotency-preserving where the
/// underlying tool is (re-running `init` on an existing repository is fine).
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait Vcs: Send + Sync {
    /// Initialise a repository in `work_dir` on `branch` if not already
    /// initialised.
    fn init(&self, work_dir: &Path, branch: &str) -> Result<(), VcsError>;

    /// Set the committer identity for `work_dir`. Required because some
    /// hosting providers reject commits from an unset identity.
    fn set_identity(&self, work_dir: &Path, name: &str, email: &str) -> Result<(), VcsError>;

    /// Point the remote `name` at `url`, replacing a stale remote if one
    /// exists. Absence of the remote is not an error.
    fn set_remote(&self, work_dir: &Path, name: &str, url: &str) -> Result<(), VcsError>;

    /// Stage all changes in the working tree.
    fn stage_all(&self, work_dir: &Path) -> Result<(), VcsError>;

    /// Commit staged changes. Empty commits are allowed so the pipeline
    /// never stalls on byte-identical content.
    fn commit(&self, work_dir: &Path, message: &str) -> Result<(), VcsError>;

    /// Push `branch` to `remote`, establishing upstream tracking.
    fn push(&self, work_dir: &Path, remote: &str, branch: &str) -> Result<(), VcsError>;

    /// Resolve the current commit identifier (full hash).
    fn current_commit(&self, work_dir: &Path) -> Result<String, VcsError>;
}

/// Repository hosting provider: idempotent repository creation plus URL
/// derivation. Implemented by the GitHub client in the binary crate and by
/// mocks in tests.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait RepoHost: Send + Sync {
    /// Ensure the remote repository `name` exists. An "already exists"
    /// response from the provider is success; any other non-success
    /// response is a hard failure.
    async fn create_repository(&self, name: &str) -> Result<(), ProvisionError>;

    /// Authenticated URL used as the push remote.
    fn remote_url(&self, name: &str) -> String;

    /// Public URL of the repository.
    fn repo_url(&self, name: &str) -> String;

    /// URL of the published static site.
    fn pages_url(&self, name: &str) -> String;
}
