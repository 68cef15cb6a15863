//! High-level pipeline: orchestrates one build request from auth check to
//! caller response.
//!
//! The stages run strictly in order, with no branching back-edges:
//! auth check -> generate -> provision (+ license/readme) -> publish ->
//! build result -> notify -> respond. Every stage failure after the auth
//! check is fatal to the request and performs no rollback; already-created
//! files, commits and remote repositories stay in place. Notification
//! failure is the one non-fatal outcome: it only downgrades the response
//! status to `accepted` and attaches a note.
//!
//! # Concurrency
//! Working trees are keyed by sanitized task identifier and shared across
//! requests, so same-task requests serialize on a per-repository-name lock
//! ([`RepoLocks`]); requests for different tasks proceed concurrently.
//!
//! # Callable From
//! - Used by the server crate and by integration tests
//! - Expects concrete [`RepoHost`] and [`Vcs`] implementations (or mocks)

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::{error, info};

use crate::config::Config;
use crate::contract::{BuildError, BuildRequest, RepoHost, TaskReport, TaskResponse, Vcs};
use crate::notify::BackoffPolicy;
use crate::{generate, notify, provision, publish};

/// Per-repository-name serialization of in-flight requests. Entries are
/// created on demand and never evicted; the set of names is bounded by the
/// set of task identifiers, matching the never-deleted working trees.
#[derive(Debug, Default)]
pub struct RepoLocks {
    inner: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl RepoLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `repo_name`, waiting for any in-flight request
    /// on the same repository to finish first.
    pub async fn acquire(&self, repo_name: &str) -> tokio::sync::OwnedMutexGuard<()> {
        let slot = {
            let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(map.entry(repo_name.to_string()).or_default())
        };
        slot.lock_owned().await
    }
}

/// Run the full pipeline for one request and assemble the response.
///
/// The auth check happens before any side effect; a secret mismatch returns
/// [`BuildError::Unauthorized`] with nothing written anywhere.
pub async fn run_build<H, V>(
    config: &Config,
    host: &H,
    vcs: &V,
    locks: &RepoLocks,
    http: &reqwest::Client,
    backoff: &BackoffPolicy,
    req: &BuildRequest,
) -> Result<TaskResponse, BuildError>
where
    H: RepoHost + ?Sized,
    V: Vcs + ?Sized,
{
    if req.secret != config.shared_secret {
        info!(task = %req.task, "[BUILD] Rejected request with invalid secret");
        return Err(BuildError::Unauthorized);
    }

    let repo_name = provision::sanitize_repo_name(&req.task);
    let work_dir = config.workspace_root.join(&repo_name);
    info!(
        task = %req.task,
        repo_name = %repo_name,
        round = req.round,
        "[BUILD] Starting build pipeline"
    );

    let _guard = locks.acquire(&repo_name).await;

    if let Err(e) = generate::materialize_app(
        http,
        config.llm.as_ref(),
        &work_dir,
        &req.brief,
        &req.attachments,
    )
    .await
    {
        error!(error = ?e, repo_name = %repo_name, "[BUILD][ERROR] Failed to write generated files");
        return Err(BuildError::Materialize(e));
    }
    info!(repo_name = %repo_name, "[BUILD] Generated artifact files");

    provision::ensure_repository(host, vcs, config, &repo_name, &work_dir).await?;

    let title = provision::display_title(&repo_name);
    let summary = format!(
        "{}\n\nThis app was generated automatically for task '{}' (round {}).",
        req.brief, req.task, req.round
    );
    provision::write_license_and_readme(&work_dir, &title, &summary)?;
    info!(repo_name = %repo_name, "[BUILD] Provisioned repository and auxiliary files");

    let commit_sha = publish::commit_and_push(vcs, &work_dir, &host.remote_url(&repo_name))?;
    info!(repo_name = %repo_name, commit_sha = %commit_sha, "[BUILD] Published working tree");

    let report = TaskReport {
        email: req.email.clone(),
        task: req.task.clone(),
        round: req.round,
        nonce: req.nonce.clone(),
        repo_url: host.repo_url(&repo_name),
        commit_sha,
        pages_url: host.pages_url(&repo_name),
    };

    let outcome = notify::deliver(http, &req.evaluation_url, &report, backoff).await;
    let status = if outcome.delivered { "ok" } else { "accepted" };
    info!(
        repo_name = %repo_name,
        delivered = outcome.delivered,
        status,
        "[BUILD] Pipeline complete"
    );

    Ok(TaskResponse {
        status: status.to_string(),
        report,
        note: outcome.note,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_repo_acquisitions_serialize() {
        let locks = Arc::new(RepoLocks::new());
        let guard = locks.acquire("demo-app").await;

        let contended = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.acquire("demo-app").await;
            })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!contended.is_finished(), "same-name acquire should wait");

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contended)
            .await
            .expect("lock should be released to the waiter")
            .expect("waiter task should not panic");
    }

    #[tokio::test]
    async fn different_repos_do_not_contend() {
        let locks = RepoLocks::new();
        let _a = locks.acquire("repo-a").await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.acquire("repo-b")).await;
        assert!(b.is_ok(), "distinct names must not share a lock");
    }
}
