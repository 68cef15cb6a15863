use std::process::Command;

use pageforge_core::contract::{Vcs, DEFAULT_BRANCH};
use pageforge_core::vcs::GitCli;
use tempfile::tempdir;

fn prepared_tree() -> (tempfile::TempDir, GitCli) {
    let dir = tempdir().expect("tempdir");
    let git = GitCli;
    git.init(dir.path(), DEFAULT_BRANCH).expect("init");
    git.set_identity(dir.path(), "octo", "octo@users.noreply.github.com")
        .expect("identity");
    (dir, git)
}

#[test]
fn init_is_idempotent_and_commit_resolves_to_full_hash() {
    let (dir, git) = prepared_tree();
    // Re-running init on an existing repository must not fail.
    git.init(dir.path(), DEFAULT_BRANCH).expect("re-init");

    std::fs::write(dir.path().join("index.html"), "<html></html>").expect("write file");
    git.stage_all(dir.path()).expect("stage");
    git.commit(dir.path(), "auto: build").expect("commit");

    let sha = git.current_commit(dir.path()).expect("rev-parse");
    assert_eq!(sha.len(), 40, "expected a full hash, got: {sha}");
    assert!(sha.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn empty_commits_are_allowed() {
    let (dir, git) = prepared_tree();
    git.stage_all(dir.path()).expect("stage");
    git.commit(dir.path(), "auto: build").expect("first empty commit");
    let first = git.current_commit(dir.path()).expect("rev-parse");

    // Nothing changed; the next round still publishes.
    git.stage_all(dir.path()).expect("stage again");
    git.commit(dir.path(), "auto: build").expect("second empty commit");
    let second = git.current_commit(dir.path()).expect("rev-parse");

    assert_ne!(first, second, "each round produces its own commit");
}

#[test]
fn set_remote_repairs_an_existing_origin() {
    let (dir, git) = prepared_tree();
    git.set_remote(dir.path(), "origin", "https://example.com/old.git")
        .expect("initial remote");
    git.set_remote(dir.path(), "origin", "https://example.com/new.git")
        .expect("replacement remote");

    let output = Command::new("git")
        .args(["config", "--get", "remote.origin.url"])
        .current_dir(dir.path())
        .output()
        .expect("read remote url");
    let url = String::from_utf8_lossy(&output.stdout).trim().to_string();
    assert_eq!(url, "https://example.com/new.git");
}
