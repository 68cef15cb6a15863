//! Repository provisioning: make sure the working tree is a repository
//! linked to an existing remote, and materialize the auxiliary artifacts
//! (license, readme) that accompany every publish.
//!
//! Every step is independently idempotent, so repeated requests for the same
//! task identifier are safe to retry end to end.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::config::Config;
use crate::contract::{ProvisionError, RepoHost, Vcs, DEFAULT_BRANCH};

const LICENSE_TEXT: &str = "MIT License\n\nCopyright (c) 2025\n\nPermission is hereby granted, free of charge, \
to any person obtaining a copy of this software and associated documentation files \
(the 'Software'), to deal in the Software without restriction, including without \
limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, \
and/or sell copies of the Software.\n";

/// Derive the repository name from a task identifier: path separators become
/// dashes. The mapping is 1:1 for the lifetime of a request.
pub fn sanitize_repo_name(task: &str) -> String {
    task.replace(['/', '\\'], "-")
}

/// Human-readable title for the README: separators become spaces, words are
/// title-cased.
pub fn display_title(repo_name: &str) -> String {
    repo_name
        .replace(['-', '_'], " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Ensure the working tree exists, is an initialised repository with a
/// committer identity, and is linked to an existing remote repository.
///
/// Remote creation treats "already exists" as success (handled inside the
/// [`RepoHost`] implementation); any other remote failure aborts the
/// pipeline with a [`ProvisionError`].
pub async fn ensure_repository<H, V>(
    host: &H,
    vcs: &V,
    config: &Config,
    repo_name: &str,
    work_dir: &Path,
) -> Result<(), ProvisionError>
where
    H: RepoHost + ?Sized,
    V: Vcs + ?Sized,
{
    fs::create_dir_all(work_dir)?;

    vcs.init(work_dir, DEFAULT_BRANCH)?;
    vcs.set_identity(
        work_dir,
        &config.github_user,
        &format!("{}@users.noreply.github.com", config.github_user),
    )?;

    host.create_repository(repo_name).await?;

    vcs.set_remote(work_dir, "origin", &host.remote_url(repo_name))?;

    info!(
        repo_name,
        work_dir = %work_dir.display(),
        "Repository provisioned and linked to remote"
    );
    Ok(())
}

/// Write the fixed license and the assembled README into the working tree.
/// Pure filesystem writes, safe to re-run (overwrite in place).
pub fn write_license_and_readme(
    work_dir: &Path,
    title: &str,
    summary: &str,
) -> Result<(), ProvisionError> {
    fs::write(work_dir.join("LICENSE"), LICENSE_TEXT)?;
    fs::write(
        work_dir.join("README.md"),
        format!("# {title}\n\n{summary}\n\n## License\nMIT\n"),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_path_separators() {
        assert_eq!(sanitize_repo_name("demo/app"), "demo-app");
        assert_eq!(sanitize_repo_name("a/b/c"), "a-b-c");
        assert_eq!(sanitize_repo_name("win\\path"), "win-path");
        assert_eq!(sanitize_repo_name("plain"), "plain");
    }

    #[test]
    fn titles_from_repo_names() {
        assert_eq!(display_title("demo-app"), "Demo App");
        assert_eq!(display_title("my_cool-site"), "My Cool Site");
        assert_eq!(display_title("UPPER"), "Upper");
    }
}
