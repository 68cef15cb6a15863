//! CLI interface for the pageforge server: argument parsing and the async
//! entrypoint used by `main` and by integration tests.
//!
//! All business logic lives in the `pageforge-core` crate; this module is
//! strictly glue — parse flags, load configuration, wire the concrete
//! components into [`AppState`], and serve.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use pageforge_core::notify::BackoffPolicy;
use pageforge_core::orchestrate::RepoLocks;
use pageforge_core::vcs::GitCli;

use crate::github::GithubClient;
use crate::load_config::load_config;
use crate::server::{self, AppState};

/// pageforge: generate small static web apps, publish them to GitHub Pages,
/// and report the result to a callback endpoint.
#[derive(Parser)]
#[clap(
    name = "pageforge",
    version,
    about = "Build-and-publish server: POST /task to generate and deploy a static site"
)]
pub struct Cli {
    /// Address to listen on.
    #[clap(long, default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,
}

/// Extracted async entrypoint for integration tests and main().
pub async fn run(cli: Cli) -> Result<()> {
    let config = load_config()?;
    let http = reqwest::Client::new();
    let state = AppState {
        host: Arc::new(GithubClient::new(&config, http.clone())),
        vcs: Arc::new(GitCli),
        config: Arc::new(config),
        locks: Arc::new(RepoLocks::new()),
        http,
        backoff: BackoffPolicy::default(),
    };
    server::serve(cli.listen, state).await
}
