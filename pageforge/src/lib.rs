#![doc = "pageforge: HTTP server crate for the pageforge build pipeline."]

//! Server glue around `pageforge-core`: environment configuration loading,
//! the concrete GitHub client, the axum router, and the CLI entrypoint.

pub mod cli;
pub mod github;
pub mod load_config;
pub mod server;
