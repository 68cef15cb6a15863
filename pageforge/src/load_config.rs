//! `load_config` module: builds the typed [`Config`] from environment
//! variables, the only place where ambient process state is read. The
//! resulting struct is constructed once at startup and passed by reference
//! into every component, so components stay testable with fabricated
//! configurations.
//!
//! # Errors
//! All errors here use `anyhow::Error` for context-rich diagnostics,
//! surfaced at the CLI boundary.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use pageforge_core::config::{Config, LlmConfig};
use tracing::warn;

const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Read the server configuration from the environment. `APP_SECRET`,
/// `GITHUB_USER` and `GITHUB_TOKEN` are required; the generation provider
/// (`LLM_API_BASE` + `LLM_API_KEY`, optional `LLM_MODEL`) is optional and
/// its absence selects fallback-only generation.
pub fn load_config() -> Result<Config> {
    let shared_secret = env::var("APP_SECRET").context("APP_SECRET must be set")?;
    let github_user = env::var("GITHUB_USER").context("GITHUB_USER must be set")?;
    let github_token = env::var("GITHUB_TOKEN").context("GITHUB_TOKEN must be set")?;
    let workspace_root = env::var("WORKSPACE_ROOT")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("app"));

    let llm = match (env::var("LLM_API_BASE"), env::var("LLM_API_KEY")) {
        (Ok(base_url), Ok(api_key)) => Some(LlmConfig {
            base_url,
            api_key,
            model: env::var("LLM_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
        }),
        _ => {
            warn!("LLM_API_BASE/LLM_API_KEY not set; generation will use the fallback template");
            None
        }
    };

    let config = Config {
        shared_secret,
        github_user,
        github_token,
        workspace_root,
        llm,
    };
    config.trace_loaded();
    Ok(config)
}
