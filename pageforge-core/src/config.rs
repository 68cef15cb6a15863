use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Process-wide configuration, constructed once at startup and passed by
/// reference into each component. Components never read ambient process
/// state, so they stay testable with fabricated configurations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Shared secret the caller must present on every request.
    pub shared_secret: String,
    /// Hosting provider account owning the created repositories.
    pub github_user: String,
    /// Token authorising repository creation and pushes.
    pub github_token: String,
    /// Directory under which per-task working trees live. Trees persist
    /// across requests and are never deleted by this system.
    pub workspace_root: PathBuf,
    /// Generation provider settings; `None` means fallback-only operation.
    pub llm: Option<LlmConfig>,
}

/// Settings for the external text-generation provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl Config {
    pub fn trace_loaded(&self) {
        info!(
            github_user = %self.github_user,
            token_set = !self.github_token.is_empty(),
            secret_set = !self.shared_secret.is_empty(),
            workspace_root = %self.workspace_root.display(),
            llm_configured = self.llm.is_some(),
            "Loaded Config"
        );
        debug!(
            llm_model = self.llm.as_ref().map(|l| l.model.as_str()),
            "Config loaded (generation provider)"
        );
    }
}
