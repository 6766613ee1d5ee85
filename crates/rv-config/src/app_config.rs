//! Top-level application configuration, loaded from `config.toml`.

use crate::workflow_config::{PluginConfig, WorkflowConfig};
use serde::{Deserialize, Serialize};

/// Configuration loaded from `config.toml`: ambient service settings
/// plus the workflow and plugin schemas (§2/§4.3/§4.6).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    /// Name of the env var that supplies the remote API token.
    #[serde(default = "default_credential_env_var")]
    pub credential_env_var: String,

    /// Directory under which `~/<repo>` clones are looked up for worktrees.
    #[serde(default = "default_repo_location")]
    pub repo_location: String,

    /// Path to the embedded store database. Defaults to the XDG config dir.
    pub db_path: Option<String>,

    /// Sleep between reconciliation cycles in service mode.
    #[serde(default = "default_sync_interval_secs")]
    pub sync_interval_secs: u64,

    /// Bounded per-cycle wait for the workflow and listener wait-groups.
    #[serde(default = "default_cycle_timeout_secs")]
    pub cycle_timeout_secs: u64,

    /// Default top-level review body used when a submission omits one.
    #[serde(default = "default_review_message")]
    pub default_review_message: String,

    #[serde(default)]
    pub workflows: Vec<WorkflowConfig>,

    #[serde(default)]
    pub plugins: Vec<PluginConfig>,
}

fn default_credential_env_var() -> String {
    "GH_REVIEW_TOKEN".to_string()
}

fn default_repo_location() -> String {
    dirs::home_dir()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| ".".to_string())
}

fn default_sync_interval_secs() -> u64 {
    300
}

fn default_cycle_timeout_secs() -> u64 {
    240
}

fn default_review_message() -> String {
    String::new()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            credential_env_var: default_credential_env_var(),
            repo_location: default_repo_location(),
            db_path: None,
            sync_interval_secs: default_sync_interval_secs(),
            cycle_timeout_secs: default_cycle_timeout_secs(),
            default_review_message: default_review_message(),
            workflows: Vec::new(),
            plugins: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Load config from CWD first, then the XDG config dir, or use defaults.
    pub fn load() -> Self {
        if let Some(content) = crate::load_config_file() {
            match Self::load_from_str(&content) {
                Ok(config) => {
                    log::info!("Loaded app config from file");
                    return config;
                }
                Err(e) => {
                    log::warn!("Failed to parse config file: {}", e);
                }
            }
        }

        log::debug!("Using default app config");
        Self::default()
    }

    /// Parse config from a TOML document's text.
    pub fn load_from_str(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Resolve the database path, falling back to the XDG config dir.
    pub fn resolve_db_path(&self) -> anyhow::Result<std::path::PathBuf> {
        match &self.db_path {
            Some(path) => Ok(std::path::PathBuf::from(path)),
            None => crate::paths::default_db_path(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.credential_env_var, "GH_REVIEW_TOKEN");
        assert!(!config.repo_location.is_empty());
        assert_eq!(config.sync_interval_secs, 300);
        assert_eq!(config.cycle_timeout_secs, 240);
        assert!(config.workflows.is_empty());
        assert!(config.plugins.is_empty());
    }

    #[test]
    fn test_config_deserialize_partial() {
        let toml = r#"
            credential_env_var = "ACME_TOKEN"

            [[workflows]]
            kind = "sync_review_requests"
            repos = ["acme/widgets"]
            section_title = "Review requests"

            [[plugins]]
            name = "lint-bot"
            command = "/usr/local/bin/lint-bot"
        "#;
        let config = AppConfig::load_from_str(toml).unwrap();
        assert_eq!(config.credential_env_var, "ACME_TOKEN");
        assert_eq!(config.sync_interval_secs, 300);
        assert_eq!(config.workflows.len(), 1);
        assert_eq!(config.plugins.len(), 1);
        assert_eq!(config.plugins[0].name, "lint-bot");
    }

    #[test]
    fn test_db_path_defaults_to_xdg_config_dir() {
        let config = AppConfig::default();
        let resolved = config.resolve_db_path().unwrap();
        assert!(resolved.ends_with("store.sqlite3"));
    }
}
