//! Multi-host client manager
//!
//! Manages remote clients for different hosts (github.com, GitHub
//! Enterprise). Clients are lazily initialized and cached per host.

use crate::{OctocrabClient, DEFAULT_HOST};
use anyhow::{Context, Result};
use log::{debug, info};
use octocrab::Octocrab;
use std::collections::HashMap;
use std::sync::Arc;

/// Resolves tokens for different hosts.
///
/// Tries multiple sources in order:
/// 1. Host-specific env var (e.g., `GITHUB_TOKEN_GHE_EXAMPLE_COM`)
/// 2. `gh auth token --hostname {host}` command
/// 3. `GH_REVIEW_TOKEN`, falling back to `GITHUB_TOKEN`/`GH_TOKEN` (github.com only)
#[derive(Debug, Clone)]
pub struct TokenResolver {
    /// Cached default token from GH_REVIEW_TOKEN/GITHUB_TOKEN/GH_TOKEN
    default_token: Option<String>,
}

impl Default for TokenResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenResolver {
    /// Create a new token resolver.
    pub fn new() -> Self {
        let default_token = std::env::var("GH_REVIEW_TOKEN")
            .or_else(|_| std::env::var("GITHUB_TOKEN"))
            .or_else(|_| std::env::var("GH_TOKEN"))
            .ok();

        Self { default_token }
    }

    /// Get a token for the given host.
    ///
    /// # Token Resolution Order
    ///
    /// 1. `GITHUB_TOKEN_{HOST}` env var (e.g., `GITHUB_TOKEN_GHE_EXAMPLE_COM`)
    /// 2. `gh auth token --hostname {host}` command
    /// 3. `GH_REVIEW_TOKEN`/`GITHUB_TOKEN`/`GH_TOKEN` (github.com only)
    pub async fn get_token(&self, host: Option<&str>) -> Result<String> {
        let host = host.unwrap_or(DEFAULT_HOST);

        let env_key = format!(
            "GITHUB_TOKEN_{}",
            host.replace(['.', '-'], "_").to_uppercase()
        );
        if let Ok(token) = std::env::var(&env_key) {
            debug!("Using token from env var {} for host {}", env_key, host);
            return Ok(token);
        }

        debug!("Trying gh auth token for host {}", host);
        let output = tokio::process::Command::new("gh")
            .args(["auth", "token", "--hostname", host])
            .output()
            .await
            .context("Failed to run 'gh auth token'")?;

        if output.status.success() {
            let token = String::from_utf8(output.stdout)
                .context("Invalid UTF-8 in gh auth token output")?
                .trim()
                .to_string();
            if !token.is_empty() {
                debug!("Using token from gh CLI for host {}", host);
                return Ok(token);
            }
        }

        if host == DEFAULT_HOST {
            if let Some(ref token) = self.default_token {
                debug!("Using default token (GH_REVIEW_TOKEN/GITHUB_TOKEN/GH_TOKEN) for github.com");
                return Ok(token.clone());
            }
        }

        Err(anyhow::anyhow!(
            "No token found for host '{}'. \
             Set {} or run 'gh auth login --hostname {}'",
            host,
            env_key,
            host
        ))
    }
}

/// Manages remote clients for multiple hosts.
///
/// Lazily creates and caches clients per host. Each client is
/// configured with the appropriate base URL and authentication token.
pub struct ClientManager {
    clients: HashMap<String, Arc<OctocrabClient>>,
    tokens: TokenResolver,
}

impl Default for ClientManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientManager {
    /// Create a new client manager.
    pub fn new() -> Self {
        Self {
            clients: HashMap::new(),
            tokens: TokenResolver::new(),
        }
    }

    /// Get or create a client for the given host.
    pub async fn get_client(&mut self, host: Option<&str>) -> Result<Arc<OctocrabClient>> {
        let key = host.unwrap_or(DEFAULT_HOST).to_string();

        if !self.clients.contains_key(&key) {
            let client = self.create_client(host).await?;
            self.clients.insert(key.clone(), client);
        }

        Ok(Arc::clone(self.clients.get(&key).unwrap()))
    }

    /// Check if a client exists for the given host (without creating one).
    pub fn has_client(&self, host: Option<&str>) -> bool {
        let key = host.unwrap_or(DEFAULT_HOST);
        self.clients.contains_key(key)
    }

    /// Remove a client for the given host.
    ///
    /// Useful for forcing re-authentication after token changes.
    pub fn remove_client(&mut self, host: Option<&str>) {
        let key = host.unwrap_or(DEFAULT_HOST);
        self.clients.remove(key);
    }

    /// Get the default token (github.com) if available.
    pub fn default_token(&self) -> Option<&str> {
        self.tokens.default_token.as_deref()
    }

    async fn create_client(&self, host: Option<&str>) -> Result<Arc<OctocrabClient>> {
        let effective_host = host.unwrap_or(DEFAULT_HOST);
        info!("Creating client for host: {}", effective_host);

        let token = self.tokens.get_token(host).await?;

        let mut builder = Octocrab::builder().personal_token(token);

        let base_url = if let Some(h) = host {
            if h != DEFAULT_HOST {
                let uri = format!("https://{}/api/v3", h);
                builder = builder.base_uri(&uri).context("Failed to set base URI")?;
                uri
            } else {
                "https://api.github.com".to_string()
            }
        } else {
            "https://api.github.com".to_string()
        };

        let octocrab = builder.build().context("Failed to build Octocrab client")?;
        let client = OctocrabClient::with_base_url(Arc::new(octocrab), base_url);

        info!("Client created for host: {}", effective_host);
        Ok(Arc::new(client))
    }
}
