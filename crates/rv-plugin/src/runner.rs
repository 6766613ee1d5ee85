//! `PluginRunner`: spawns one external process per configured plugin
//! per PR, caching results in the Store. Plugins are static for the
//! process lifetime.

use log::{error, info, warn};
use rv_config::PluginConfig;
use rv_store::{PluginStatus, PrKey, Store};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::process::Command;
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct PluginRunner {
    store: Store,
    plugins: Vec<PluginConfig>,
    in_flight: Arc<Mutex<HashSet<(String, String, u64, String)>>>,
}

/// Inputs available at dispatch time that a plugin may opt into via its
/// configured flags.
#[derive(Debug, Clone, Default)]
pub struct PluginInputs<'a> {
    pub diff: Option<&'a str>,
    pub comments_json: Option<&'a str>,
    pub headers_json: Option<&'a str>,
}

impl PluginRunner {
    pub fn new(store: Store, plugins: Vec<PluginConfig>) -> Self {
        Self {
            store,
            plugins,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn list_plugins(&self) -> &[PluginConfig] {
        &self.plugins
    }

    pub async fn get_plugin_output(&self, key: &PrKey) -> rv_store::Result<Vec<rv_store::PluginResult>> {
        self.store.list_plugin_results(key).await
    }

    /// Dispatches every configured plugin against one PR. Each plugin
    /// runs as its own task; a plugin already in flight for this PR is
    /// skipped (no-op) rather than rerun.
    pub async fn run_all(&self, key: &PrKey, inputs: PluginInputs<'_>) {
        let mut handles = Vec::new();
        for plugin in self.plugins.clone() {
            let runner = self.clone();
            let key = key.clone();
            let diff = inputs.diff.map(str::to_string);
            let comments_json = inputs.comments_json.map(str::to_string);
            let headers_json = inputs.headers_json.map(str::to_string);
            handles.push(tokio::spawn(async move {
                runner
                    .run_one(
                        &key,
                        &plugin,
                        PluginInputs {
                            diff: diff.as_deref(),
                            comments_json: comments_json.as_deref(),
                            headers_json: headers_json.as_deref(),
                        },
                    )
                    .await;
            }));
        }
        for handle in handles {
            let _ = handle.await;
        }
    }

    async fn run_one(&self, key: &PrKey, plugin: &PluginConfig, inputs: PluginInputs<'_>) {
        let flight_key = (key.owner.clone(), key.repo.clone(), key.number, plugin.name.clone());
        {
            let mut in_flight = self.in_flight.lock().await;
            if !in_flight.insert(flight_key.clone()) {
                info!(
                    "plugin '{}' already running for {}/{}#{}, skipping",
                    plugin.name, key.owner, key.repo, key.number
                );
                return;
            }
        }

        if let Err(err) = self
            .store
            .put_plugin_result(key, &plugin.name, PluginStatus::Pending, "")
            .await
        {
            error!("failed to record pending plugin result for '{}': {err}", plugin.name);
        }

        let mut command = Command::new(&plugin.command);
        command
            .arg("--owner")
            .arg(&key.owner)
            .arg("--repo")
            .arg(&key.repo)
            .arg("--number")
            .arg(key.number.to_string());

        if plugin.include_diff {
            if let Some(diff) = inputs.diff {
                command.arg("--diff").arg(diff);
            }
        }
        if plugin.include_comments {
            if let Some(comments) = inputs.comments_json {
                command.arg("--comments").arg(comments);
            }
        }
        if plugin.include_headers {
            if let Some(headers) = inputs.headers_json {
                command.arg("--headers").arg(headers);
            }
        }

        let (status, output) = match command.output().await {
            Ok(result) if result.status.success() => {
                (PluginStatus::Success, String::from_utf8_lossy(&result.stdout).to_string())
            }
            Ok(result) => {
                warn!("plugin '{}' exited with {}", plugin.name, result.status);
                (PluginStatus::Error, String::from_utf8_lossy(&result.stderr).to_string())
            }
            Err(err) => {
                error!("failed to spawn plugin '{}': {err}", plugin.name);
                (PluginStatus::Error, err.to_string())
            }
        };

        if let Err(err) = self.store.put_plugin_result(key, &plugin.name, status, &output).await {
            error!("failed to record plugin result for '{}': {err}", plugin.name);
        }

        self.in_flight.lock().await.remove(&flight_key);
    }
}
