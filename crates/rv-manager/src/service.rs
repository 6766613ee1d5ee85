//! `ManagerService`: wires the workflow fan-out, the reconciliation
//! pipeline, and the plugin runner into one sync cycle, and runs that
//! cycle on a configured clock.

use crate::lock::SyncLock;
use log::{error, info, warn};
use rv_config::AppConfig;
use rv_plugin::{PluginInputs, PluginRunner};
use rv_remote::RemoteRepo;
use rv_store::{PrKey, Store};
use rv_workflow::item_serializer::parse_identifier;
use rv_workflow::{FileChange, FileChangeKind, NoopProjectTracker, ProjectTracker, RunResult};
use rv_worktree::WorktreeManager;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Tally of what one call to `run_cycle` produced, across every
/// configured workflow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub workflows_run: u32,
    pub result: RunResult,
}

pub struct ManagerService {
    config: AppConfig,
    store: Store,
    remote: Arc<dyn RemoteRepo>,
    worktrees: WorktreeManager,
    plugins: PluginRunner,
    tracker: Arc<dyn ProjectTracker>,
    _lock: SyncLock,
}

impl ManagerService {
    /// Attempts to acquire the advisory sync lock at `lock_path` and
    /// build a service around it. Returns `None` if another process
    /// already holds the lock — per `spec.md` §5, the caller should
    /// then run the RPCServer only, with no cycle loop in this process.
    ///
    /// Production callers resolve `lock_path` from
    /// `rv_config::paths::sync_lock_path()`; it is a parameter here so
    /// tests can point at a scratch directory instead of the process's
    /// real config dir.
    pub fn try_new(
        config: AppConfig,
        store: Store,
        remote: Arc<dyn RemoteRepo>,
        worktrees: WorktreeManager,
        plugins: PluginRunner,
        lock_path: &Path,
    ) -> Option<Self> {
        let lock = SyncLock::try_acquire(lock_path)?;
        Some(Self {
            config,
            store,
            remote,
            worktrees,
            plugins,
            tracker: Arc::new(NoopProjectTracker),
            _lock: lock,
        })
    }

    /// Runs every configured workflow concurrently, reconciles the
    /// survivors against the Store, then dispatches plugins for every
    /// PR that changed. Bounded by `cycle_timeout_secs`.
    pub async fn run_cycle(&self) -> CycleReport {
        let viewer_login = match self.remote.fetch_viewer_login().await {
            Ok(login) => login,
            Err(err) => {
                error!("could not resolve the authenticated user, skipping this cycle: {err:#}");
                return CycleReport::default();
            }
        };

        let mut handles = Vec::new();
        let mut abort_handles = Vec::new();
        for workflow_config in self.config.workflows.clone() {
            let remote = Arc::clone(&self.remote);
            let store = self.store.clone();
            let tracker = Arc::clone(&self.tracker);
            let viewer_login = viewer_login.clone();
            let handle = tokio::spawn(async move {
                rv_workflow::run(remote.as_ref(), &store, tracker.as_ref(), &workflow_config, &viewer_login).await
            });
            abort_handles.push(handle.abort_handle());
            handles.push(handle);
        }

        let workflows_run = handles.len() as u32;
        let join_timeout = Duration::from_secs(self.config.cycle_timeout_secs);

        let gather = async {
            let mut events = Vec::new();
            let mut result = RunResult::default();
            for handle in handles {
                match handle.await {
                    Ok(Ok((mut changes, run_result))) => {
                        result.added += run_result.added;
                        result.updated += run_result.updated;
                        result.deleted += run_result.deleted;
                        result.skipped += run_result.skipped;
                        events.append(&mut changes);
                    }
                    Ok(Err(err)) => error!("workflow run failed: {err:#}"),
                    Err(err) => error!("workflow task panicked: {err}"),
                }
            }
            (events, result)
        };

        // spec.md §5 requires a bounded wait on the workflow wait-group: a
        // single hung remote call in one workflow must not stall the cycle
        // forever. On timeout the still-running workflows are aborted and
        // this cycle is abandoned outright, matching the "logs an error and
        // advances to the next cycle" contract.
        let (events, result) = match tokio::time::timeout(join_timeout, gather).await {
            Ok(outcome) => outcome,
            Err(_) => {
                error!(
                    "workflow wait-group timed out after {}s, aborting remaining workflows and advancing to the next cycle",
                    join_timeout.as_secs()
                );
                for abort_handle in &abort_handles {
                    abort_handle.abort();
                }
                return CycleReport { workflows_run, result: RunResult::default() };
            }
        };
        let report = CycleReport { workflows_run, result };

        let changed: Vec<FileChange> = events
            .iter()
            .filter(|change| matches!(change.kind, FileChangeKind::Addition(_) | FileChangeKind::Update(_)))
            .cloned()
            .collect();

        rv_reconcile::run_cycle(events, &self.store, &self.worktrees, join_timeout).await;

        self.dispatch_plugins(&changed).await;

        info!(
            "cycle complete: {} workflow(s), {} added, {} updated, {} deleted, {} unchanged",
            report.workflows_run, report.result.added, report.result.updated, report.result.deleted, report.result.skipped
        );
        report
    }

    async fn dispatch_plugins(&self, changed: &[FileChange]) {
        if self.plugins.list_plugins().is_empty() {
            return;
        }
        let want_diff = self.plugins.list_plugins().iter().any(|p| p.include_diff);
        let want_comments = self.plugins.list_plugins().iter().any(|p| p.include_comments);
        let want_headers = self.plugins.list_plugins().iter().any(|p| p.include_headers);

        for change in changed {
            let Some((owner, repo, number)) = parse_identifier(&change.identifier) else {
                continue;
            };
            let key = PrKey::new(owner.clone(), repo.clone(), number);

            let diff = if want_diff {
                self.remote.fetch_pull_request_diff(&owner, &repo, number).await.ok()
            } else {
                None
            };
            let comments_json = if want_comments {
                match self.remote.fetch_review_comments(&owner, &repo, number).await {
                    Ok(comments) => serde_json::to_string(&comments).ok(),
                    Err(err) => {
                        warn!("failed to fetch comments for plugin input on {owner}/{repo}#{number}: {err:#}");
                        None
                    }
                }
            } else {
                None
            };
            let headers_json = if want_headers {
                match self.remote.fetch_pull_request(&owner, &repo, number).await {
                    Ok(pr) => serde_json::to_string(&pr).ok(),
                    Err(err) => {
                        warn!("failed to fetch headers for plugin input on {owner}/{repo}#{number}: {err:#}");
                        None
                    }
                }
            } else {
                None
            };

            self.plugins
                .run_all(
                    &key,
                    PluginInputs {
                        diff: diff.as_deref(),
                        comments_json: comments_json.as_deref(),
                        headers_json: headers_json.as_deref(),
                    },
                )
                .await;
        }
    }

    /// Runs cycles forever, sleeping `sync_interval_secs` between them.
    /// Intended to be raced against a shutdown signal by the caller.
    pub async fn run_service(&self) -> ! {
        loop {
            self.run_cycle().await;
            tokio::time::sleep(Duration::from_secs(self.config.sync_interval_secs)).await;
        }
    }

    /// Runs exactly one cycle, for `--oneoff`.
    pub async fn run_oneoff(&self) -> CycleReport {
        self.run_cycle().await
    }
}
