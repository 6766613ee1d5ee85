//! `WorktreeManager`: the exclusive owner of the Store's `worktrees`
//! table. Provisions a checkout on `Addition|Update`, removes it on
//! `Delete`. Every failure is logged and swallowed here — the caller
//! (the Applier) never sees a worktree error.

use crate::paths::{base_repo_path, worktree_path};
use log::{error, info, warn};
use rv_store::{PrKey, Store};
use std::path::PathBuf;
use tokio::process::Command;

pub struct WorktreeManager {
    repo_location: PathBuf,
    store: Store,
}

impl WorktreeManager {
    pub fn new(repo_location: impl Into<PathBuf>, store: Store) -> Self {
        Self {
            repo_location: repo_location.into(),
            store,
        }
    }

    /// Ensures a worktree exists for `key` checked out to `branch`. A
    /// no-op if a record is already present (idempotent) or if the
    /// base repo isn't cloned locally.
    pub async fn provision(&self, key: &PrKey, branch: &str) {
        match self.store.get_worktree(key).await {
            Ok(Some(_)) => return,
            Ok(None) => {}
            Err(err) => {
                error!("failed to read worktree record for {}/{}#{}: {err}", key.owner, key.repo, key.number);
                return;
            }
        }

        let base = base_repo_path(&self.repo_location, &key.repo);
        if !base.join(".git").exists() {
            warn!(
                "no local clone of {} at {:?}, skipping worktree provisioning for #{}",
                key.repo, base, key.number
            );
            return;
        }

        let target = worktree_path(&self.repo_location, &key.repo, key.number, branch);
        if target.exists() {
            warn!("worktree path {:?} already exists without a store record, skipping", target);
            return;
        }

        if let Err(err) = run_git(&base, &["fetch", "origin", branch]).await {
            warn!("failed to fetch {branch} for {}: {err}", key.repo);
        }

        let target_str = target.to_string_lossy().to_string();
        match run_git(&base, &["worktree", "add", &target_str, branch]).await {
            Ok(()) => {
                info!("provisioned worktree for {}/{}#{} at {:?}", key.owner, key.repo, key.number, target);
                if let Err(err) = self.store.put_worktree(key, &target_str, branch).await {
                    error!("failed to record worktree for {}/{}#{}: {err}", key.owner, key.repo, key.number);
                }
            }
            Err(err) => error!("git worktree add failed for {}/{}#{}: {err}", key.owner, key.repo, key.number),
        }
    }

    /// Removes a previously-provisioned worktree, if any. Failures are
    /// logged; the Store record is dropped regardless so a later cycle
    /// doesn't see a stale entry.
    pub async fn remove(&self, key: &PrKey) {
        let record = match self.store.get_worktree(key).await {
            Ok(Some(record)) => record,
            Ok(None) => return,
            Err(err) => {
                error!("failed to read worktree record for {}/{}#{}: {err}", key.owner, key.repo, key.number);
                return;
            }
        };

        let base = base_repo_path(&self.repo_location, &key.repo);
        if let Err(err) = run_git(&base, &["worktree", "remove", "--force", &record.path]).await {
            warn!("failed to remove worktree at {}: {err}", record.path);
        }

        if let Err(err) = self.store.delete_worktree(key).await {
            error!("failed to delete worktree record for {}/{}#{}: {err}", key.owner, key.repo, key.number);
        }
    }
}

async fn run_git(cwd: &std::path::Path, args: &[&str]) -> anyhow::Result<()> {
    let output = Command::new("git").current_dir(cwd).args(args).output().await?;
    if !output.status.success() {
        anyhow::bail!(
            "git {} exited with {}: {}",
            args.join(" "),
            output.status,
            String::from_utf8_lossy(&output.stderr)
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn provision_skips_when_base_repo_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open_in_memory().unwrap();
        let manager = WorktreeManager::new(dir.path(), store.clone());
        let key = PrKey::new("acme", "widgets", 1);

        manager.provision(&key, "feature").await;

        assert!(store.get_worktree(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn provision_is_a_no_op_when_record_already_exists() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open_in_memory().unwrap();
        let key = PrKey::new("acme", "widgets", 1);
        store.put_worktree(&key, "/already/here", "feature").await.unwrap();

        let manager = WorktreeManager::new(dir.path(), store.clone());
        manager.provision(&key, "feature").await;

        let record = store.get_worktree(&key).await.unwrap().unwrap();
        assert_eq!(record.path, "/already/here");
    }

    #[tokio::test]
    async fn remove_is_a_no_op_without_a_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open_in_memory().unwrap();
        let manager = WorktreeManager::new(dir.path(), store.clone());
        let key = PrKey::new("acme", "widgets", 1);

        manager.remove(&key).await;
    }
}
