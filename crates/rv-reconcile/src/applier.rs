//! The Applier: drains surviving `FileChange` events from a single
//! channel, serially mutating the Store (and, for `Addition`/`Update`/
//! `Delete`, the filesystem worktree registry via `WorktreeManager`).
//! Runs until the channel closes, then logs a summary.

use crate::wait_group::WaitGroup;
use log::{error, info};
use rv_store::{PrKey, Store};
use rv_worktree::WorktreeManager;
use rv_workflow::item_serializer::parse_identifier;
use rv_workflow::{FileChange, FileChangeKind};
use tokio::sync::mpsc;

pub async fn apply(
    mut rx: mpsc::Receiver<FileChange>,
    store: &Store,
    worktrees: &WorktreeManager,
    wait_group: &WaitGroup,
) {
    let mut applied = 0u64;
    let mut errored = 0u64;

    while let Some(change) = rx.recv().await {
        match apply_one(&change, store, worktrees).await {
            Ok(()) => applied += 1,
            Err(err) => {
                errored += 1;
                error!(
                    "store error applying change for '{}' in section '{}': {err:#}",
                    change.identifier, change.section
                );
            }
        }
        wait_group.done();
    }

    info!("applier drained: {applied} applied, {errored} errored");
}

async fn apply_one(change: &FileChange, store: &Store, worktrees: &WorktreeManager) -> anyhow::Result<()> {
    let section_id = store.ensure_section(&change.section).await?;

    match &change.kind {
        FileChangeKind::Addition(item) | FileChangeKind::Update(item) => {
            store.upsert_item(section_id, item).await?;
            if let (Some((owner, repo, number)), Some(branch)) =
                (parse_identifier(&change.identifier), change.branch.as_deref())
            {
                worktrees.provision(&PrKey::new(owner, repo, number), branch).await;
            }
        }
        FileChangeKind::Archive => {
            store.archive_item(section_id, &change.identifier).await?;
        }
        FileChangeKind::Delete => {
            store.delete_item(section_id, &change.identifier).await?;
            if let Some((owner, repo, number)) = parse_identifier(&change.identifier) {
                worktrees.remove(&PrKey::new(owner, repo, number)).await;
            }
        }
        FileChangeKind::NoChange => {}
    }

    Ok(())
}
