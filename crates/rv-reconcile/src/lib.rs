//! Per-cycle deduplication and serialized application of the
//! `FileChange` events workflows emit: the ReconciliationPipeline.

pub mod applier;
pub mod dedup;
pub mod listener;
pub mod wait_group;

pub use applier::apply;
pub use dedup::{dedup, DedupOutcome};
pub use listener::listen;
pub use wait_group::WaitGroup;

use log::error;
use rv_store::Store;
use rv_worktree::WorktreeManager;
use rv_workflow::FileChange;
use std::time::Duration;
use tokio::sync::mpsc;

/// Runs one cycle's Listener and Applier to completion (or until
/// `timeout` elapses). Returns once every effective change has been
/// applied or the bounded wait expires.
///
/// Listener and Applier run concurrently on the caller's task (joined,
/// not spawned) — the Listener forwards survivors over the channel as
/// it dedups, and the Applier drains and applies them as they arrive.
pub async fn run_cycle(
    events: Vec<FileChange>,
    store: &Store,
    worktrees: &WorktreeManager,
    timeout: Duration,
) {
    let wait_group = WaitGroup::new(events.len() as u64);
    let (tx, rx) = mpsc::channel(256);

    let listen_fut = async {
        listen(events, &wait_group, &tx).await;
        drop(tx);
    };
    let apply_fut = apply(rx, store, worktrees, &wait_group);
    let cycle = async {
        tokio::join!(listen_fut, apply_fut);
    };

    if tokio::time::timeout(timeout, cycle).await.is_err() {
        error!(
            "reconciliation cycle timed out after {:?} with {} change(s) still outstanding",
            timeout,
            wait_group.remaining()
        );
    }
}
