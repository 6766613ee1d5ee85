//! The Listener: consumes one cycle's buffered `FileChange` events,
//! dedups them per section/identifier, and forwards survivors to the
//! Applier over a channel.

use crate::dedup::dedup;
use crate::wait_group::WaitGroup;
use log::info;
use rv_workflow::FileChange;
use tokio::sync::mpsc;

/// Runs one cycle's Listener phase: dedups `events`, decrements
/// `wait_group` once per dropped event, and sends survivors to
/// `applier_tx`. Returns the number of events forwarded.
pub async fn listen(
    events: Vec<FileChange>,
    wait_group: &WaitGroup,
    applier_tx: &mpsc::Sender<FileChange>,
) -> usize {
    let outcome = dedup(events);
    for _ in 0..outcome.dropped {
        wait_group.done();
    }

    let forwarded = outcome.survivors.len();
    for event in outcome.survivors {
        if applier_tx.send(event).await.is_err() {
            info!("applier channel closed while forwarding surviving events");
            break;
        }
    }
    forwarded
}
