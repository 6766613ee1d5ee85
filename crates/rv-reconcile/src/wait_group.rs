//! A minimal async wait-group: start with a known count, `done()` each
//! unit of work, `wait()` blocks until the count reaches zero.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Clone)]
pub struct WaitGroup {
    remaining: Arc<AtomicU64>,
    notify: Arc<Notify>,
}

impl WaitGroup {
    pub fn new(count: u64) -> Self {
        let wg = Self {
            remaining: Arc::new(AtomicU64::new(count)),
            notify: Arc::new(Notify::new()),
        };
        if count == 0 {
            wg.notify.notify_waiters();
        }
        wg
    }

    /// Mark one unit of work done. Panics-free on over-calling: saturates at zero.
    pub fn done(&self) {
        let previous = self.remaining.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
            Some(n.saturating_sub(1))
        });
        if let Ok(1) | Ok(0) = previous {
            self.notify.notify_waiters();
        }
    }

    pub fn remaining(&self) -> u64 {
        self.remaining.load(Ordering::SeqCst)
    }

    /// Waits until the count reaches zero, or `timeout` elapses
    /// (returns `false` on timeout, matching the per-cycle bounded wait).
    pub async fn wait(&self, timeout: std::time::Duration) -> bool {
        let wait_for_notify = async {
            loop {
                // Register for the next notification before checking the
                // count: if `done()` decrements to zero and calls
                // `notify_waiters()` between the check and the `.await`
                // below, this already-registered future still observes it.
                // Checking first and registering after would risk missing
                // that wakeup entirely.
                let notified = self.notify.notified();
                if self.remaining() == 0 {
                    return;
                }
                notified.await;
            }
        };
        tokio::time::timeout(timeout, wait_for_notify).await.is_ok()
    }
}
