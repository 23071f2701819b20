use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Notify;

/// Counts work items between enqueue and recorded outcome.
///
/// Items are armed by the producer before they become visible to a worker
/// and released once their outcome is recorded. `wait` must only be awaited
/// after the last `arm`, which makes the target count fixed before anyone
/// observes it.
#[derive(Debug, Default)]
pub(crate) struct CompletionBarrier {
    pending: AtomicU64,
    notify: Notify,
}

impl CompletionBarrier {
    pub(crate) fn arm(&self) {
        self.pending.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn release(&self) {
        let previous = self
            .pending
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |value| {
                value.checked_sub(1)
            });
        if previous == Ok(1) {
            self.notify.notify_waiters();
        }
    }

    #[must_use]
    pub(crate) fn pending(&self) -> u64 {
        self.pending.load(Ordering::Acquire)
    }

    pub(crate) async fn wait(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking so a release between the load and the
            // await cannot be missed.
            notified.as_mut().enable();
            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }
}
