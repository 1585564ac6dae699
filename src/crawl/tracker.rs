// src/crawl/tracker.rs
// =============================================================================
// Knows when every crawl task has finished.
//
// The crawl tree grows while it runs, so nobody can know up front how many
// tasks there will be. Instead we keep a count of outstanding tasks:
//
//   register() -> count + 1, returns a TaskGuard
//   TaskGuard dropped -> count - 1, wakes waiters when it hits zero
//
// A parent registers each child *before* spawning it, so the count can
// never touch zero while a child is still being scheduled.
// =============================================================================

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct Inner {
    outstanding: AtomicUsize,
    idle: Notify,
}

#[derive(Debug, Clone, Default)]
pub struct CompletionTracker {
    inner: Arc<Inner>,
}

/// One unit of outstanding work. Dropping it marks the work as done.
#[derive(Debug)]
#[must_use = "dropping the guard immediately marks the task as finished"]
pub struct TaskGuard {
    inner: Arc<Inner>,
}

impl CompletionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self) -> TaskGuard {
        self.inner.outstanding.fetch_add(1, Ordering::AcqRel);
        TaskGuard {
            inner: Arc::clone(&self.inner),
        }
    }

    pub fn outstanding(&self) -> usize {
        self.inner.outstanding.load(Ordering::Acquire)
    }

    /// Waits until no registered work remains.
    ///
    /// Returns immediately if nothing is outstanding, including when nothing
    /// was ever registered.
    pub async fn wait(&self) {
        loop {
            let idle = self.inner.idle.notified();
            tokio::pin!(idle);
            // Subscribe before checking the count so a wake-up that lands
            // between the check and the await is not lost.
            idle.as_mut().enable();

            if self.outstanding() == 0 {
                return;
            }
            idle.await;
        }
    }
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        if self.inner.outstanding.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.inner.idle.notify_waiters();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_wait_returns_when_nothing_registered() {
        let tracker = CompletionTracker::new();
        tracker.wait().await;
        assert_eq!(tracker.outstanding(), 0);
    }

    #[test]
    fn test_guards_count_outstanding_work() {
        let tracker = CompletionTracker::new();
        let a = tracker.register();
        let b = tracker.register();
        assert_eq!(tracker.outstanding(), 2);

        drop(a);
        assert_eq!(tracker.outstanding(), 1);
        drop(b);
        assert_eq!(tracker.outstanding(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_wait_sees_work_registered_by_running_tasks() {
        let tracker = CompletionTracker::new();
        let root = tracker.register();

        let spawner = tracker.clone();
        tokio::spawn(async move {
            let _root = root;
            for _ in 0..10 {
                let child = spawner.register();
                tokio::spawn(async move {
                    let _child = child;
                    tokio::time::sleep(Duration::from_millis(10)).await;
                });
            }
        });

        tokio::time::timeout(Duration::from_secs(5), tracker.wait())
            .await
            .expect("tracker never reached zero");
        assert_eq!(tracker.outstanding(), 0);
    }
}
