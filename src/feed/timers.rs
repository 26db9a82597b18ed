//! Named, cancellable scheduled tasks for one feed.
//!
//! Every timer a feed owns (poll, health monitor, history refresh, retry
//! delay, refetch) lives here, so teardown is a single `cancel_all()`.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    Poll,
    HealthMonitor,
    HistoryRefresh,
    RetryDelay,
    Refetch,
}

/// Timer registry. Clones share the same set of tasks.
#[derive(Clone, Default)]
pub struct TimerSet {
    tasks: Arc<Mutex<HashMap<TimerKind, JoinHandle<()>>>>,
}

impl TimerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `task` under `kind`, aborting whatever ran there before.
    ///
    /// Must be called within a Tokio runtime.
    pub fn spawn<F>(&self, kind: TimerKind, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(task);
        if let Some(previous) = self.tasks.lock().insert(kind, handle) {
            previous.abort();
        }
    }

    /// Spawn `task` only when nothing is running under `kind`.
    /// Returns whether it was spawned.
    pub fn spawn_if_absent<F>(&self, kind: TimerKind, task: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.tasks.lock();
        if tasks.get(&kind).is_some_and(|h| !h.is_finished()) {
            return false;
        }
        tasks.insert(kind, tokio::spawn(task));
        true
    }

    /// Abort the task under `kind`. Returns whether one was still running.
    pub fn cancel(&self, kind: TimerKind) -> bool {
        match self.tasks.lock().remove(&kind) {
            Some(handle) => {
                let running = !handle.is_finished();
                handle.abort();
                running
            }
            None => false,
        }
    }

    pub fn cancel_all(&self) {
        for (_, handle) in self.tasks.lock().drain() {
            handle.abort();
        }
    }

    pub fn is_active(&self, kind: TimerKind) -> bool {
        self.tasks
            .lock()
            .get(&kind)
            .is_some_and(|h| !h.is_finished())
    }

    /// Number of timers that have not finished.
    pub fn pending(&self) -> usize {
        self.tasks
            .lock()
            .values()
            .filter(|h| !h.is_finished())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_spawn_replaces_previous() {
        let timers = TimerSet::new();
        let fired = Arc::new(AtomicU32::new(0));

        let f = fired.clone();
        timers.spawn(TimerKind::RetryDelay, async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            f.fetch_add(1, Ordering::SeqCst);
        });
        let f = fired.clone();
        timers.spawn(TimerKind::RetryDelay, async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            f.fetch_add(10, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 10);
        assert_eq!(timers.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawn_if_absent_keeps_running_task() {
        let timers = TimerSet::new();
        assert!(timers.spawn_if_absent(TimerKind::Poll, std::future::pending()));
        assert!(!timers.spawn_if_absent(TimerKind::Poll, std::future::pending()));
        assert!(timers.is_active(TimerKind::Poll));
        assert_eq!(timers.pending(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_and_cancel_all() {
        let timers = TimerSet::new();
        timers.spawn(TimerKind::Poll, std::future::pending());
        timers.spawn(TimerKind::HealthMonitor, std::future::pending());
        timers.spawn(TimerKind::HistoryRefresh, std::future::pending());

        assert!(timers.cancel(TimerKind::Poll));
        assert!(!timers.cancel(TimerKind::Poll));
        assert!(!timers.is_active(TimerKind::Poll));
        assert_eq!(timers.pending(), 2);

        timers.cancel_all();
        assert_eq!(timers.pending(), 0);
        timers.cancel_all();
    }
}
