use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Bounded task pool: a permit pool caps in-flight tasks, a tracker waits for all of them.
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    tracker: TaskTracker,
    launched: Arc<AtomicUsize>,
    completed: Arc<AtomicUsize>,
}

impl ConcurrencyLimiter {
    pub fn new(max_tasks: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_tasks.max(1))),
            tracker: TaskTracker::new(),
            launched: Arc::new(AtomicUsize::new(0)),
            completed: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Wait for a free permit, then spawn `fut`. The permit is released when the task ends,
    /// whatever way it ends.
    ///
    /// Returns `false` without spawning if `cancel` fires while waiting.
    pub async fn spawn<F>(&self, cancel: &CancellationToken, fut: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => return false,
            permit = self.semaphore.clone().acquire_owned() => match permit {
                Ok(p) => p,
                Err(_) => return false,
            },
        };
        self.launched.fetch_add(1, Ordering::Relaxed);
        let completed = self.completed.clone();
        self.tracker.spawn(async move {
            fut.await;
            completed.fetch_add(1, Ordering::Relaxed);
            drop(permit);
        });
        true
    }

    /// Completion barrier: resolves once every spawned task has finished.
    pub async fn wait(&self) {
        self.tracker.close();
        self.tracker.wait().await;
    }

    /// Spawned tasks that have not finished yet.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    pub fn get_stats(&self) -> (usize, usize) {
        (self.launched.load(Ordering::Relaxed), self.completed.load(Ordering::Relaxed))
    }
}

/// Counts down the inner-loop completions of one outer-loop batch.
#[derive(Clone)]
pub struct BatchTracker {
    remaining: Arc<AtomicUsize>,
}

impl BatchTracker {
    pub fn new(expected: usize) -> Self {
        Self { remaining: Arc::new(AtomicUsize::new(expected)) }
    }

    /// Record one completion. Returns `true` for exactly the call that finishes the batch.
    pub fn complete_one(&self) -> bool {
        self.remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .map(|prev| prev == 1)
            .unwrap_or(false)
    }

    #[cfg(test)]
    fn remaining(&self) -> usize {
        self.remaining.load(Ordering::Acquire)
    }
}
