use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::concurrent::{BatchTracker, ConcurrencyLimiter};
use crate::probe::container::{ContainerProber, ScanTarget};

/// One outer-loop key and the inner names it is paired with.
#[derive(Debug, Clone, Copy)]
pub struct Batch<'a> {
    pub index: usize,
    pub key: &'a str,
    inner: &'a [String],
    invert: bool,
}

impl<'a> Batch<'a> {
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn targets(self) -> impl Iterator<Item = ScanTarget> + 'a {
        let (key, invert) = (self.key, self.invert);
        self.inner.iter().map(move |other| make_target(key, other, invert))
    }
}

/// Outer-loop batches in dispatch order.
///
/// Direct scans iterate accounts in the outer loop; inverse scans iterate container names.
pub fn batches<'a>(accounts: &'a [String], containers: &'a [String], invert: bool) -> impl Iterator<Item = Batch<'a>> + 'a {
    let (outer, inner) = if invert { (containers, accounts) } else { (accounts, containers) };
    outer.iter().enumerate().map(move |(index, key)| Batch { index, key: key.as_str(), inner, invert })
}

/// Every (account, container) pair in dispatch order.
pub fn enumerate_targets<'a>(
    accounts: &'a [String],
    containers: &'a [String],
    invert: bool,
) -> impl Iterator<Item = ScanTarget> + 'a {
    batches(accounts, containers, invert).flat_map(|batch| batch.targets())
}

fn make_target(outer: &str, inner: &str, invert: bool) -> ScanTarget {
    if invert {
        ScanTarget::new(inner, outer)
    } else {
        ScanTarget::new(outer, inner)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    pub launched: usize,
    pub completed: usize,
    /// Probes still running when `run` returned. Non-zero only after cancellation.
    pub in_flight: usize,
    /// Outer-loop keys whose every pairing finished.
    pub batches_finished: usize,
    pub cancelled: bool,
}

pub struct Dispatcher {
    prober: Arc<ContainerProber>,
    limiter: ConcurrencyLimiter,
    batches_finished: Arc<AtomicUsize>,
    invert: bool,
}

impl Dispatcher {
    pub fn new(prober: ContainerProber, max_tasks: usize, invert: bool) -> Self {
        Self {
            prober: Arc::new(prober),
            limiter: ConcurrencyLimiter::new(max_tasks),
            batches_finished: Arc::new(AtomicUsize::new(0)),
            invert,
        }
    }

    /// Launch one probe per target and wait for all of them.
    ///
    /// On cancellation no further probes are launched and the in-flight ones are left
    /// running; the call returns without waiting for them.
    pub async fn run(&self, accounts: &[String], containers: &[String], cancel: &CancellationToken) -> DispatchReport {
        let mut cancelled = false;

        'outer: for batch in batches(accounts, containers, self.invert) {
            self.log_batch_start(&batch);
            if batch.is_empty() {
                finish_batch(self.invert, batch.index, batch.key, &self.batches_finished);
                continue;
            }

            let tracker = BatchTracker::new(batch.len());
            for target in batch.targets() {
                let prober = self.prober.clone();
                let tracker = tracker.clone();
                let finished = self.batches_finished.clone();
                let (invert, idx, key) = (self.invert, batch.index, batch.key.to_string());
                let launched = self
                    .limiter
                    .spawn(cancel, async move {
                        prober.scan(&target).await;
                        if tracker.complete_one() {
                            finish_batch(invert, idx, &key, &finished);
                        }
                    })
                    .await;
                if !launched {
                    cancelled = true;
                    break 'outer;
                }
            }
        }

        if !cancelled {
            tokio::select! {
                _ = self.limiter.wait() => {}
                _ = cancel.cancelled() => cancelled = true,
            }
        }

        let (launched, completed) = self.limiter.get_stats();
        DispatchReport {
            launched,
            completed,
            in_flight: self.limiter.in_flight(),
            batches_finished: self.batches_finished.load(Ordering::Acquire),
            cancelled,
        }
    }

    /// (launched, completed) probe counts so far.
    pub fn progress(&self) -> (usize, usize) {
        self.limiter.get_stats()
    }

    fn log_batch_start(&self, batch: &Batch<'_>) {
        if self.invert {
            tracing::info!("[~][{}] Searching {} accounts for containers named '{}'", batch.index, batch.len(), batch.key);
        } else {
            tracing::info!("[~][{}] Searching {} containers in account '{}'", batch.index, batch.len(), batch.key);
        }
    }
}

// Logged at warn so batch progress stays visible at the default verbosity.
fn finish_batch(invert: bool, idx: usize, key: &str, finished: &AtomicUsize) {
    finished.fetch_add(1, Ordering::AcqRel);
    if invert {
        tracing::warn!("[~][{}] Finished searching containers named '{}'", idx, key);
    } else {
        tracing::warn!("[~][{}] Finished searching account '{}'", idx, key);
    }
}
