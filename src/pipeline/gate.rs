//! Ingestion gate: per-frame admission with a single-worker busy flag

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;
use tracing::{trace, warn};

use super::dispatch::{Dispatch, Job};
use super::stats::Counters;
use super::worker::StatisticWorker;
use crate::capture::frame::{FrameDescriptor, OwnedFrame};
use crate::error::PipelineError;

/// Set while a statistic worker owns the pipeline
#[derive(Debug, Default)]
pub struct BusyFlag {
    busy: AtomicBool,
    idle: Notify,
}

impl BusyFlag {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn is_set(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Resolves once the flag is clear.
    pub async fn idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            // Register before checking so a release in between is not missed
            notified.as_mut().enable();
            if !self.is_set() {
                return;
            }
            notified.await;
        }
    }
}

/// Ownership of the busy flag. Clears it on drop.
///
/// Only obtainable through a successful test-and-set, so at most one
/// guard exists per flag at any time.
pub struct BusyGuard {
    flag: Arc<BusyFlag>,
}

impl BusyGuard {
    pub fn try_acquire(flag: &Arc<BusyFlag>) -> Option<Self> {
        flag.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self {
                flag: Arc::clone(flag),
            })
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.flag.busy.store(false, Ordering::Release);
        self.flag.idle.notify_waiters();
    }
}

/// Boundary invoked once per incoming frame
pub struct IngestionGate {
    busy: Arc<BusyFlag>,
    sequence: AtomicU64,
    worker: Arc<StatisticWorker>,
    dispatch: Arc<dyn Dispatch>,
    counters: Arc<Counters>,
}

impl IngestionGate {
    pub(crate) fn new(
        worker: Arc<StatisticWorker>,
        dispatch: Arc<dyn Dispatch>,
        counters: Arc<Counters>,
    ) -> Self {
        Self {
            busy: BusyFlag::new(),
            sequence: AtomicU64::new(0),
            worker,
            dispatch,
            counters,
        }
    }

    /// Admits or drops one frame without waiting on the worker.
    ///
    /// The payload is copied before this returns, so the caller may reuse
    /// its buffer immediately. Malformed and busy-dropped frames return
    /// `Ok`. An error means the worker could not be scheduled; the busy
    /// flag has already been released by then.
    ///
    /// `admitted` is counted before the hand-off, so `completed` never
    /// runs ahead of it. `dispatch_failures` is a subset of `admitted`.
    pub fn deliver(&self, frame: FrameDescriptor<'_>) -> Result<(), PipelineError> {
        self.counters.delivered();

        let Some(payload) = frame.payload() else {
            self.counters.malformed();
            trace!(
                width = frame.width,
                height = frame.height,
                "Ignoring malformed frame"
            );
            return Ok(());
        };

        let Some(busy) = BusyGuard::try_acquire(&self.busy) else {
            self.counters.dropped_busy();
            trace!("Worker busy, dropping frame");
            return Ok(());
        };

        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let owned = OwnedFrame::from_payload(payload, &frame, sequence);

        let worker = Arc::clone(&self.worker);
        let job: Job = Box::new(move || worker.run(owned, busy));

        self.counters.admitted();

        // A rejected job is dropped inside `dispatch`, taking the guard with it
        if let Err(e) = self.dispatch.dispatch(job) {
            self.counters.dispatch_failures();
            warn!("Failed to schedule frame {}: {}", sequence, e);
            return Err(e.into());
        }

        Ok(())
    }

    pub fn is_busy(&self) -> bool {
        self.busy.is_set()
    }

    /// Resolves once no worker is running.
    pub async fn idle(&self) {
        self.busy.idle().await
    }
}
