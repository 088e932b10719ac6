//! Admission and completion counters shared by the gate and the worker

use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam::utils::CachePadded;

#[derive(Default)]
pub(crate) struct Counters {
    delivered: CachePadded<AtomicU64>,
    admitted: CachePadded<AtomicU64>,
    dropped_busy: CachePadded<AtomicU64>,
    malformed: CachePadded<AtomicU64>,
    dispatch_failures: CachePadded<AtomicU64>,
    completed: CachePadded<AtomicU64>,
    compute_failures: CachePadded<AtomicU64>,
}

/// Point-in-time view of the pipeline counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Every call to `deliver`
    pub delivered: u64,
    /// Frames handed to a worker
    pub admitted: u64,
    /// Frames discarded because a worker was running
    pub dropped_busy: u64,
    pub malformed: u64,
    pub dispatch_failures: u64,
    /// Frames whose mean reached the sink
    pub completed: u64,
    pub compute_failures: u64,
}

impl PipelineStats {
    /// Fraction of well-formed deliveries lost to backpressure.
    pub fn drop_ratio(&self) -> f64 {
        let offered = self.delivered.saturating_sub(self.malformed);
        if offered == 0 {
            0.0
        } else {
            self.dropped_busy as f64 / offered as f64
        }
    }
}

macro_rules! bump {
    ($name:ident, $metric:literal) => {
        pub(crate) fn $name(&self) {
            self.$name.fetch_add(1, Ordering::Relaxed);
            metrics::counter!($metric).increment(1);
        }
    };
}

impl Counters {
    bump!(delivered, "meanstream_frames_delivered_total");
    bump!(admitted, "meanstream_frames_admitted_total");
    bump!(dropped_busy, "meanstream_frames_dropped_total");
    bump!(malformed, "meanstream_frames_malformed_total");
    bump!(dispatch_failures, "meanstream_dispatch_failures_total");
    bump!(completed, "meanstream_frames_completed_total");
    bump!(compute_failures, "meanstream_compute_failures_total");

    pub(crate) fn snapshot(&self) -> PipelineStats {
        PipelineStats {
            delivered: self.delivered.load(Ordering::Relaxed),
            admitted: self.admitted.load(Ordering::Relaxed),
            dropped_busy: self.dropped_busy.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            dispatch_failures: self.dispatch_failures.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            compute_failures: self.compute_failures.load(Ordering::Relaxed),
        }
    }
}
