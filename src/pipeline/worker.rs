//! Statistic worker: reduces an owned frame to its mean and reports it

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, trace};

use super::gate::BusyGuard;
use super::stats::Counters;
use crate::capture::frame::{OwnedFrame, SampleFormat};
use crate::error::ReduceError;
use crate::report::ReportSink;

/// Reduces a frame to one scalar
pub trait Reducer: Send + Sync {
    fn reduce(&self, frame: &OwnedFrame) -> Result<f64, ReduceError>;
}

/// Arithmetic mean of every sample in the frame
#[derive(Debug, Default, Clone, Copy)]
pub struct MeanReducer;

impl Reducer for MeanReducer {
    fn reduce(&self, frame: &OwnedFrame) -> Result<f64, ReduceError> {
        mean(&frame.data, frame.sample_count(), frame.meta.format)
    }
}

/// Mean of the first `samples` samples of `data`.
///
/// The sum is kept in a `u64`, which holds `u32::MAX` samples at 16 bits.
pub fn mean(data: &[u8], samples: usize, format: SampleFormat) -> Result<f64, ReduceError> {
    if samples == 0 {
        return Err(ReduceError::Empty);
    }
    let expected = samples
        .checked_mul(format.bytes_per_sample())
        .ok_or(ReduceError::ShortBuffer {
            expected: usize::MAX,
            actual: data.len(),
        })?;
    let payload = data.get(..expected).ok_or(ReduceError::ShortBuffer {
        expected,
        actual: data.len(),
    })?;

    let sum: u64 = match format {
        SampleFormat::Gray8 => payload.iter().map(|&s| s as u64).sum(),
        SampleFormat::Gray16 => payload
            .chunks_exact(2)
            .map(|s| u16::from_le_bytes([s[0], s[1]]) as u64)
            .sum(),
    };

    Ok(sum as f64 / samples as f64)
}

/// Runs one reduction per admitted frame and feeds the sink
pub struct StatisticWorker {
    reducer: Arc<dyn Reducer>,
    sink: Arc<dyn ReportSink>,
    counters: Arc<Counters>,
}

impl StatisticWorker {
    pub(crate) fn new(
        reducer: Arc<dyn Reducer>,
        sink: Arc<dyn ReportSink>,
        counters: Arc<Counters>,
    ) -> Self {
        Self {
            reducer,
            sink,
            counters,
        }
    }

    /// Consumes the frame. The busy flag is released when `busy` drops,
    /// after the report, on every path.
    pub(crate) fn run(&self, frame: OwnedFrame, busy: BusyGuard) {
        let sequence = frame.meta.sequence;

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.reducer.reduce(&frame)))
            .unwrap_or_else(|payload| Err(ReduceError::Panicked(panic_message(payload))))
            .and_then(|value| {
                if value.is_finite() {
                    Ok(value)
                } else {
                    Err(ReduceError::NonFinite(value))
                }
            });
        drop(frame);

        match outcome {
            Ok(value) => {
                let reported = panic::catch_unwind(AssertUnwindSafe(|| self.sink.report(value)));
                if reported.is_ok() {
                    self.counters.completed();
                    trace!(sequence, value, "Frame reported");
                } else {
                    self.counters.compute_failures();
                    debug!(sequence, "Report sink panicked");
                }
            }
            Err(e) => {
                self.counters.compute_failures();
                debug!(sequence, "Frame lost: {}", e);
            }
        }

        drop(busy);
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
