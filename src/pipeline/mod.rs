//! Frame ingestion pipeline: gate, worker, dispatch and counters

pub mod dispatch;
pub mod gate;
pub mod stats;
pub mod worker;

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, instrument};

pub use dispatch::{Dispatch, Job, TokioDispatch, WorkerPool};
pub use gate::{BusyFlag, BusyGuard, IngestionGate};
pub use stats::PipelineStats;
pub use worker::{MeanReducer, Reducer, StatisticWorker};

use crate::capture::frame::FrameDescriptor;
use crate::error::PipelineError;
use crate::report::ReportSink;
use stats::Counters;

/// Source-facing handle: one gate feeding one statistic worker
pub struct Pipeline {
    gate: IngestionGate,
    counters: Arc<Counters>,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// See [`IngestionGate::deliver`].
    pub fn deliver(&self, frame: FrameDescriptor<'_>) -> Result<(), PipelineError> {
        self.gate.deliver(frame)
    }

    pub fn stats(&self) -> PipelineStats {
        self.counters.snapshot()
    }

    pub fn is_busy(&self) -> bool {
        self.gate.is_busy()
    }

    /// Resolves once no worker is running.
    pub async fn idle(&self) {
        self.gate.idle().await
    }

    /// Async form of [`Pipeline::wait_idle`]. Returns `false` on timeout.
    pub async fn idle_within(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.idle()).await.is_ok()
    }

    /// Blocks the calling thread until no worker is running. Returns
    /// `false` on timeout. Use [`Pipeline::idle`] from async code.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.is_busy() {
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        true
    }
}

/// Collects the pipeline's collaborators. `sink` and `dispatch` are required.
#[derive(Default)]
pub struct PipelineBuilder {
    sink: Option<Arc<dyn ReportSink>>,
    dispatch: Option<Arc<dyn Dispatch>>,
    reducer: Option<Arc<dyn Reducer>>,
}

impl PipelineBuilder {
    pub fn sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn dispatch(mut self, dispatch: Arc<dyn Dispatch>) -> Self {
        self.dispatch = Some(dispatch);
        self
    }

    /// Defaults to [`MeanReducer`].
    pub fn reducer(mut self, reducer: Arc<dyn Reducer>) -> Self {
        self.reducer = Some(reducer);
        self
    }

    #[instrument(skip(self))]
    pub fn build(self) -> Result<Pipeline, PipelineError> {
        let sink = self
            .sink
            .ok_or(PipelineError::MissingCollaborator("report sink"))?;
        let dispatch = self
            .dispatch
            .ok_or(PipelineError::MissingCollaborator("dispatch"))?;
        let reducer = self.reducer.unwrap_or_else(|| Arc::new(MeanReducer));

        let counters = Arc::new(Counters::default());
        let worker = Arc::new(StatisticWorker::new(reducer, sink, counters.clone()));
        let gate = IngestionGate::new(worker, dispatch, counters.clone());

        info!("Pipeline ready");
        Ok(Pipeline { gate, counters })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::MemorySink;

    #[test]
    fn build_requires_sink_and_dispatch() {
        let err = Pipeline::builder()
            .dispatch(Arc::new(TokioDispatch::current()))
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, PipelineError::MissingCollaborator("report sink")));

        let err = Pipeline::builder()
            .sink(Arc::new(MemorySink::new()))
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, PipelineError::MissingCollaborator("dispatch")));
    }
}
