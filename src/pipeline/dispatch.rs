//! Hand-off of statistic jobs to a background pool

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use arc_swap::ArcSwapOption;
use flume::{Sender, TrySendError};
use tokio::runtime::Handle;
use tracing::{debug, info, instrument, warn};

use crate::error::DispatchError;
use crate::PipelineConfig;

/// A unit of background work
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Schedules jobs off the calling thread.
///
/// `dispatch` must not block on running jobs. An implementation that
/// returns an error must drop the job rather than keep it.
pub trait Dispatch: Send + Sync {
    fn dispatch(&self, job: Job) -> Result<(), DispatchError>;
}

/// Fixed set of OS threads fed by a bounded queue
pub struct WorkerPool {
    tx: ArcSwapOption<Sender<Job>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    #[instrument(skip(config))]
    pub fn new(config: &PipelineConfig) -> Result<Self, DispatchError> {
        Self::with_threads(config.worker_threads, config.queue_capacity)
    }

    pub fn with_threads(threads: usize, queue_capacity: usize) -> Result<Self, DispatchError> {
        let (tx, rx) = flume::bounded::<Job>(queue_capacity.max(1));

        let mut handles = Vec::with_capacity(threads);
        for i in 0..threads.max(1) {
            let rx = rx.clone();
            let handle = std::thread::Builder::new()
                .name(format!("meanstream-worker-{}", i))
                .spawn(move || {
                    while let Ok(job) = rx.recv() {
                        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                            warn!("Worker job panicked");
                        }
                    }
                    debug!("Worker thread exiting");
                })
                .map_err(|e| DispatchError::Other(format!("failed to spawn worker: {}", e)))?;
            handles.push(handle);
        }

        info!("Worker pool started with {} threads", handles.len());

        Ok(Self {
            tx: ArcSwapOption::from_pointee(tx),
            handles: Mutex::new(handles),
        })
    }

    /// Stops accepting jobs and waits for queued and running jobs to finish.
    pub fn shutdown(&self) {
        if self.tx.swap(None).is_none() {
            return;
        }

        let handles = std::mem::take(&mut *self.handles.lock().unwrap_or_else(|e| e.into_inner()));
        for handle in handles {
            if handle.join().is_err() {
                warn!("Worker thread terminated abnormally");
            }
        }
        info!("Worker pool stopped");
    }
}

impl Dispatch for WorkerPool {
    fn dispatch(&self, job: Job) -> Result<(), DispatchError> {
        let guard = self.tx.load();
        let tx = (*guard).as_ref().ok_or(DispatchError::Disconnected)?;
        tx.try_send(job).map_err(|e| match e {
            TrySendError::Full(_) => DispatchError::QueueFull,
            TrySendError::Disconnected(_) => DispatchError::Disconnected,
        })
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Runs jobs on a tokio runtime's blocking pool
#[derive(Clone)]
pub struct TokioDispatch {
    handle: Option<Handle>,
}

impl TokioDispatch {
    pub fn new(handle: Handle) -> Self {
        Self {
            handle: Some(handle),
        }
    }

    /// Binds to the ambient runtime, if any.
    pub fn current() -> Self {
        Self {
            handle: Handle::try_current().ok(),
        }
    }
}

impl Dispatch for TokioDispatch {
    fn dispatch(&self, job: Job) -> Result<(), DispatchError> {
        let handle = self
            .handle
            .as_ref()
            .ok_or(DispatchError::RuntimeUnavailable)?;

        let ran = Arc::new(AtomicBool::new(false));
        let started = Arc::clone(&ran);
        let task = handle.spawn_blocking(move || {
            started.store(true, Ordering::Release);
            job()
        });

        // A runtime that is shutting down cancels the task on the spot and
        // drops the job unrun
        if task.is_finished() && !ran.load(Ordering::Acquire) {
            return Err(DispatchError::RuntimeUnavailable);
        }
        // Dropping the JoinHandle detaches the task
        drop(task);
        Ok(())
    }
}

impl<D: Dispatch + ?Sized> Dispatch for Arc<D> {
    fn dispatch(&self, job: Job) -> Result<(), DispatchError> {
        (**self).dispatch(job)
    }
}
