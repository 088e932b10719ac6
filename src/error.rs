//! Error types for the pipeline and its collaborators

use thiserror::Error;

/// Errors surfaced by the pipeline to its callers.
///
/// Busy drops and malformed frames are not errors; they are counted
/// in [`crate::PipelineStats`] instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to dispatch statistic worker: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("pipeline is missing required collaborator: {0}")]
    MissingCollaborator(&'static str),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("frame source task failed: {0}")]
    SourceTask(String),
}

impl From<config::ConfigError> for PipelineError {
    fn from(err: config::ConfigError) -> Self {
        PipelineError::Config(err.to_string())
    }
}

/// Reasons a job could not be handed to a worker pool.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("worker queue is full")]
    QueueFull,

    #[error("worker pool has shut down")]
    Disconnected,

    #[error("no async runtime available")]
    RuntimeUnavailable,

    #[error("{0}")]
    Other(String),
}

/// Failure inside a reduction step. Contained by the worker.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ReduceError {
    #[error("frame buffer holds {actual} bytes, expected {expected}")]
    ShortBuffer { expected: usize, actual: usize },

    #[error("frame has no samples")]
    Empty,

    #[error("reduction produced a non-finite value: {0}")]
    NonFinite(f64),

    #[error("reducer panicked: {0}")]
    Panicked(String),

    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("registry is not initialized")]
    NotInitialized,

    #[error("key must not be empty")]
    EmptyKey,

    #[error("key already registered: {0}")]
    DuplicateKey(String),

    #[error("key not found: {0}")]
    NotFound(String),

    #[error("type mismatch for key {key}: stored {stored}")]
    TypeMismatch { key: String, stored: &'static str },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormatterError {
    #[error("divisor must be non-zero")]
    ZeroDivisor,
}
