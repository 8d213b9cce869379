use thiserror::Error;

use crate::task::TaskId;
use crate::worker::WorkerState;

/// Failure reported by a worker from [`Worker::execute`](crate::Worker::execute).
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("unsupported capability: {0}")]
    Unsupported(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("execution failed: {0}")]
    Failed(String),
}

/// Errors returned by the orchestrator's public API.
///
/// Task failures are never reported here; they are recorded as results.
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("task {0} is already known to the orchestrator")]
    DuplicateTask(TaskId),

    #[error("orchestrator has been shut down")]
    ShutDown,

    #[error("worker not found: {0}")]
    WorkerNotFound(String),

    #[error("cannot move worker {worker_id} from {from} to {to}")]
    InvalidStateChange {
        worker_id: String,
        from: WorkerState,
        to: WorkerState,
    },

    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// Configuration loading and validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
