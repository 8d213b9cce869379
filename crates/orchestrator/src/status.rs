use chrono::{DateTime, Utc};
use serde::Serialize;

use matrix_core::{Task, TaskResult, WorkerStatus};

use crate::metrics::OrchestrationMetrics;

/// Where a task currently stands.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskStatus {
    /// Waiting for a worker; `position` is zero-based in dispatch order.
    Queued { position: usize },
    InFlight {
        task: Task,
        worker_id: String,
        assigned_at: DateTime<Utc>,
    },
    Completed(ResultSummary),
    NotFound,
}

impl TaskStatus {
    pub fn is_completed(&self) -> bool {
        matches!(self, TaskStatus::Completed(_))
    }
}

/// The caller-facing subset of a [`TaskResult`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultSummary {
    pub success: bool,
    pub output: Option<serde_json::Value>,
    pub execution_time: f64,
    pub worker_id: String,
    pub error: Option<String>,
}

impl From<&TaskResult> for ResultSummary {
    fn from(result: &TaskResult) -> Self {
        Self {
            success: result.success,
            output: result.output.clone(),
            execution_time: result.execution_time,
            worker_id: result.worker_id.clone(),
            error: result.error.clone(),
        }
    }
}

/// Point-in-time view of the whole orchestrator.
#[derive(Debug, Clone, Serialize)]
pub struct OrchestrationStatus {
    /// Whether the dispatch loop is currently running.
    pub running: bool,
    pub queued_count: usize,
    pub in_flight_count: usize,
    pub completed_count: usize,
    pub registered_worker_count: usize,
    pub metrics: OrchestrationMetrics,
    pub worker_statuses: Vec<WorkerStatus>,
}

impl OrchestrationStatus {
    /// Nothing queued and nothing executing.
    pub fn is_settled(&self) -> bool {
        self.queued_count == 0 && self.in_flight_count == 0
    }
}
