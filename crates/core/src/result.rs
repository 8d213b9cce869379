use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::task::TaskId;

/// Error text recorded when the deadline monitor expires a task.
pub const DEADLINE_EXCEEDED: &str = "deadline exceeded";

/// Error text recorded for executions aborted during shutdown.
pub const EXECUTION_ABORTED: &str = "execution aborted";

/// Outcome of a single task, produced exactly once per task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    /// Worker that produced the result, or the orchestrator's own id for
    /// synthesized failures.
    pub worker_id: String,
    pub task_id: TaskId,
    pub success: bool,
    /// Present only on success.
    pub output: Option<serde_json::Value>,
    pub confidence: f64,
    /// Measured execution time in seconds.
    pub execution_time: f64,
    pub error: Option<String>,
    pub metadata: HashMap<String, serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

impl TaskResult {
    pub fn success(
        worker_id: impl Into<String>,
        task_id: TaskId,
        output: serde_json::Value,
        confidence: f64,
        execution_time: f64,
    ) -> Self {
        Self {
            worker_id: worker_id.into(),
            task_id,
            success: true,
            output: Some(output),
            confidence,
            execution_time,
            error: None,
            metadata: HashMap::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn failure(
        worker_id: impl Into<String>,
        task_id: TaskId,
        error: impl Into<String>,
        execution_time: f64,
    ) -> Self {
        Self {
            worker_id: worker_id.into(),
            task_id,
            success: false,
            output: None,
            confidence: 0.0,
            execution_time,
            error: Some(error.into()),
            metadata: HashMap::new(),
            timestamp: Utc::now(),
        }
    }

    /// Failure synthesized by the orchestrator when a task outlives its deadline.
    pub fn deadline_exceeded(orchestrator_id: impl Into<String>, task_id: TaskId) -> Self {
        Self::failure(orchestrator_id, task_id, DEADLINE_EXCEEDED, 0.0)
            .with_metadata("timeout", serde_json::Value::Bool(true))
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn is_timeout(&self) -> bool {
        !self.success && self.error.as_deref() == Some(DEADLINE_EXCEEDED)
    }
}
