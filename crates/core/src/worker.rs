//! The worker contract and the status types every worker reports.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::capability::Capability;
use crate::error::WorkerError;
use crate::task::{Task, TaskId};

/// Broad family a worker belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerKind {
    Voice,
    Vision,
    Task,
    Creative,
    Analytical,
    Social,
    Security,
    Workflow,
    Custom,
}

impl std::fmt::Display for WorkerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            WorkerKind::Voice => "voice",
            WorkerKind::Vision => "vision",
            WorkerKind::Task => "task",
            WorkerKind::Creative => "creative",
            WorkerKind::Analytical => "analytical",
            WorkerKind::Social => "social",
            WorkerKind::Security => "security",
            WorkerKind::Workflow => "workflow",
            WorkerKind::Custom => "custom",
        };
        write!(f, "{s}")
    }
}

/// Lifecycle state of a registered worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    /// No task assigned; selectable.
    Idle,
    /// Executing its assigned task.
    Active,
    /// Reserved for a task whose execution has not started yet.
    Busy,
    /// Taken out of rotation after a fault.
    Error,
    /// Taken out of rotation by an operator.
    Maintenance,
}

impl WorkerState {
    /// Only idle workers are offered to the selector.
    pub fn is_selectable(self) -> bool {
        self == WorkerState::Idle
    }

    /// Whether this state implies exactly one assigned task.
    pub fn holds_task(self) -> bool {
        matches!(self, WorkerState::Active | WorkerState::Busy)
    }

    /// States an operator may set directly.
    pub fn is_administrative(self) -> bool {
        matches!(
            self,
            WorkerState::Idle | WorkerState::Error | WorkerState::Maintenance
        )
    }
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            WorkerState::Idle => "idle",
            WorkerState::Active => "active",
            WorkerState::Busy => "busy",
            WorkerState::Error => "error",
            WorkerState::Maintenance => "maintenance",
        };
        write!(f, "{s}")
    }
}

/// Running performance of a worker.
///
/// Both averages are folded in one result at a time and never recomputed
/// from history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub tasks_completed: u64,
    /// Fraction of completed tasks that succeeded. Starts at 1.0.
    pub success_rate: f64,
    /// Mean execution time in seconds.
    pub average_execution_time: f64,
    pub last_active: DateTime<Utc>,
}

impl Default for PerformanceMetrics {
    fn default() -> Self {
        Self {
            tasks_completed: 0,
            success_rate: 1.0,
            average_execution_time: 0.0,
            last_active: Utc::now(),
        }
    }
}

impl PerformanceMetrics {
    /// Fold one completed task into the running averages.
    pub fn record(&mut self, success: bool, execution_time: f64) {
        self.tasks_completed += 1;
        self.last_active = Utc::now();

        let n = self.tasks_completed as f64;
        let successes = self.success_rate * (n - 1.0) + if success { 1.0 } else { 0.0 };
        self.success_rate = successes / n;
        self.average_execution_time =
            (self.average_execution_time * (n - 1.0) + execution_time) / n;
    }
}

/// Point-in-time view of a worker.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerStatus {
    pub worker_id: String,
    pub kind: WorkerKind,
    pub state: WorkerState,
    pub load_factor: f64,
    pub capabilities: Vec<String>,
    pub performance: PerformanceMetrics,
    pub current_task: Option<TaskId>,
}

/// What a worker hands back from a successful execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkOutput {
    pub output: serde_json::Value,
    pub confidence: f64,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl WorkOutput {
    pub fn new(output: serde_json::Value, confidence: f64) -> Self {
        Self {
            output,
            confidence,
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// Contract implemented by anything that can take tasks off the orchestrator.
///
/// Implementors only supply the domain logic. State tracking (idle/active),
/// timing and running metrics are handled by the orchestrator's harness around
/// [`Worker::execute`], so they hold on every exit path.
#[async_trait]
pub trait Worker: Send + Sync {
    /// Stable identity; registration is idempotent per id.
    fn id(&self) -> &str;

    fn kind(&self) -> WorkerKind {
        WorkerKind::Custom
    }

    /// Declared capabilities. Must not change over the worker's lifetime.
    fn capabilities(&self) -> &[Capability];

    /// Suitability for `task` in [0, 1]; 0 means "cannot handle".
    ///
    /// Called on every selection attempt, so it must be cheap and must not
    /// block or mutate anything.
    fn fitness(&self, task: &Task) -> f64;

    /// Perform the task. Failures are reported as `Err`, not panics.
    async fn execute(&self, task: &Task) -> Result<WorkOutput, WorkerError>;

    /// Externally observed load in [0, 1].
    fn load_factor(&self) -> f64 {
        0.0
    }
}
