//! Execution harness around registered workers.
//!
//! A [`WorkerHandle`] owns the mutable side of a worker (state, assigned task,
//! running performance) so the [`Worker`] implementation only has to supply
//! fitness and domain logic. Reservation and execution both go through the
//! handle's mutex, which is what keeps a worker on at most one task.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use futures::FutureExt;
use tracing::{error, warn};

use matrix_core::{
    OrchestratorError, PerformanceMetrics, Task, TaskId, TaskResult, Worker, WorkerKind,
    WorkerState, WorkerStatus, clamp_unit,
};

#[derive(Debug)]
struct WorkerRuntime {
    state: WorkerState,
    current_task: Option<TaskId>,
    performance: PerformanceMetrics,
}

/// A registered worker plus its runtime bookkeeping.
pub struct WorkerHandle {
    worker: Arc<dyn Worker>,
    capability_names: Vec<String>,
    runtime: Mutex<WorkerRuntime>,
}

impl WorkerHandle {
    pub fn new(worker: Arc<dyn Worker>) -> Self {
        let capability_names = worker.capabilities().iter().map(|c| c.name.clone()).collect();
        Self {
            worker,
            capability_names,
            runtime: Mutex::new(WorkerRuntime {
                state: WorkerState::Idle,
                current_task: None,
                performance: PerformanceMetrics::default(),
            }),
        }
    }

    fn runtime(&self) -> MutexGuard<'_, WorkerRuntime> {
        self.runtime.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn id(&self) -> &str {
        self.worker.id()
    }

    pub fn kind(&self) -> WorkerKind {
        self.worker.kind()
    }

    pub fn state(&self) -> WorkerState {
        self.runtime().state
    }

    pub fn current_task(&self) -> Option<TaskId> {
        self.runtime().current_task
    }

    pub fn performance(&self) -> PerformanceMetrics {
        self.runtime().performance.clone()
    }

    pub fn success_rate(&self) -> f64 {
        self.runtime().performance.success_rate
    }

    /// Worker-reported fitness, clamped to [0, 1]. Computed fresh every call.
    pub fn fitness(&self, task: &Task) -> f64 {
        clamp_unit(self.worker.fitness(task))
    }

    pub fn load_factor(&self) -> f64 {
        clamp_unit(self.worker.load_factor())
    }

    pub fn status(&self) -> WorkerStatus {
        let rt = self.runtime();
        WorkerStatus {
            worker_id: self.id().to_string(),
            kind: self.kind(),
            state: rt.state,
            load_factor: self.load_factor(),
            capabilities: self.capability_names.clone(),
            performance: rt.performance.clone(),
            current_task: rt.current_task,
        }
    }

    /// Claim an idle worker for `task_id` (Idle → Busy).
    ///
    /// Returns `false` if the worker is not idle; the caller must then leave
    /// the task queued.
    pub fn try_reserve(&self, task_id: TaskId) -> bool {
        let mut rt = self.runtime();
        if !rt.state.is_selectable() {
            return false;
        }
        rt.state = WorkerState::Busy;
        rt.current_task = Some(task_id);
        true
    }

    /// Administrative state change (Idle, Error or Maintenance only).
    ///
    /// Refused while the worker holds a task.
    pub fn set_state(&self, target: WorkerState) -> Result<(), OrchestratorError> {
        let mut rt = self.runtime();
        if !target.is_administrative() || rt.current_task.is_some() {
            return Err(OrchestratorError::InvalidStateChange {
                worker_id: self.id().to_string(),
                from: rt.state,
                to: target,
            });
        }
        rt.state = target;
        Ok(())
    }

    /// Run `task` on this worker and produce its result.
    ///
    /// The worker must be idle or reserved for this very task. It is Active
    /// while the worker's future runs and is returned to Idle, with its running
    /// metrics updated, whether the future returns, fails, panics or is
    /// dropped part-way.
    pub async fn execute(&self, task: &Task) -> TaskResult {
        let Some(assignment) = Assignment::begin(self, task.id) else {
            return TaskResult::failure(
                self.id(),
                task.id,
                format!("worker {} is occupied by another task", self.id()),
                0.0,
            );
        };

        let outcome = AssertUnwindSafe(self.worker.execute(task)).catch_unwind().await;
        let elapsed = assignment.started.elapsed().as_secs_f64();

        let result = match outcome {
            Ok(Ok(work)) => {
                let mut result =
                    TaskResult::success(self.id(), task.id, work.output, work.confidence, elapsed);
                result.metadata = work.metadata;
                result
            }
            Ok(Err(e)) => TaskResult::failure(self.id(), task.id, e.to_string(), elapsed),
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(worker = %self.id(), task_id = %task.id, "worker panicked: {}", message);
                TaskResult::failure(self.id(), task.id, format!("worker panicked: {message}"), elapsed)
                    .with_metadata("orchestration_error", serde_json::Value::Bool(true))
            }
        }
        .with_metadata("worker_kind", serde_json::Value::String(self.kind().to_string()));

        assignment.settle(&result);
        result
    }

    fn finish(&self, task_id: TaskId, success: bool, execution_time: f64) {
        let mut rt = self.runtime();
        if rt.current_task == Some(task_id) {
            rt.state = WorkerState::Idle;
            rt.current_task = None;
        }
        rt.performance.record(success, execution_time);
    }

    #[cfg(test)]
    pub(crate) fn record_outcome(&self, success: bool, execution_time: f64) {
        self.runtime().performance.record(success, execution_time);
    }
}

impl std::fmt::Debug for WorkerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerHandle")
            .field("id", &self.id())
            .field("runtime", &*self.runtime())
            .finish()
    }
}

/// Scope of one execution; restores the worker when it ends.
struct Assignment<'a> {
    handle: &'a WorkerHandle,
    task_id: TaskId,
    started: Instant,
    settled: bool,
}

impl<'a> Assignment<'a> {
    fn begin(handle: &'a WorkerHandle, task_id: TaskId) -> Option<Self> {
        let mut rt = handle.runtime();
        let admissible = match rt.state {
            WorkerState::Idle => true,
            WorkerState::Busy => rt.current_task == Some(task_id),
            _ => false,
        };
        if !admissible {
            warn!(
                worker = %handle.id(),
                task_id = %task_id,
                state = %rt.state,
                "refusing execution: worker not available for this task"
            );
            return None;
        }
        rt.state = WorkerState::Active;
        rt.current_task = Some(task_id);
        drop(rt);

        Some(Self {
            handle,
            task_id,
            started: Instant::now(),
            settled: false,
        })
    }

    fn settle(mut self, result: &TaskResult) {
        self.handle.finish(self.task_id, result.success, result.execution_time);
        self.settled = true;
    }
}

impl Drop for Assignment<'_> {
    fn drop(&mut self) {
        if !self.settled {
            warn!(worker = %self.handle.id(), task_id = %self.task_id, "execution dropped before completion");
            self.handle
                .finish(self.task_id, false, self.started.elapsed().as_secs_f64());
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
