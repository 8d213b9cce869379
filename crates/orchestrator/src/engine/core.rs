use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use tokio::sync::{Notify, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{info, warn};

use matrix_core::{
    OrchestratorConfig, OrchestratorError, Task, TaskId, TaskResult, Worker, WorkerState,
};

use crate::metrics::OrchestrationMetrics;
use crate::observer::{OrchestrationEvent, OrchestrationObserver, TracingObserver};
use crate::queue::TaskQueue;
use crate::registry::WorkerHandle;
use crate::status::{OrchestrationStatus, ResultSummary, TaskStatus};

/// A task that has been handed to a worker and has no recorded result yet.
#[derive(Debug, Clone)]
pub(super) struct InFlight {
    pub(super) task: Arc<Task>,
    pub(super) worker_id: String,
    pub(super) assigned_at: DateTime<Utc>,
}

/// Everything the dispatch loop, submitters and completions share.
///
/// Guarded by a single mutex that is never held across an `.await`. A task
/// id lives in exactly one of `queue`, `in_flight` or `completed`.
#[derive(Debug, Default)]
pub(super) struct DispatchBook {
    pub(super) queue: TaskQueue,
    pub(super) in_flight: HashMap<TaskId, InFlight>,
    pub(super) completed: HashMap<TaskId, TaskResult>,
    pub(super) metrics: OrchestrationMetrics,
    pub(super) loop_running: bool,
    pub(super) loop_handle: Option<JoinHandle<()>>,
    pub(super) shut_down: bool,
}

impl DispatchBook {
    pub(super) fn knows(&self, task_id: TaskId) -> bool {
        self.completed.contains_key(&task_id)
            || self.in_flight.contains_key(&task_id)
            || self.queue.contains(task_id)
    }

    pub(super) fn is_drained(&self) -> bool {
        self.queue.is_empty() && self.in_flight.is_empty()
    }

    /// Record a task's result. The first result for a task wins; later ones
    /// are rejected and leave the book untouched.
    pub(super) fn record(&mut self, result: TaskResult) -> bool {
        if self.completed.contains_key(&result.task_id) {
            return false;
        }
        self.in_flight.remove(&result.task_id);
        self.metrics.record_completion(&result);
        self.completed.insert(result.task_id, result);
        true
    }
}

pub(super) struct Inner {
    pub(super) config: OrchestratorConfig,
    pub(super) workers: RwLock<IndexMap<String, Arc<WorkerHandle>>>,
    pub(super) book: Mutex<DispatchBook>,
    /// Early wake for the dispatch loop (submissions, completions).
    pub(super) wake: Notify,
    pub(super) stop: Notify,
    pub(super) permits: Arc<Semaphore>,
    pub(super) executions: Mutex<JoinSet<()>>,
    pub(super) observer: Arc<dyn OrchestrationObserver>,
}

impl Inner {
    pub(super) fn book(&self) -> MutexGuard<'_, DispatchBook> {
        self.book.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(super) fn executions(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.executions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registered workers in registration order. Taken before the book lock.
    pub(super) fn worker_snapshot(&self) -> Vec<Arc<WorkerHandle>> {
        let workers = self.workers.read().unwrap_or_else(PoisonError::into_inner);
        workers.values().cloned().collect()
    }

    pub(super) fn worker(&self, worker_id: &str) -> Option<Arc<WorkerHandle>> {
        let workers = self.workers.read().unwrap_or_else(PoisonError::into_inner);
        workers.get(worker_id).cloned()
    }

    pub(super) fn emit(&self, event: OrchestrationEvent) {
        self.observer.on_event(&event);
    }
}

/// Multi-worker task orchestrator.
///
/// Cheap to clone; clones share the same queue, workers and dispatch loop.
/// Must be used from within a tokio runtime.
#[derive(Clone)]
pub struct Orchestrator {
    pub(super) inner: Arc<Inner>,
}

impl Orchestrator {
    /// Create an orchestrator that reports through [`TracingObserver`].
    pub fn new(config: OrchestratorConfig) -> Self {
        Self::with_observer(config, Arc::new(TracingObserver))
    }

    /// Like [`new`](Self::new), but rejects an invalid config instead of
    /// running with it.
    pub fn try_new(config: OrchestratorConfig) -> Result<Self, OrchestratorError> {
        config.validate()?;
        Ok(Self::new(config))
    }

    pub fn with_observer(
        config: OrchestratorConfig,
        observer: Arc<dyn OrchestrationObserver>,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrent_executions.max(1)));
        Self {
            inner: Arc::new(Inner {
                config,
                workers: RwLock::new(IndexMap::new()),
                book: Mutex::new(DispatchBook::default()),
                wake: Notify::new(),
                stop: Notify::new(),
                permits,
                executions: Mutex::new(JoinSet::new()),
                observer,
            }),
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.inner.config
    }

    /// Add a worker to the pool. Returns `false` if a worker with the same id
    /// is already registered; the new instance is then ignored.
    pub fn register_worker(&self, worker: Arc<dyn Worker>) -> bool {
        let worker_id = worker.id().to_string();
        let handle = Arc::new(WorkerHandle::new(worker));
        let capabilities = handle.status().capabilities;

        {
            let mut workers = self.inner.workers.write().unwrap_or_else(PoisonError::into_inner);
            if workers.contains_key(&worker_id) {
                warn!(worker = %worker_id, "Worker already registered, ignoring");
                return false;
            }
            workers.insert(worker_id.clone(), handle);
        }
        self.inner.book().metrics.register_worker(&worker_id);

        self.inner.emit(OrchestrationEvent::WorkerRegistered {
            worker_id,
            capabilities,
        });
        self.inner.wake.notify_one();
        true
    }

    /// Admit a task. Returns immediately; the task runs once a worker is
    /// matched to it.
    pub async fn submit_task(&self, task: Task) -> Result<TaskId, OrchestratorError> {
        let task_id = task.id;
        let priority = task.priority;

        let (queued, started) = {
            let mut book = self.inner.book();
            if book.shut_down {
                return Err(OrchestratorError::ShutDown);
            }
            if book.knows(task_id) {
                return Err(OrchestratorError::DuplicateTask(task_id));
            }
            book.queue.enqueue(Arc::new(task));
            book.metrics.record_submission();

            // The loop clears `loop_running` under this same lock when it
            // exits, so a submission either sees a live loop or starts one.
            let started = !book.loop_running;
            if started {
                book.loop_running = true;
                book.loop_handle = Some(tokio::spawn(Arc::clone(&self.inner).run_loop()));
            }
            (book.queue.len(), started)
        };

        self.inner.emit(OrchestrationEvent::TaskSubmitted {
            task_id,
            priority,
            queued,
        });
        if !started {
            self.inner.wake.notify_one();
        }
        Ok(task_id)
    }

    pub fn get_task_status(&self, task_id: TaskId) -> TaskStatus {
        let book = self.inner.book();
        if let Some(result) = book.completed.get(&task_id) {
            return TaskStatus::Completed(ResultSummary::from(result));
        }
        if let Some(entry) = book.in_flight.get(&task_id) {
            return TaskStatus::InFlight {
                task: (*entry.task).clone(),
                worker_id: entry.worker_id.clone(),
                assigned_at: entry.assigned_at,
            };
        }
        match book.queue.position(task_id) {
            Some(position) => TaskStatus::Queued { position },
            None => TaskStatus::NotFound,
        }
    }

    /// Full recorded result, once the task has completed.
    pub fn get_result(&self, task_id: TaskId) -> Option<TaskResult> {
        self.inner.book().completed.get(&task_id).cloned()
    }

    pub fn get_orchestration_status(&self) -> OrchestrationStatus {
        let workers = self.inner.worker_snapshot();
        let (running, queued_count, in_flight_count, completed_count, metrics) = {
            let book = self.inner.book();
            (
                book.loop_running,
                book.queue.len(),
                book.in_flight.len(),
                book.completed.len(),
                book.metrics.clone(),
            )
        };

        OrchestrationStatus {
            running,
            queued_count,
            in_flight_count,
            completed_count,
            registered_worker_count: workers.len(),
            metrics,
            worker_statuses: workers.iter().map(|w| w.status()).collect(),
        }
    }

    /// Move a worker in or out of rotation (Idle, Error, Maintenance).
    ///
    /// Fails while the worker is reserved or executing.
    pub fn set_worker_state(
        &self,
        worker_id: &str,
        state: WorkerState,
    ) -> Result<(), OrchestratorError> {
        let handle = self
            .inner
            .worker(worker_id)
            .ok_or_else(|| OrchestratorError::WorkerNotFound(worker_id.to_string()))?;
        let previous = handle.state();
        handle.set_state(state)?;
        info!(worker = %worker_id, from = %previous, to = %state, "Worker state changed");

        if state == WorkerState::Idle {
            self.inner.wake.notify_one();
        }
        Ok(())
    }

    /// Ids of registered workers, in registration order.
    pub fn worker_ids(&self) -> Vec<String> {
        self.inner
            .worker_snapshot()
            .iter()
            .map(|w| w.id().to_string())
            .collect()
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.inner.config)
            .field("workers", &self.worker_ids())
            .finish()
    }
}
