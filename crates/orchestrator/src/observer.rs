use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};

use matrix_core::{Priority, TaskId};

/// Lifecycle events emitted by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OrchestrationEvent {
    WorkerRegistered {
        worker_id: String,
        capabilities: Vec<String>,
    },
    TaskSubmitted {
        task_id: TaskId,
        priority: Priority,
        queued: usize,
    },
    TaskAssigned {
        task_id: TaskId,
        worker_id: String,
        score: f64,
    },
    TaskCompleted {
        task_id: TaskId,
        worker_id: String,
        success: bool,
        execution_time: f64,
        error: Option<String>,
    },
    DeadlineExceeded {
        task_id: TaskId,
        worker_id: String,
    },
    /// A worker finished after its task was already recorded.
    LateResultDiscarded {
        task_id: TaskId,
        worker_id: String,
        success: bool,
    },
    LoopStarted,
    LoopStopped,
    Shutdown {
        aborted: usize,
    },
}

/// Sink for [`OrchestrationEvent`]s.
///
/// Called outside the orchestrator's locks; implementations must not block
/// for long since the dispatch loop emits from its own task.
pub trait OrchestrationObserver: Send + Sync {
    fn on_event(&self, event: &OrchestrationEvent);

    /// Called once during shutdown, after the last event.
    fn flush(&self) {}
}

/// Blanket implementation so `Arc<dyn OrchestrationObserver>` can be used directly.
impl<T: OrchestrationObserver + ?Sized> OrchestrationObserver for Arc<T> {
    fn on_event(&self, event: &OrchestrationEvent) {
        (**self).on_event(event)
    }

    fn flush(&self) {
        (**self).flush()
    }
}

/// Default observer: structured `tracing` output.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl OrchestrationObserver for TracingObserver {
    fn on_event(&self, event: &OrchestrationEvent) {
        match event {
            OrchestrationEvent::WorkerRegistered { worker_id, capabilities } => {
                info!(worker = %worker_id, capabilities = ?capabilities, "Registered worker");
            }
            OrchestrationEvent::TaskSubmitted { task_id, priority, queued } => {
                info!(
                    task_id = %task_id,
                    priority = %priority,
                    level = priority.level(),
                    queued,
                    "Task submitted"
                );
            }
            OrchestrationEvent::TaskAssigned { task_id, worker_id, score } => {
                info!(task_id = %task_id, worker = %worker_id, score, "Task assigned");
            }
            OrchestrationEvent::TaskCompleted { task_id, worker_id, success: true, execution_time, .. } => {
                info!(
                    task_id = %task_id,
                    worker = %worker_id,
                    "Task completed in {:.3}s",
                    execution_time
                );
            }
            OrchestrationEvent::TaskCompleted { task_id, worker_id, error, .. } => {
                let reason = error.as_deref().unwrap_or("unknown error");
                if reason.starts_with("worker panicked") {
                    error!(task_id = %task_id, worker = %worker_id, "Task failed: {}", reason);
                } else {
                    warn!(task_id = %task_id, worker = %worker_id, "Task failed: {}", reason);
                }
            }
            OrchestrationEvent::DeadlineExceeded { task_id, worker_id } => {
                warn!(task_id = %task_id, worker = %worker_id, "Task exceeded its deadline");
            }
            OrchestrationEvent::LateResultDiscarded { task_id, worker_id, success } => {
                warn!(
                    task_id = %task_id,
                    worker = %worker_id,
                    success,
                    "Discarding late result for already-completed task"
                );
            }
            OrchestrationEvent::LoopStarted => info!("Dispatch loop started"),
            OrchestrationEvent::LoopStopped => info!("Dispatch loop idle, stopping"),
            OrchestrationEvent::Shutdown { aborted } => {
                info!(aborted, "Orchestrator shut down");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Recording {
        seen: Mutex<Vec<OrchestrationEvent>>,
        flushed: Mutex<bool>,
    }

    impl OrchestrationObserver for Recording {
        fn on_event(&self, event: &OrchestrationEvent) {
            self.seen.lock().unwrap().push(event.clone());
        }

        fn flush(&self) {
            *self.flushed.lock().unwrap() = true;
        }
    }

    #[test]
    fn arc_forwards_to_inner() {
        let inner = Arc::new(Recording::default());
        let observer: Arc<dyn OrchestrationObserver> = inner.clone();

        observer.on_event(&OrchestrationEvent::LoopStarted);
        observer.flush();

        assert_eq!(*inner.seen.lock().unwrap(), vec![OrchestrationEvent::LoopStarted]);
        assert!(*inner.flushed.lock().unwrap());
    }

    #[test]
    fn events_serialize_with_tag() {
        let json = serde_json::to_value(OrchestrationEvent::Shutdown { aborted: 2 }).unwrap();
        assert_eq!(json["event"], "shutdown");
        assert_eq!(json["aborted"], 2);
    }

    #[test]
    fn tracing_observer_handles_every_event() {
        let id = uuid::Uuid::new_v4();
        let events = [
            OrchestrationEvent::WorkerRegistered { worker_id: "w".into(), capabilities: vec!["a".into()] },
            OrchestrationEvent::TaskSubmitted { task_id: id, priority: Priority::High, queued: 1 },
            OrchestrationEvent::TaskAssigned { task_id: id, worker_id: "w".into(), score: 0.9 },
            OrchestrationEvent::TaskCompleted {
                task_id: id,
                worker_id: "w".into(),
                success: false,
                execution_time: 0.1,
                error: Some("worker panicked: boom".into()),
            },
            OrchestrationEvent::DeadlineExceeded { task_id: id, worker_id: "w".into() },
            OrchestrationEvent::LateResultDiscarded { task_id: id, worker_id: "w".into(), success: true },
            OrchestrationEvent::LoopStarted,
            OrchestrationEvent::LoopStopped,
            OrchestrationEvent::Shutdown { aborted: 0 },
        ];
        for event in &events {
            TracingObserver.on_event(event);
        }
        TracingObserver.flush();
    }
}
