use std::sync::Arc;

use chrono::Utc;
use tokio::sync::OwnedSemaphorePermit;
use tracing::{error, info, warn};

use matrix_core::{EXECUTION_ABORTED, Task, TaskResult};

use crate::observer::OrchestrationEvent;
use crate::registry::WorkerHandle;

use super::core::{Inner, Orchestrator};

impl Inner {
    /// Start `task` on its reserved worker without waiting for it.
    ///
    /// The permit is held for the whole execution, bounding the pool.
    pub(super) fn launch(
        self: &Arc<Self>,
        task: Arc<Task>,
        worker: Arc<WorkerHandle>,
        permit: OwnedSemaphorePermit,
    ) {
        let inner = Arc::clone(self);
        self.executions().spawn(async move {
            let _permit = permit;
            let result = worker.execute(&task).await;
            inner.complete(result);
        });
    }

    /// Record a worker's result unless the task already has one.
    pub(super) fn complete(&self, result: TaskResult) {
        let task_id = result.task_id;
        let worker_id = result.worker_id.clone();
        let success = result.success;
        let event = OrchestrationEvent::TaskCompleted {
            task_id,
            worker_id: worker_id.clone(),
            success,
            execution_time: result.execution_time,
            error: result.error.clone(),
        };

        let recorded = self.book().record(result);

        if recorded {
            self.emit(event);
        } else {
            self.emit(OrchestrationEvent::LateResultDiscarded {
                task_id,
                worker_id,
                success,
            });
        }
        self.wake.notify_one();
    }
}

impl Orchestrator {
    /// Stop the dispatch loop and wind down executions.
    ///
    /// Running executions get `shutdown_timeout_ms` to finish; anything still
    /// running after that is aborted and its task recorded as failed. Queued
    /// tasks stay queued. Safe to call more than once; later submissions are
    /// rejected.
    pub async fn shutdown(&self) {
        let loop_handle = {
            let mut book = self.inner.book();
            if book.shut_down {
                return;
            }
            book.shut_down = true;
            book.loop_handle.take()
        };
        info!("Shutting down orchestrator");
        self.inner.stop.notify_one();

        if let Some(handle) = loop_handle {
            if let Err(e) = handle.await {
                error!("Dispatch loop ended abnormally: {}", e);
            }
        }

        let mut executions = std::mem::take(&mut *self.inner.executions());
        let grace = self.inner.config.shutdown_timeout();
        let finished = tokio::time::timeout(grace, async {
            while executions.join_next().await.is_some() {}
        })
        .await
        .is_ok();

        if !finished {
            warn!(
                remaining = executions.len(),
                "Executions still running after {}ms, aborting",
                grace.as_millis()
            );
            executions.abort_all();
            while executions.join_next().await.is_some() {}
        }

        let aborted = {
            let mut book = self.inner.book();
            book.loop_running = false;
            let now = Utc::now();
            let stranded: Vec<_> = book
                .in_flight
                .iter()
                .map(|(task_id, entry)| (*task_id, entry.assigned_at))
                .collect();
            for (task_id, assigned_at) in &stranded {
                let elapsed = (now - *assigned_at).num_milliseconds().max(0) as f64 / 1000.0;
                book.record(
                    TaskResult::failure(
                        self.inner.config.orchestrator_id.as_str(),
                        *task_id,
                        EXECUTION_ABORTED,
                        elapsed,
                    )
                    .with_metadata("aborted", serde_json::Value::Bool(true)),
                );
            }
            stranded.len()
        };

        self.inner.permits.close();
        self.inner.emit(OrchestrationEvent::Shutdown { aborted });
        self.inner.observer.flush();
    }

    /// Whether [`shutdown`](Self::shutdown) has been called.
    pub fn is_shut_down(&self) -> bool {
        self.inner.book().shut_down
    }
}
