use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error};

use crate::observer::OrchestrationEvent;
use crate::selector;

use super::core::{InFlight, Inner};

impl Inner {
    /// Main dispatch loop. Started by the first submission after the loop
    /// went idle; returns once nothing is queued or in flight, or on shutdown.
    pub(super) async fn run_loop(self: Arc<Self>) {
        self.emit(OrchestrationEvent::LoopStarted);
        let period = self.config.cycle_period();

        loop {
            {
                let mut book = self.book();
                if book.shut_down {
                    book.loop_running = false;
                    break;
                }
            }

            self.reap_executions();
            self.dispatch_pass();
            self.sweep_deadlines();

            {
                let mut book = self.book();
                if book.shut_down || book.is_drained() {
                    book.loop_running = false;
                    break;
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(period) => {}
                _ = self.wake.notified(), if self.config.early_wake => {}
                _ = self.stop.notified() => {}
            }
        }

        self.emit(OrchestrationEvent::LoopStopped);
    }

    /// One pass over the queue in dispatch order: every task with an eligible
    /// idle worker is reserved, moved in flight and launched. Tasks without a
    /// match stay queued for the next pass.
    pub(super) fn dispatch_pass(self: &Arc<Self>) {
        let workers = self.worker_snapshot();
        if workers.is_empty() {
            return;
        }

        let mut launches = Vec::new();
        {
            let mut book = self.book();
            if book.shut_down {
                return;
            }

            for task in book.queue.drain_ready() {
                let Some((worker, score)) = selector::select_scored(&task, &workers) else {
                    debug!(task_id = %task.id, "No eligible worker, leaving queued");
                    continue;
                };
                let Ok(permit) = Arc::clone(&self.permits).try_acquire_owned() else {
                    debug!("Execution pool saturated, deferring remaining tasks");
                    break;
                };
                if !worker.try_reserve(task.id) {
                    continue;
                }

                book.queue.remove(task.id);
                book.metrics.record_assignment(worker.id());
                book.in_flight.insert(
                    task.id,
                    InFlight {
                        task: Arc::clone(&task),
                        worker_id: worker.id().to_string(),
                        assigned_at: Utc::now(),
                    },
                );
                launches.push((task, worker, permit, score));
            }
        }

        for (task, worker, permit, score) in launches {
            self.emit(OrchestrationEvent::TaskAssigned {
                task_id: task.id,
                worker_id: worker.id().to_string(),
                score,
            });
            self.launch(task, worker, permit);
        }
    }

    /// Drop finished executions from the pool, logging any that died.
    pub(super) fn reap_executions(&self) {
        let mut executions = self.executions();
        while let Some(joined) = executions.try_join_next() {
            if let Err(e) = joined {
                if e.is_panic() {
                    error!("Execution task panicked outside the worker harness: {}", e);
                }
            }
        }
    }
}
