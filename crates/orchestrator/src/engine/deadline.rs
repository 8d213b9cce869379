use chrono::Utc;

use matrix_core::TaskResult;

use crate::observer::OrchestrationEvent;

use super::core::Inner;

impl Inner {
    /// Expire in-flight tasks whose deadline has passed.
    ///
    /// Each expired task gets a synthetic failure result under the
    /// orchestrator's own id. The worker keeps running; whatever it returns
    /// later loses to the result recorded here.
    pub(super) fn sweep_deadlines(&self) -> usize {
        let now = Utc::now();

        let expired: Vec<_> = {
            let mut book = self.book();
            let overdue: Vec<_> = book
                .in_flight
                .iter()
                .filter(|(_, entry)| entry.task.is_overdue(now))
                .map(|(task_id, entry)| (*task_id, entry.worker_id.clone()))
                .collect();

            overdue
                .into_iter()
                .filter(|(task_id, _)| {
                    book.record(TaskResult::deadline_exceeded(
                        self.config.orchestrator_id.as_str(),
                        *task_id,
                    ))
                })
                .collect()
        };

        for (task_id, worker_id) in &expired {
            self.emit(OrchestrationEvent::DeadlineExceeded {
                task_id: *task_id,
                worker_id: worker_id.clone(),
            });
        }
        expired.len()
    }
}
