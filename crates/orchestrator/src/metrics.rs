use indexmap::IndexMap;
use serde::Serialize;

use matrix_core::TaskResult;

/// Orchestration-wide counters exposed through the status snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OrchestrationMetrics {
    /// Tasks admitted by `submit_task`.
    pub total_tasks: u64,
    pub successful_tasks: u64,
    pub failed_tasks: u64,
    /// Mean execution time (seconds) over every recorded completion.
    pub average_completion_time: f64,
    /// Assignments per worker, in registration order.
    pub worker_utilization: IndexMap<String, u64>,
}

impl OrchestrationMetrics {
    pub fn register_worker(&mut self, worker_id: &str) {
        self.worker_utilization.entry(worker_id.to_string()).or_insert(0);
    }

    pub fn record_submission(&mut self) {
        self.total_tasks += 1;
    }

    pub fn record_assignment(&mut self, worker_id: &str) {
        *self.worker_utilization.entry(worker_id.to_string()).or_insert(0) += 1;
    }

    /// Count a recorded result. Callers invoke this once per task, only for
    /// the result that won the completion race.
    pub fn record_completion(&mut self, result: &TaskResult) {
        if result.success {
            self.successful_tasks += 1;
        } else {
            self.failed_tasks += 1;
        }

        // Incremental mean: new_avg = prev_avg + (x - prev_avg) / count
        let count = self.completed() as f64;
        self.average_completion_time +=
            (result.execution_time - self.average_completion_time) / count;
    }

    pub fn completed(&self) -> u64 {
        self.successful_tasks + self.failed_tasks
    }

    /// Share of recorded completions that succeeded, 0 when nothing finished.
    pub fn success_ratio(&self) -> f64 {
        match self.completed() {
            0 => 0.0,
            n => self.successful_tasks as f64 / n as f64,
        }
    }
}
