//! Admission buffer ordered by priority and deadline.

use std::cmp::Ordering;
use std::sync::Arc;

use matrix_core::{Task, TaskId};

/// Dispatch order: higher priority first, then earlier deadline, with
/// deadline-less tasks after those that have one. Equal keys compare equal so
/// insertion keeps admission order.
pub fn dispatch_order(a: &Task, b: &Task) -> Ordering {
    b.priority.cmp(&a.priority).then_with(|| match (a.deadline, b.deadline) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    })
}

/// Queued tasks, always kept in [`dispatch_order`].
///
/// The buffer is sorted on insertion, so every dispatch pass sees late but
/// urgent tasks ahead of older, less urgent ones. Tasks leave the queue only
/// through [`TaskQueue::remove`], which the dispatch loop calls once a worker
/// has been reserved.
#[derive(Debug, Default)]
pub struct TaskQueue {
    tasks: Vec<Arc<Task>>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert behind every task that orders before or equal to it.
    pub fn enqueue(&mut self, task: Arc<Task>) {
        let at = self
            .tasks
            .partition_point(|queued| dispatch_order(queued, &task) != Ordering::Greater);
        self.tasks.insert(at, task);
    }

    /// Snapshot of the queued tasks in dispatch order. Nothing is removed.
    pub fn drain_ready(&self) -> Vec<Arc<Task>> {
        self.tasks.clone()
    }

    pub fn remove(&mut self, task_id: TaskId) -> Option<Arc<Task>> {
        let idx = self.position(task_id)?;
        Some(self.tasks.remove(idx))
    }

    /// Zero-based position in dispatch order.
    pub fn position(&self, task_id: TaskId) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == task_id)
    }

    pub fn contains(&self, task_id: TaskId) -> bool {
        self.position(task_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
