#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use matrix_core::{
    Capability, OrchestratorConfig, Task, TaskId, TaskResult, WorkOutput, Worker, WorkerError,
};
use matrix_orchestrator::{OrchestrationEvent, OrchestrationObserver, Orchestrator};

/// What the mock does when asked to execute.
#[derive(Clone, Copy)]
pub enum Outcome {
    Succeed,
    Fail,
    /// Panics when the task input has `"explode": true`, succeeds otherwise.
    PanicOnExplode,
}

/// Configurable worker that records what it ran and how many ran at once.
pub struct MockWorker {
    id: String,
    caps: Vec<Capability>,
    fitness: f64,
    delay: Duration,
    outcome: Outcome,
    pub executed: Mutex<Vec<String>>,
    running: AtomicUsize,
    pub max_running: AtomicUsize,
}

impl MockWorker {
    pub fn new(id: &str, caps: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            caps: caps.iter().map(|c| Capability::new(*c, 0.9)).collect(),
            fitness: 0.9,
            delay: Duration::from_millis(5),
            outcome: Outcome::Succeed,
            executed: Mutex::new(Vec::new()),
            running: AtomicUsize::new(0),
            max_running: AtomicUsize::new(0),
        }
    }

    pub fn fitness(mut self, fitness: f64) -> Self {
        self.fitness = fitness;
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn outcome(mut self, outcome: Outcome) -> Self {
        self.outcome = outcome;
        self
    }

    pub fn build(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

#[async_trait]
impl Worker for MockWorker {
    fn id(&self) -> &str {
        &self.id
    }

    fn capabilities(&self) -> &[Capability] {
        &self.caps
    }

    fn fitness(&self, task: &Task) -> f64 {
        if self.caps.iter().any(|c| task.requires(&c.name)) {
            self.fitness
        } else {
            0.0
        }
    }

    async fn execute(&self, task: &Task) -> Result<WorkOutput, WorkerError> {
        let now_running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_running.fetch_max(now_running, Ordering::SeqCst);
        self.executed.lock().unwrap().push(task.description.clone());

        tokio::time::sleep(self.delay).await;
        self.running.fetch_sub(1, Ordering::SeqCst);

        match self.outcome {
            Outcome::Succeed => Ok(WorkOutput::new(
                serde_json::json!({"handled": task.description}),
                0.9,
            )),
            Outcome::Fail => Err(WorkerError::Failed(format!("{} refused", self.id))),
            Outcome::PanicOnExplode => {
                if task.input["explode"] == true {
                    panic!("mock worker exploded");
                }
                Ok(WorkOutput::new(serde_json::json!("survived"), 0.7))
            }
        }
    }
}

/// Observer that keeps every event.
#[derive(Default)]
pub struct RecordingObserver {
    pub events: Mutex<Vec<OrchestrationEvent>>,
    pub flushes: AtomicUsize,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<OrchestrationEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl OrchestrationObserver for RecordingObserver {
    fn on_event(&self, event: &OrchestrationEvent) {
        self.events.lock().unwrap().push(event.clone());
    }

    fn flush(&self) {
        self.flushes.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn fast_config() -> OrchestratorConfig {
    OrchestratorConfig {
        cycle_period_ms: 10,
        shutdown_timeout_ms: 200,
        ..Default::default()
    }
}

/// Poll until the task has a recorded result.
pub async fn wait_for_result(orch: &Orchestrator, task_id: TaskId, within: Duration) -> TaskResult {
    let start = Instant::now();
    loop {
        if let Some(result) = orch.get_result(task_id) {
            return result;
        }
        assert!(start.elapsed() < within, "task {task_id} did not complete within {within:?}");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Poll until `check` holds.
pub async fn wait_until(within: Duration, mut check: impl FnMut() -> bool) {
    let start = Instant::now();
    while !check() {
        assert!(start.elapsed() < within, "condition not met within {within:?}");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
