//! Worker selection.
//!
//! Every idle worker with a positive fitness for the task is scored and the
//! highest score wins. The score blends how well the worker fits the task with
//! how reliably it has performed and how loaded it currently is.

use std::sync::Arc;

use serde::Serialize;

use matrix_core::Task;

use crate::registry::WorkerHandle;

pub const FITNESS_WEIGHT: f64 = 0.5;
pub const SUCCESS_RATE_WEIGHT: f64 = 0.3;
pub const AVAILABILITY_WEIGHT: f64 = 0.2;

/// `0.5·fitness + 0.3·success_rate + 0.2·(1 − load)`.
pub fn composite_score(fitness: f64, success_rate: f64, load_factor: f64) -> f64 {
    FITNESS_WEIGHT * fitness
        + SUCCESS_RATE_WEIGHT * success_rate
        + AVAILABILITY_WEIGHT * (1.0 - load_factor)
}

/// A scored, eligible worker.
#[derive(Debug, Clone, Serialize)]
pub struct Candidate {
    pub worker_id: String,
    pub fitness: f64,
    pub success_rate: f64,
    pub load_factor: f64,
    pub score: f64,
}

/// Score every eligible worker for `task`, in registration order.
pub fn score_candidates(task: &Task, workers: &[Arc<WorkerHandle>]) -> Vec<Candidate> {
    workers
        .iter()
        .filter(|w| w.state().is_selectable())
        .filter_map(|w| {
            let fitness = w.fitness(task);
            if fitness <= 0.0 {
                return None;
            }
            let success_rate = w.success_rate();
            let load_factor = w.load_factor();
            Some(Candidate {
                worker_id: w.id().to_string(),
                fitness,
                success_rate,
                load_factor,
                score: composite_score(fitness, success_rate, load_factor),
            })
        })
        .collect()
}

/// Pick the best worker for `task`, or `None` if nobody is eligible.
///
/// Ties keep the earliest-registered worker.
pub fn select(task: &Task, workers: &[Arc<WorkerHandle>]) -> Option<Arc<WorkerHandle>> {
    select_scored(task, workers).map(|(worker, _)| worker)
}

/// Like [`select`], also returning the winning score.
pub fn select_scored(task: &Task, workers: &[Arc<WorkerHandle>]) -> Option<(Arc<WorkerHandle>, f64)> {
    let mut best: Option<(f64, &Arc<WorkerHandle>)> = None;
    for worker in workers {
        if !worker.state().is_selectable() {
            continue;
        }
        let fitness = worker.fitness(task);
        if fitness <= 0.0 {
            continue;
        }
        let score = composite_score(fitness, worker.success_rate(), worker.load_factor());
        match best {
            Some((top, _)) if score <= top => {}
            _ => best = Some((score, worker)),
        }
    }
    best.map(|(score, w)| (Arc::clone(w), score))
}
