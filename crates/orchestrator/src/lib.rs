//! Priority-driven task orchestration over a pool of capability-declaring
//! workers.
//!
//! Tasks are admitted through [`Orchestrator::submit_task`], queued in
//! priority/deadline order, matched to the best idle worker on every dispatch
//! cycle and executed concurrently. Results, deadline expiries and metrics are
//! recorded in one place and exposed through status snapshots.

pub mod engine;
pub mod metrics;
pub mod observer;
pub mod queue;
pub mod registry;
pub mod selector;
pub mod status;

pub use engine::Orchestrator;
pub use metrics::OrchestrationMetrics;
pub use observer::{OrchestrationEvent, OrchestrationObserver, TracingObserver};
pub use queue::{TaskQueue, dispatch_order};
pub use registry::WorkerHandle;
pub use selector::{Candidate, composite_score, score_candidates, select};
pub use status::{OrchestrationStatus, ResultSummary, TaskStatus};
