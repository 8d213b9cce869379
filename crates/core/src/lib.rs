pub mod capability;
pub mod config;
pub mod error;
pub mod result;
pub mod task;
pub mod worker;

pub use capability::{Capability, ResourceRequirements, ResourceTier, clamp_unit, matching_confidence};
pub use config::{OrchestratorConfig, load_dotenv};
pub use error::*;
pub use result::{DEADLINE_EXCEEDED, EXECUTION_ABORTED, TaskResult};
pub use task::{Priority, Task, TaskId};
pub use worker::{PerformanceMetrics, WorkOutput, Worker, WorkerKind, WorkerState, WorkerStatus};
