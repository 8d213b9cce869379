//! The orchestration engine: admission, dispatch and completion bookkeeping.
//!
//! Split into focused submodules:
//! - `core`: Orchestrator struct, shared book, registration and status queries
//! - `dispatch`: the dispatch loop and a single dispatch pass
//! - `deadline`: the deadline sweep run on every cycle
//! - `execution`: launching executions, recording completions, shutdown

mod core;
mod deadline;
mod dispatch;
mod execution;

pub use self::core::Orchestrator;
