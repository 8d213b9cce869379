use std::path::PathBuf;

use clap::Parser;

/// Run a batch of tasks through the orchestrator.
///
/// Registers the built-in voice and vision workers, submits the tasks from
/// `--tasks` (or a small demo set), waits for every task to finish and prints
/// the results and final orchestration status as JSON.
#[derive(Parser, Debug)]
#[command(name = "matrix", about = "Multi-worker task orchestrator")]
pub struct CliArgs {
    /// Orchestrator config file (TOML). Defaults plus MATRIX_* env vars when unset.
    #[arg(long, env = "MATRIX_CONFIG")]
    pub config: Option<PathBuf>,

    /// JSON file holding an array of task specs. Runs the demo set when unset.
    #[arg(long)]
    pub tasks: Option<PathBuf>,

    /// How often to poll for completion, in milliseconds
    #[arg(long, default_value = "50")]
    pub poll_ms: u64,

    /// Give up waiting after this many seconds
    #[arg(long, default_value = "30")]
    pub timeout_secs: u64,

    /// Simulated processing time of the built-in workers, in milliseconds
    #[arg(long, env = "MATRIX_WORKER_DELAY_MS", default_value = "250")]
    pub worker_delay_ms: u64,
}
