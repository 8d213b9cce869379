mod cli;
mod tasks;

use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::{info, warn};

use matrix_core::{OrchestratorConfig, TaskId, load_dotenv};
use matrix_orchestrator::Orchestrator;
use matrix_workers::builtin_workers;

use crate::cli::CliArgs;

#[tokio::main]
async fn main() -> Result<()> {
    load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();

    let config = match &args.config {
        Some(path) => OrchestratorConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => OrchestratorConfig::from_env().context("invalid orchestrator configuration")?,
    };
    config.log_summary();

    let specs = match &args.tasks {
        Some(path) => tasks::load_specs(path)?,
        None => {
            info!("No --tasks file given, running the demo set");
            tasks::demo_specs()
        }
    };
    if specs.is_empty() {
        bail!("no tasks to run");
    }

    let orchestrator = Orchestrator::try_new(config)?;
    for worker in builtin_workers(Duration::from_millis(args.worker_delay_ms)) {
        orchestrator.register_worker(worker);
    }

    let mut task_ids: Vec<TaskId> = Vec::with_capacity(specs.len());
    for spec in specs {
        let task = spec.into_task()?;
        task_ids.push(orchestrator.submit_task(task).await?);
    }
    info!("Submitted {} tasks", task_ids.len());

    let deadline = Instant::now() + Duration::from_secs(args.timeout_secs);
    let poll = Duration::from_millis(args.poll_ms.max(1));
    loop {
        let pending = task_ids
            .iter()
            .filter(|id| !orchestrator.get_task_status(**id).is_completed())
            .count();
        if pending == 0 {
            break;
        }
        if Instant::now() >= deadline {
            warn!(pending, "Timed out waiting for tasks");
            break;
        }
        tokio::time::sleep(poll).await;
    }

    orchestrator.shutdown().await;

    let results: Vec<_> = task_ids
        .iter()
        .map(|id| {
            serde_json::json!({
                "task_id": id,
                "status": orchestrator.get_task_status(*id),
            })
        })
        .collect();
    let status = orchestrator.get_orchestration_status();
    if !status.is_settled() {
        warn!(
            queued = status.queued_count,
            in_flight = status.in_flight_count,
            "Orchestrator stopped with unfinished work"
        );
    }
    let report = serde_json::json!({
        "results": results,
        "success_ratio": status.metrics.success_ratio(),
        "orchestration": status,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
