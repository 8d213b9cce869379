mod common;

use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use matrix_core::{OrchestratorError, Priority, Task, DEADLINE_EXCEEDED};
use matrix_orchestrator::{Orchestrator, TaskStatus};

use common::{MockWorker, Outcome, fast_config, wait_for_result, wait_until};

#[tokio::test]
async fn executes_in_priority_order() {
    let orch = Orchestrator::new(fast_config());
    let worker = MockWorker::new("solo", &["general"]).build();
    orch.register_worker(worker.clone());

    let low = orch
        .submit_task(Task::new("low", ["general"]).with_priority(Priority::Low))
        .await
        .unwrap();
    orch.submit_task(Task::new("critical", ["general"]).with_priority(Priority::Critical))
        .await
        .unwrap();
    orch.submit_task(Task::new("medium", ["general"]).with_priority(Priority::Medium))
        .await
        .unwrap();

    wait_for_result(&orch, low, Duration::from_secs(2)).await;
    assert_eq!(worker.executed(), vec!["critical", "medium", "low"]);
}

#[tokio::test]
async fn worker_never_runs_two_tasks_at_once() {
    let orch = Orchestrator::new(fast_config());
    let worker = MockWorker::new("solo", &["general"])
        .delay(Duration::from_millis(15))
        .build();
    orch.register_worker(worker.clone());

    let mut ids = Vec::new();
    for i in 0..5 {
        ids.push(orch.submit_task(Task::new(format!("t{i}"), ["general"])).await.unwrap());
    }
    for id in ids {
        assert!(wait_for_result(&orch, id, Duration::from_secs(3)).await.success);
    }

    assert_eq!(worker.executed().len(), 5);
    assert_eq!(worker.max_running.load(Ordering::SeqCst), 1);
    let status = orch.get_orchestration_status();
    assert_eq!(status.metrics.worker_utilization["solo"], 5);
}

#[tokio::test]
async fn separate_workers_run_concurrently() {
    let orch = Orchestrator::new(fast_config());
    let a = MockWorker::new("a", &["general"]).delay(Duration::from_millis(100)).build();
    let b = MockWorker::new("b", &["general"]).delay(Duration::from_millis(100)).build();
    orch.register_worker(a.clone());
    orch.register_worker(b.clone());

    let t1 = orch.submit_task(Task::new("t1", ["general"])).await.unwrap();
    let t2 = orch.submit_task(Task::new("t2", ["general"])).await.unwrap();

    wait_until(Duration::from_secs(1), || {
        orch.get_orchestration_status().in_flight_count == 2
    })
    .await;

    wait_for_result(&orch, t1, Duration::from_secs(2)).await;
    wait_for_result(&orch, t2, Duration::from_secs(2)).await;
    assert_eq!(a.executed().len(), 1);
    assert_eq!(b.executed().len(), 1);
}

#[tokio::test]
async fn unmatched_task_stays_queued() {
    let orch = Orchestrator::new(fast_config());
    orch.register_worker(MockWorker::new("voice", &["speech_to_text"]).build());

    let id = orch.submit_task(Task::new("paint", ["image_generation"])).await.unwrap();
    tokio::time::sleep(Duration::from_millis(60)).await;

    assert!(matches!(orch.get_task_status(id), TaskStatus::Queued { position: 0 }));
    let status = orch.get_orchestration_status();
    assert!(status.running);
    assert_eq!(status.queued_count, 1);
    assert_eq!(status.metrics.total_tasks, 1);
}

#[tokio::test]
async fn higher_fitness_worker_is_preferred() {
    let orch = Orchestrator::new(fast_config());
    let weak = MockWorker::new("weak", &["general"]).fitness(0.4).build();
    let strong = MockWorker::new("strong", &["general"]).fitness(0.95).build();
    orch.register_worker(weak.clone());
    orch.register_worker(strong.clone());

    let id = orch.submit_task(Task::new("job", ["general"])).await.unwrap();
    let result = wait_for_result(&orch, id, Duration::from_secs(1)).await;

    assert_eq!(result.worker_id, "strong");
    assert!(weak.executed().is_empty());
}

#[tokio::test]
async fn deadline_expires_before_slow_worker_finishes() {
    let orch = Orchestrator::new(fast_config());
    let worker = MockWorker::new("slow", &["general"])
        .delay(Duration::from_millis(500))
        .build();
    orch.register_worker(worker.clone());

    let started = Instant::now();
    let id = orch
        .submit_task(Task::new("hurry", ["general"]).with_deadline_in(Duration::from_millis(50)))
        .await
        .unwrap();

    let result = wait_for_result(&orch, id, Duration::from_secs(1)).await;
    assert!(started.elapsed() < Duration::from_millis(450));
    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some(DEADLINE_EXCEEDED));
    assert_eq!(result.worker_id, "orchestrator");
    assert_eq!(result.metadata["timeout"], true);

    match orch.get_task_status(id) {
        TaskStatus::Completed(summary) => {
            assert!(!summary.success);
            assert_eq!(summary.error.as_deref(), Some(DEADLINE_EXCEEDED));
        }
        other => panic!("expected completed, got {other:?}"),
    }

    // Let the worker finish; its result must not replace the timeout.
    let handle = orch.clone();
    wait_until(Duration::from_secs(2), || {
        handle.get_orchestration_status().worker_statuses[0].performance.tasks_completed == 1
    })
    .await;

    let after = orch.get_result(id).unwrap();
    assert!(after.is_timeout());
    let status = orch.get_orchestration_status();
    assert_eq!(status.metrics.failed_tasks, 1);
    assert_eq!(status.metrics.successful_tasks, 0);
    assert_eq!(status.completed_count, 1);
}

#[tokio::test]
async fn worker_error_becomes_failed_result() {
    let orch = Orchestrator::new(fast_config());
    orch.register_worker(MockWorker::new("grumpy", &["general"]).outcome(Outcome::Fail).build());

    let id = orch.submit_task(Task::new("ask", ["general"])).await.unwrap();
    let result = wait_for_result(&orch, id, Duration::from_secs(1)).await;

    assert!(!result.success);
    assert!(result.output.is_none());
    assert_eq!(result.error.as_deref(), Some("execution failed: grumpy refused"));

    let status = orch.get_orchestration_status();
    assert_eq!(status.worker_statuses[0].performance.success_rate, 0.0);
    assert_eq!(status.metrics.failed_tasks, 1);
}

#[tokio::test]
async fn panicking_worker_is_contained() {
    let orch = Orchestrator::new(fast_config());
    let worker = MockWorker::new("volatile", &["general"])
        .outcome(Outcome::PanicOnExplode)
        .build();
    orch.register_worker(worker.clone());

    let boom = orch
        .submit_task(
            Task::new("boom", ["general"])
                .with_priority(Priority::High)
                .with_input(serde_json::json!({"explode": true})),
        )
        .await
        .unwrap();
    let calm = orch.submit_task(Task::new("calm", ["general"])).await.unwrap();

    let failed = wait_for_result(&orch, boom, Duration::from_secs(1)).await;
    assert!(!failed.success);
    assert!(failed.error.as_deref().unwrap().starts_with("worker panicked"));
    assert_eq!(failed.metadata["orchestration_error"], true);

    // Same worker, back to Idle, keeps serving.
    let ok = wait_for_result(&orch, calm, Duration::from_secs(1)).await;
    assert!(ok.success);
    assert_eq!(ok.output, Some(serde_json::json!("survived")));
    assert_eq!(worker.executed(), vec!["boom", "calm"]);
}

#[tokio::test]
async fn task_status_walks_through_stages() {
    let orch = Orchestrator::new(fast_config());
    let worker = MockWorker::new("w", &["general"])
        .delay(Duration::from_millis(80))
        .build();

    let id = orch.submit_task(Task::new("staged", ["general"])).await.unwrap();
    assert!(matches!(orch.get_task_status(id), TaskStatus::Queued { position: 0 }));

    orch.register_worker(worker);
    wait_until(Duration::from_secs(1), || {
        matches!(orch.get_task_status(id), TaskStatus::InFlight { .. })
    })
    .await;
    match orch.get_task_status(id) {
        TaskStatus::InFlight { task, worker_id, .. } => {
            assert_eq!(task.description, "staged");
            assert_eq!(worker_id, "w");
        }
        other => panic!("expected in flight, got {other:?}"),
    }

    let result = wait_for_result(&orch, id, Duration::from_secs(1)).await;
    assert!(result.success);
    assert!(result.execution_time >= 0.07);
    assert!(orch.get_task_status(id).is_completed());
    assert!(matches!(
        orch.get_task_status(uuid::Uuid::new_v4()),
        TaskStatus::NotFound
    ));
}

#[tokio::test]
async fn duplicate_submission_is_rejected() {
    let orch = Orchestrator::new(fast_config());
    orch.register_worker(MockWorker::new("w", &["general"]).build());

    let task = Task::new("once", ["general"]);
    let again = task.clone();
    let id = orch.submit_task(task).await.unwrap();

    assert!(matches!(
        orch.submit_task(again.clone()).await,
        Err(OrchestratorError::DuplicateTask(dup)) if dup == id
    ));

    wait_for_result(&orch, id, Duration::from_secs(1)).await;
    assert!(matches!(
        orch.submit_task(again).await,
        Err(OrchestratorError::DuplicateTask(_))
    ));
    assert_eq!(orch.get_orchestration_status().metrics.total_tasks, 1);
}

#[tokio::test]
async fn metrics_summarize_completions() {
    let orch = Orchestrator::new(fast_config());
    orch.register_worker(MockWorker::new("good", &["general"]).build());
    orch.register_worker(MockWorker::new("bad", &["risky"]).outcome(Outcome::Fail).build());

    let a = orch.submit_task(Task::new("a", ["general"])).await.unwrap();
    let b = orch.submit_task(Task::new("b", ["general"])).await.unwrap();
    let c = orch.submit_task(Task::new("c", ["risky"])).await.unwrap();
    for id in [a, b, c] {
        wait_for_result(&orch, id, Duration::from_secs(2)).await;
    }

    let status = orch.get_orchestration_status();
    assert_eq!(status.metrics.total_tasks, 3);
    assert_eq!(status.metrics.successful_tasks, 2);
    assert_eq!(status.metrics.failed_tasks, 1);
    assert!((status.metrics.success_ratio() - 2.0 / 3.0).abs() < 1e-9);
    assert!(status.metrics.average_completion_time > 0.0);
    assert!(status.is_settled());
    let utilization: Vec<_> = status.metrics.worker_utilization.iter().collect();
    assert_eq!(utilization, vec![(&"good".to_string(), &2), (&"bad".to_string(), &1)]);

    let json = serde_json::to_value(&status).unwrap();
    assert_eq!(json["metrics"]["total_tasks"], 3);
    assert_eq!(json["worker_statuses"][1]["worker_id"], "bad");
}
