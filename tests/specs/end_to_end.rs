// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Full-pipeline specs: create a composite job, watch it run to a
//! terminal state, and check every observation surface agrees.

use crate::prelude::*;

#[tokio::test]
async fn composite_backup_pipeline_end_to_end() {
    let spec = spec();
    spec.runner.script(
        ScriptedCommand::new(&["borg", "create"]).line("Archive created").exit_code(0),
    );

    let mut events = spec.orchestrator.subscribe();
    let job_id = spec
        .orchestrator
        .create_composite_job(vec![backup_def("/data")], "repo-1", None)
        .await
        .expect("job created");

    let job = wait_terminal(&spec.orchestrator, &job_id).await;

    // In-memory state
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.tasks[0].status, TaskStatus::Completed);
    assert!(job.tasks[0].output_lines.iter().any(|l| l.text == "Archive created"));

    // Event feed saw the full lifecycle for this job
    let mut tags = Vec::new();
    for _ in 0..20 {
        match events.next().await {
            Some(Event::Keepalive { .. }) | None => break,
            Some(event) => {
                if event.job_id() == Some(&job_id) {
                    let value = serde_json::to_value(&event).expect("event serializes");
                    tags.push(value["type"].as_str().unwrap_or("").to_string());
                    if value["type"] == "job:completed" {
                        break;
                    }
                }
            }
        }
    }
    assert_eq!(tags, vec!["job:started", "task:started", "task:output", "task:completed", "job:completed"]);

    // Durable record round-trips the output blob
    let record = spec.store.get_job(&job_id).await.expect("store read").expect("record");
    assert_eq!(record.status, JobStatus::Completed);
    let tasks = spec.store.get_job_tasks(&job_id).await.expect("store read");
    assert_eq!(tasks[0].output, "Archive created");
}

#[tokio::test]
async fn backup_failure_skips_all_remaining_tasks() {
    let spec = spec();
    spec.store.insert_notification_config(NotificationConfig {
        id: "nc-1".to_string(),
        provider: "pushover".to_string(),
        enabled: true,
        target: "user-key".to_string(),
    });
    spec.runner.script(
        ScriptedCommand::new(&["borg", "create"]).line("error: disk full").exit_code(2),
    );

    let notify = TaskDefinition {
        name: "notify".to_string(),
        parameters: TaskParameters::Notification(arca_core::NotificationParams {
            config_id: Some("nc-1".to_string()),
            notify_on_success: true,
            notify_on_failure: true,
        }),
    };
    let prune = TaskDefinition {
        name: "prune".to_string(),
        parameters: TaskParameters::Prune(PruneParams::default()),
    };

    let job_id = spec
        .orchestrator
        .create_composite_job(vec![backup_def("/data"), prune, notify], "repo-1", None)
        .await
        .expect("job created");

    let job = wait_terminal(&spec.orchestrator, &job_id).await;
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.tasks[0].status, TaskStatus::Failed);
    // Critical rule: a failed backup aborts everything after it
    assert_eq!(job.tasks[1].status, TaskStatus::Skipped);
    assert_eq!(job.tasks[2].status, TaskStatus::Skipped);
    assert_eq!(spec.notifier.call_count(), 0);

    // Only the backup command ever ran
    assert_eq!(spec.runner.started_commands().len(), 1);
}

#[tokio::test]
async fn simple_command_end_to_end() {
    let spec = spec();
    spec.runner.script(
        ScriptedCommand::new(&["borg", "list"]).line("archive-2026-08-07").exit_code(0),
    );

    let job_id = spec
        .orchestrator
        .start_command(
            vec!["borg".to_string(), "list".to_string(), "/repo".to_string()],
            HashMap::new(),
            false,
        )
        .await
        .expect("command started");

    let job = wait_terminal(&spec.orchestrator, &job_id).await;
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.return_code, Some(0));

    let mut follower = spec.orchestrator.follow_output(&job_id).expect("follower");
    let line = follower.next().await.expect("one line");
    assert_eq!(line.text, "archive-2026-08-07");
    assert!(follower.next().await.is_none());
}

#[tokio::test]
async fn recovery_after_simulated_restart() {
    // First process instance: store shared, job left mid-flight
    let spec = spec();
    let store_dyn: Arc<dyn JobStore> = Arc::new(spec.store.clone());

    // A backup long enough that it never finishes within this test
    let mut endless = ScriptedCommand::new(&["borg", "create"]).exit_code(0);
    endless.lines = vec!["working".to_string(); 10_000];
    endless.line_delay = Duration::from_millis(20);
    spec.runner.script(endless);

    let job_id = spec
        .orchestrator
        .create_composite_job(vec![backup_def("/data")], "repo-1", None)
        .await
        .expect("job created");

    // Wait until the running status hit the durable store, then "crash"
    // by abandoning the first engine.
    let mut persisted_running = false;
    for _ in 0..200 {
        let status = spec.store.get_job(&job_id).await.expect("read").map(|j| j.status);
        if status == Some(JobStatus::Running) {
            persisted_running = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(persisted_running, "running status never persisted");
    drop(spec.orchestrator);

    // Second process instance, well past the staleness threshold
    let clock = FakeClock::new();
    clock.advance(Duration::from_secs(600));
    let fresh_runner = ScriptedProcessRunner::new();
    let report = arca_engine::recover_stale_jobs(
        &store_dyn,
        &fresh_runner,
        &clock,
        &EngineConfig::default(),
    )
    .await
    .expect("recovery ran");

    assert_eq!(report.recovered, vec![job_id.clone()]);
    let record = spec.store.get_job(&job_id).await.expect("read").expect("record");
    assert_eq!(record.status, JobStatus::Failed);
    assert!(record.error_message.is_some());

    let tasks = spec.store.get_job_tasks(&job_id).await.expect("read");
    assert_eq!(tasks[0].status, TaskStatus::Failed);
}
