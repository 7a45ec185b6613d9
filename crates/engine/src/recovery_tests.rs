// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use arca_adapters::ScriptedProcessRunner;
use arca_core::{FakeClock, Job, JobBuilder, Task, TaskParameters};
use arca_storage::records::epoch_ms_to_datetime;
use arca_storage::{JobRecord, MemoryStore, RepositoryData, TaskRecord};

const HOUR_MS: u64 = 3_600_000;

fn store_with_repo() -> Arc<dyn JobStore> {
    let memory = MemoryStore::new();
    memory.insert_repository(RepositoryData {
        id: "repo-1".to_string(),
        name: "photos".to_string(),
        path: "/repo".to_string(),
        passphrase: "secret".to_string(),
    });
    Arc::new(memory)
}

fn stale_job(id: &str, started_ms: u64) -> Job {
    let mut job = JobBuilder::default()
        .id(JobId::from_string(id))
        .repository_ref("repo-1")
        .tasks(vec![Task::new(
            "create archive",
            TaskParameters::Backup(arca_core::BackupParams {
                source_path: "/data".to_string(),
                compression: "zstd".to_string(),
                excludes: Vec::new(),
                dry_run: false,
            }),
        )])
        .build();
    job.mark_running(started_ms);
    job
}

async fn seed_running_job(store: &Arc<dyn JobStore>, job: &Job) {
    store.create_job(JobRecord::from_job(job)).await.unwrap();
    let records: Vec<TaskRecord> = job
        .tasks
        .iter()
        .enumerate()
        .map(|(i, t)| TaskRecord::from_task(&job.id, i, t))
        .collect();
    store.save_tasks(&job.id, &records).await.unwrap();
}

fn clock_at(epoch_ms: u64) -> FakeClock {
    let clock = FakeClock::new();
    clock.set_epoch_ms(epoch_ms);
    clock
}

#[tokio::test]
async fn stale_job_and_tasks_are_marked_failed() {
    let store = store_with_repo();
    let runner = ScriptedProcessRunner::new();
    let clock = clock_at(2 * HOUR_MS);
    let config = EngineConfig::default();

    let job = stale_job("job-stale", HOUR_MS);
    seed_running_job(&store, &job).await;

    let report = recover_stale_jobs(&store, &runner, &clock, &config).await.unwrap();
    assert_eq!(report.recovered, vec![job.id.clone()]);

    let record = store.get_job(&job.id).await.unwrap().unwrap();
    assert_eq!(record.status, JobStatus::Failed);
    assert!(record.error_message.as_deref().unwrap().contains("interrupted"));
    assert!(record.finished_at.is_some());

    let tasks = store.get_job_tasks(&job.id).await.unwrap();
    assert_eq!(tasks[0].status, TaskStatus::Failed);
    assert!(tasks[0].error.as_deref().unwrap().contains("interrupted"));
}

#[tokio::test]
async fn recovery_is_idempotent() {
    let store = store_with_repo();
    let runner = ScriptedProcessRunner::new();
    let clock = clock_at(2 * HOUR_MS);
    let config = EngineConfig::default();

    seed_running_job(&store, &stale_job("job-stale", HOUR_MS)).await;

    let first = recover_stale_jobs(&store, &runner, &clock, &config).await.unwrap();
    assert_eq!(first.recovered.len(), 1);

    let second = recover_stale_jobs(&store, &runner, &clock, &config).await.unwrap();
    assert!(second.recovered.is_empty());
}

#[tokio::test]
async fn fresh_running_jobs_are_left_alone() {
    let store = store_with_repo();
    let runner = ScriptedProcessRunner::new();
    let config = EngineConfig::default();

    // Started 1 minute before "now"; threshold is 5 minutes
    let now_ms = 2 * HOUR_MS;
    let job = stale_job("job-fresh", now_ms - 60_000);
    seed_running_job(&store, &job).await;

    let report =
        recover_stale_jobs(&store, &runner, &clock_at(now_ms), &config).await.unwrap();
    assert!(report.recovered.is_empty());

    let record = store.get_job(&job.id).await.unwrap().unwrap();
    assert_eq!(record.status, JobStatus::Running);
}

#[tokio::test]
async fn repository_lock_is_released_for_backup_jobs() {
    let store = store_with_repo();
    let runner = ScriptedProcessRunner::new();
    let clock = clock_at(2 * HOUR_MS);
    let config = EngineConfig::default();

    seed_running_job(&store, &stale_job("job-stale", HOUR_MS)).await;
    recover_stale_jobs(&store, &runner, &clock, &config).await.unwrap();

    let commands = runner.started_commands();
    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0][..2], ["borg".to_string(), "break-lock".to_string()]);
    assert_eq!(runner.env_of(0).unwrap().get("BORG_PASSPHRASE").map(String::as_str), Some("secret"));
}

#[tokio::test]
async fn missing_repository_still_fails_the_job() {
    let store: Arc<dyn JobStore> = Arc::new(MemoryStore::new());
    let runner = ScriptedProcessRunner::new();
    let clock = clock_at(2 * HOUR_MS);
    let config = EngineConfig::default();

    seed_running_job(&store, &stale_job("job-stale", HOUR_MS)).await;
    let report = recover_stale_jobs(&store, &runner, &clock, &config).await.unwrap();

    assert_eq!(report.recovered.len(), 1);
    // No break-lock attempted without a repository row
    assert!(runner.started_commands().is_empty());
    let record = store.get_job(&JobId::from_string("job-stale")).await.unwrap().unwrap();
    assert_eq!(record.status, JobStatus::Failed);
}

#[tokio::test]
async fn jobs_without_started_at_are_not_stale() {
    let store = store_with_repo();
    let runner = ScriptedProcessRunner::new();
    let config = EngineConfig::default();

    let mut record = JobRecord::from_job(&stale_job("job-odd", HOUR_MS));
    record.status = JobStatus::Running;
    record.started_at = None;
    store.create_job(record).await.unwrap();

    let report = recover_stale_jobs(&store, &runner, &clock_at(2 * HOUR_MS), &config)
        .await
        .unwrap();
    assert!(report.recovered.is_empty());
}

#[test]
fn cutoff_math_uses_the_threshold() {
    let clock = clock_at(10 * HOUR_MS);
    let config = EngineConfig::default();
    let threshold_ms = config.stale_job_threshold.as_millis() as u64;
    let cutoff = epoch_ms_to_datetime(clock.epoch_ms() - threshold_ms);
    assert_eq!(cutoff.timestamp_millis() as u64, 10 * HOUR_MS - 300_000);
}
