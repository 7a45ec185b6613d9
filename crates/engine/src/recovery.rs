// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Startup recovery for jobs interrupted by a process restart.
//!
//! Runs once before new orchestration requests are accepted. Jobs still
//! marked running past the staleness threshold can only be leftovers from
//! a previous process instance: their repository locks are released
//! best-effort, then the job and its unfinished tasks are marked failed.
//! Interrupted jobs are never replayed — only made visible to operators.

use arca_adapters::{borg, ProcessRunner};
use arca_core::{Clock, EngineConfig, JobId, JobStatus, Progress, StreamTag, TaskStatus};
use arca_storage::records::epoch_ms_to_datetime;
use arca_storage::{JobStore, StoreError};
use std::sync::Arc;
use std::time::Duration;

/// What the recovery sweep did.
#[derive(Debug, Default)]
pub struct RecoveryReport {
    /// Jobs marked failed by this sweep.
    pub recovered: Vec<JobId>,
}

/// Scan the store for stale running jobs and mark them failed.
/// Idempotent: a second run finds nothing to do.
pub async fn recover_stale_jobs<P, C>(
    store: &Arc<dyn JobStore>,
    runner: &P,
    clock: &C,
    config: &EngineConfig,
) -> Result<RecoveryReport, StoreError>
where
    P: ProcessRunner,
    C: Clock,
{
    let now_ms = clock.epoch_ms();
    let threshold_ms = config.stale_job_threshold.as_millis() as u64;
    let cutoff = epoch_ms_to_datetime(now_ms.saturating_sub(threshold_ms));

    let stale = store.find_stale_running(cutoff).await?;
    if stale.is_empty() {
        tracing::info!("no interrupted jobs found");
        return Ok(RecoveryReport::default());
    }
    tracing::info!(count = stale.len(), "recovering interrupted jobs");

    let now = epoch_ms_to_datetime(now_ms);
    let mut report = RecoveryReport::default();

    for job in stale {
        tracing::info!(
            job_id = %job.id,
            started_at = ?job.started_at,
            "marking interrupted job failed"
        );

        if let Some(repo_ref) = job.repository_ref.as_deref() {
            release_repository_lock(store, runner, config, repo_ref).await;
        }

        let mut tasks = match store.get_job_tasks(&job.id).await {
            Ok(tasks) => tasks,
            Err(e) => {
                tracing::warn!(job_id = %job.id, error = %e, "task lookup failed during recovery");
                Vec::new()
            }
        };
        let mut changed = false;
        for task in &mut tasks {
            if !task.status.is_terminal() {
                task.status = TaskStatus::Failed;
                task.completed_at = Some(now);
                task.error = Some("task interrupted by process restart".to_string());
                changed = true;
            }
        }
        if changed {
            if let Err(e) = store.save_tasks(&job.id, &tasks).await {
                tracing::warn!(job_id = %job.id, error = %e, "task recovery persist failed");
            }
        }

        let since = job
            .started_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "unknown".to_string());
        let error = format!("job interrupted by process restart (was running since {since})");
        match store
            .update_job_status(&job.id, JobStatus::Failed, None, Some(now), None, Some(error))
            .await
        {
            Ok(()) => report.recovered.push(job.id),
            Err(e) => {
                tracing::warn!(job_id = %job.id, error = %e, "job recovery persist failed");
            }
        }
    }

    tracing::info!(recovered = report.recovered.len(), "recovery complete");
    Ok(report)
}

/// Best-effort `borg break-lock`, bounded by the configured timeout so a
/// hung repository can never block startup.
async fn release_repository_lock<P: ProcessRunner>(
    store: &Arc<dyn JobStore>,
    runner: &P,
    config: &EngineConfig,
    repo_ref: &str,
) {
    let repo = match store.get_repository(repo_ref).await {
        Ok(Some(repo)) => repo,
        Ok(None) => {
            tracing::warn!(repository = repo_ref, "repository not found, skipping lock release");
            return;
        }
        Err(e) => {
            tracing::warn!(repository = repo_ref, error = %e, "repository lookup failed");
            return;
        }
    };

    tracing::info!(repository = %repo.name, "releasing repository lock");
    let command = borg::break_lock_command(&repo.path, &repo.passphrase);
    let handle = match runner.start(&command.argv, &command.env).await {
        Ok(handle) => handle,
        Err(e) => {
            tracing::warn!(repository = %repo.name, error = %e, "break-lock failed to start");
            return;
        }
    };
    let pid = handle.pid();

    let mut on_line = |_: &str, _: StreamTag, _: Option<Progress>| {};
    match tokio::time::timeout(config.lock_break_timeout, runner.monitor(handle, &mut on_line))
        .await
    {
        Ok(result) if result.exit_code == 0 => {
            tracing::info!(repository = %repo.name, "repository lock released");
        }
        Ok(result) => {
            // The lock may simply not exist; log and continue
            tracing::warn!(
                repository = %repo.name,
                exit_code = result.exit_code,
                "break-lock returned nonzero"
            );
        }
        Err(_) => {
            tracing::warn!(repository = %repo.name, "break-lock timed out, abandoning");
            runner.terminate(pid, Duration::from_secs(1)).await;
        }
    }
}

#[cfg(test)]
#[path = "recovery_tests.rs"]
mod tests;
