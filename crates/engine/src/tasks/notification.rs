// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Notification task executor.
//!
//! Decides *whether* to notify from the aggregate outcome of the tasks
//! before it, then delegates delivery to the collaborator. Missing or
//! disabled config skips; a trigger mismatch skips; only a delivery
//! problem fails. With no preceding tasks the aggregate counts as success
//! (vacuous truth) — deliberate, see the engine tests pinning it.

use super::{record_line, require_repository, TaskCtx};
use arca_adapters::{CloudSyncAdapter, NotifyAdapter, NotifyTarget, ProcessRunner};
use arca_core::{Clock, Job, NotificationParams, StreamTag, Task, TaskStatus, TaskType};

/// Aggregate success of the tasks before `task_index`: completed and
/// skipped both count as success; other notification tasks are ignored.
fn preceding_tasks_succeeded(job: &Job, task_index: usize) -> bool {
    job.tasks[..task_index.min(job.tasks.len())]
        .iter()
        .filter(|t| t.task_type != TaskType::Notification)
        .all(|t| matches!(t.status, TaskStatus::Completed | TaskStatus::Skipped))
}

pub(crate) async fn run<P, S, N, C>(
    ctx: &TaskCtx<'_, P, S, N, C>,
    job: &Job,
    task: &mut Task,
    task_index: usize,
    params: &NotificationParams,
) -> bool
where
    P: ProcessRunner,
    S: CloudSyncAdapter,
    N: NotifyAdapter,
    C: Clock,
{
    let Some(repo) = require_repository(ctx, job, task).await else {
        return false;
    };

    let Some(config_id) = params.config_id.as_deref() else {
        tracing::info!(job_id = %job.id, "no notification config referenced, skipping");
        task.mark_skipped(ctx.clock.epoch_ms());
        task.return_code = Some(0);
        return true;
    };

    let config = match ctx.store.get_notification_config(config_id).await {
        Ok(config) => config,
        Err(e) => {
            task.error = Some(format!("notification config lookup failed: {e}"));
            task.return_code = Some(1);
            return false;
        }
    };
    let Some(config) = config.filter(|c| c.enabled) else {
        tracing::info!(job_id = %job.id, config_id, "notification config missing or disabled, skipping");
        task.mark_skipped(ctx.clock.epoch_ms());
        task.return_code = Some(0);
        return true;
    };

    let job_success = preceding_tasks_succeeded(job, task_index);
    let should_notify =
        (job_success && params.notify_on_success) || (!job_success && params.notify_on_failure);
    if !should_notify {
        tracing::info!(job_id = %job.id, job_success, "trigger condition not met, skipping");
        task.mark_skipped(ctx.clock.epoch_ms());
        task.return_code = Some(0);
        return true;
    }

    let (title, message) = if job_success {
        (
            "Backup completed".to_string(),
            format!("Backup completed successfully for repository '{}'", repo.name),
        )
    } else {
        (
            "Backup failed".to_string(),
            format!("Backup failed for repository '{}'", repo.name),
        )
    };

    record_line(
        ctx,
        job,
        task,
        task_index,
        &format!("Sending notification via {}", config.provider),
        StreamTag::Stdout,
        None,
    );

    let target = NotifyTarget { provider: config.provider.clone(), target: config.target.clone() };
    match ctx.notifier.send(&target, &title, &message).await {
        Ok(status) if (200..300).contains(&status) => {
            record_line(
                ctx,
                job,
                task,
                task_index,
                &format!("Notification sent via {}", config.provider),
                StreamTag::Stdout,
                None,
            );
            task.return_code = Some(0);
            true
        }
        Ok(status) => {
            task.return_code = Some(1);
            task.error = Some(format!("notification provider returned status {status}"));
            false
        }
        Err(e) => {
            task.return_code = Some(1);
            task.error = Some(e.to_string());
            false
        }
    }
}

#[cfg(test)]
#[path = "notification_tests.rs"]
mod tests;
