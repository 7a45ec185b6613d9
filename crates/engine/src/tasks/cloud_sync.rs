// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cloud replication task executor.
//!
//! A missing or disabled destination config skips the task: skipping is
//! not failure.

use super::{record_line, require_repository, TaskCtx};
use arca_adapters::{CloudSyncAdapter, NotifyAdapter, ProcessRunner, SyncRequest};
use arca_core::{Clock, CloudSyncParams, Job, StreamTag, Task};

pub(crate) async fn run<P, S, N, C>(
    ctx: &TaskCtx<'_, P, S, N, C>,
    job: &Job,
    task: &mut Task,
    task_index: usize,
    params: &CloudSyncParams,
) -> bool
where
    P: ProcessRunner,
    S: CloudSyncAdapter,
    N: NotifyAdapter,
    C: Clock,
{
    let config_id = params
        .config_id
        .clone()
        .or_else(|| job.cloud_sync_config_ref.clone());
    let Some(config_id) = config_id else {
        tracing::info!(job_id = %job.id, "no cloud sync config referenced, skipping");
        task.mark_skipped(ctx.clock.epoch_ms());
        task.return_code = Some(0);
        return true;
    };

    let config = match ctx.store.get_cloud_sync_config(&config_id).await {
        Ok(config) => config,
        Err(e) => {
            task.error = Some(format!("cloud sync config lookup failed: {e}"));
            task.return_code = Some(1);
            return false;
        }
    };
    let Some(config) = config.filter(|c| c.enabled) else {
        tracing::info!(job_id = %job.id, %config_id, "cloud sync config missing or disabled, skipping");
        task.mark_skipped(ctx.clock.epoch_ms());
        task.return_code = Some(0);
        return true;
    };

    let Some(repo) = require_repository(ctx, job, task).await else {
        return false;
    };

    let request = SyncRequest {
        config_id: config.id.clone(),
        source_path: repo.path.clone(),
        destination: config.destination.clone(),
    };

    record_line(
        ctx,
        job,
        task,
        task_index,
        &format!("Syncing repository '{}' to {}", repo.name, config.name),
        StreamTag::Stdout,
        None,
    );

    let outcome = {
        let mut on_progress = |line: &str| {
            record_line(ctx, job, task, task_index, line, StreamTag::Stdout, None);
        };
        ctx.cloud.sync(&request, &mut on_progress).await
    };

    match outcome {
        Ok(outcome) if outcome.success => {
            if let Some(stats) = outcome.stats {
                record_line(
                    ctx,
                    job,
                    task,
                    task_index,
                    &format!(
                        "Sync complete: {} files, {} bytes transferred",
                        stats.files_transferred, stats.bytes_transferred
                    ),
                    StreamTag::Stdout,
                    None,
                );
            }
            task.return_code = Some(0);
            true
        }
        Ok(outcome) => {
            task.return_code = Some(1);
            task.error =
                Some(outcome.error.unwrap_or_else(|| "cloud sync failed".to_string()));
            false
        }
        Err(e) => {
            task.return_code = Some(-1);
            task.error = Some(e.to_string());
            false
        }
    }
}
