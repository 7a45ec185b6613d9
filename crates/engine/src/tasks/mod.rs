// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task executors: one module per task type.
//!
//! Common contract: `run` mutates the task in place (status, return code,
//! error, output) and reports success as a bool. Expected failure modes
//! (non-zero exit, missing repository, misconfiguration) never panic and
//! never propagate — they land in `task.error`.

mod backup;
mod check;
mod cloud_sync;
mod notification;
mod prune;

use crate::broadcaster::EventBroadcaster;
use crate::orchestrator::ActiveJob;
use crate::output::OutputStore;
use arca_adapters::borg::BorgCommand;
use arca_adapters::{borg, CloudSyncAdapter, NotifyAdapter, ProcessRunner};
use arca_core::{
    Clock, EngineConfig, Event, Job, JobId, OutputLine, Progress, StreamTag, Task,
    TaskParameters,
};
use arca_storage::{JobStore, RepositoryData};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Borrowed view of the engine's dependencies handed to executors.
pub(crate) struct TaskCtx<'a, P, S, N, C: Clock> {
    pub config: &'a EngineConfig,
    pub clock: &'a C,
    pub runner: &'a P,
    pub cloud: &'a S,
    pub notifier: &'a N,
    pub store: &'a Arc<dyn JobStore>,
    pub output: &'a OutputStore,
    pub broadcaster: &'a EventBroadcaster<C>,
    pub active: &'a Mutex<HashMap<JobId, ActiveJob>>,
}

/// Dispatch a task to its executor by parameter variant.
pub(crate) async fn run_task<P, S, N, C>(
    ctx: &TaskCtx<'_, P, S, N, C>,
    job: &Job,
    task: &mut Task,
    task_index: usize,
) -> bool
where
    P: ProcessRunner,
    S: CloudSyncAdapter,
    N: NotifyAdapter,
    C: Clock,
{
    let params = task.parameters.clone();
    match params {
        TaskParameters::Backup(p) => backup::run(ctx, job, task, task_index, &p).await,
        TaskParameters::Prune(p) => prune::run(ctx, job, task, task_index, &p).await,
        TaskParameters::Check(p) => check::run(ctx, job, task, task_index, &p).await,
        TaskParameters::CloudSync(p) => cloud_sync::run(ctx, job, task, task_index, &p).await,
        TaskParameters::Notification(p) => {
            notification::run(ctx, job, task, task_index, &p).await
        }
    }
}

/// Record one output line everywhere it is observed: the task's own
/// buffer, the job's output store, and the event stream.
pub(crate) fn record_line<P, S, N, C: Clock>(
    ctx: &TaskCtx<'_, P, S, N, C>,
    job: &Job,
    task: &mut Task,
    task_index: usize,
    text: &str,
    stream: StreamTag,
    progress: Option<Progress>,
) {
    let epoch_ms = ctx.clock.epoch_ms();
    let line = OutputLine { epoch_ms, text: text.to_string(), stream };
    task.push_output(line.clone(), ctx.config.max_output_lines_per_job);
    ctx.output.append(&job.id, line, progress.as_ref());
    ctx.broadcaster.broadcast(Event::TaskOutput {
        job_id: job.id.clone(),
        task_index: Some(task_index),
        epoch_ms,
        line: text.to_string(),
    });
    if progress.as_ref().map(|p| !p.is_empty()).unwrap_or(false) {
        let snapshot = ctx.output.progress(&job.id).unwrap_or_default();
        ctx.broadcaster.broadcast(Event::JobProgress {
            job_id: job.id.clone(),
            epoch_ms,
            progress: snapshot,
        });
    }
}

/// Resolve the job's repository, recording a task failure when absent.
pub(crate) async fn require_repository<P, S, N, C: Clock>(
    ctx: &TaskCtx<'_, P, S, N, C>,
    job: &Job,
    task: &mut Task,
) -> Option<RepositoryData> {
    let Some(repo_ref) = job.repository_ref.as_deref() else {
        task.error = Some("no repository configured for job".to_string());
        task.return_code = Some(1);
        return None;
    };
    match ctx.store.get_repository(repo_ref).await {
        Ok(Some(repo)) => Some(repo),
        Ok(None) => {
            task.error = Some(format!("repository not found: {repo_ref}"));
            task.return_code = Some(1);
            None
        }
        Err(e) => {
            task.error = Some(format!("repository lookup failed: {e}"));
            task.return_code = Some(1);
            None
        }
    }
}

fn set_active_pid<P, S, N, C: Clock>(ctx: &TaskCtx<'_, P, S, N, C>, job_id: &JobId, pid: Option<u32>) {
    if let Some(active) = ctx.active.lock().get_mut(job_id) {
        active.pid = pid;
    }
}

/// Run an external tool command to completion, streaming its output.
/// Success iff the process spawned, exited zero, and monitoring saw no
/// errors.
pub(crate) async fn run_tool_command<P, S, N, C>(
    ctx: &TaskCtx<'_, P, S, N, C>,
    job: &Job,
    task: &mut Task,
    task_index: usize,
    command: BorgCommand,
    label: &str,
) -> bool
where
    P: ProcessRunner,
    S: CloudSyncAdapter,
    N: NotifyAdapter,
    C: Clock,
{
    tracing::info!(
        job_id = %job.id,
        label,
        command = %borg::redact_command(&command.argv),
        "running tool command"
    );

    let handle = match ctx.runner.start(&command.argv, &command.env).await {
        Ok(handle) => handle,
        Err(e) => {
            task.error = Some(format!("{label} failed to start: {e}"));
            task.return_code = Some(-1);
            return false;
        }
    };

    set_active_pid(ctx, &job.id, Some(handle.pid()));
    let result = {
        let mut on_line = |line: &str, stream: StreamTag, progress: Option<Progress>| {
            record_line(ctx, job, task, task_index, line, stream, progress);
        };
        ctx.runner.monitor(handle, &mut on_line).await
    };
    set_active_pid(ctx, &job.id, None);

    task.return_code = Some(result.exit_code);
    if let Some(error) = result.error {
        task.error = Some(error);
        return false;
    }
    if result.exit_code != 0 {
        task.error = Some(format!("{label} failed with return code {}", result.exit_code));
        return false;
    }
    true
}
