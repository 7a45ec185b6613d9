// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The job orchestrator: creates jobs, sequences tasks, applies failure
//! propagation, persists transitions, and emits events.
//!
//! Ownership rules: the orchestrator exclusively mutates `Job`/`Task`
//! state; the store mirrors it durably and never originates changes; the
//! in-memory job map is a cache for fast status reads and streaming,
//! invalidated by process restart and repaired by recovery. Each job's
//! sequencing runs as one supervised task — no two tasks ever write the
//! same job concurrently.

use crate::broadcaster::{EventBroadcaster, Subscription};
use crate::output::{OutputFollower, OutputStore};
use crate::queue::{QueueEntry, QueueManager, QueuePriority, QueueStats, SlotGuard};
use crate::recovery::{self, RecoveryReport};
use crate::supervisor::Supervisor;
use crate::tasks::{self, TaskCtx};
use arca_adapters::{CloudSyncAdapter, NotifyAdapter, ProcessRunner};
use arca_core::{
    Clock, EngineConfig, Event, Job, JobId, JobStatus, OutputLine, Progress, StreamTag, Task,
    TaskParameters, TaskStatus, SubscriberId,
};
use arca_storage::records::epoch_ms_to_datetime;
use arca_storage::{JobRecord, JobStore, StoreError, TaskRecord};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Errors surfaced by job-creation entry points. Persistence failures are
/// not among them — those are logged and swallowed (best-effort
/// durability).
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("composite job requires at least one task")]
    EmptyTaskList,
    #[error("empty command")]
    EmptyCommand,
}

/// One step of a composite job as supplied by the caller. The task type
/// is the parameters' tag.
#[derive(Debug, Clone)]
pub struct TaskDefinition {
    pub name: String,
    pub parameters: TaskParameters,
}

/// Introspection snapshot for one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobStatusView {
    pub status: JobStatus,
    pub started_at_ms: Option<u64>,
    pub completed_at_ms: Option<u64>,
    pub return_code: Option<i32>,
    pub error: Option<String>,
}

/// Live handles for a job that may own a subprocess.
pub(crate) struct ActiveJob {
    pub cancel: CancellationToken,
    pub pid: Option<u32>,
}

impl ActiveJob {
    fn new() -> Self {
        Self { cancel: CancellationToken::new(), pid: None }
    }
}

/// The composite job execution engine.
///
/// Cheap to clone; all clones share state. Must be constructed inside a
/// tokio runtime (the queue dispatcher and supervisor reaper start
/// immediately).
pub struct Orchestrator<P, S, N, C: Clock> {
    inner: Arc<Inner<P, S, N, C>>,
}

impl<P, S, N, C: Clock> Clone for Orchestrator<P, S, N, C> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

pub(crate) struct Inner<P, S, N, C: Clock> {
    pub(crate) config: EngineConfig,
    pub(crate) clock: C,
    pub(crate) runner: P,
    pub(crate) cloud: S,
    pub(crate) notifier: N,
    pub(crate) store: Arc<dyn JobStore>,
    pub(crate) output: Arc<OutputStore>,
    pub(crate) broadcaster: Arc<EventBroadcaster<C>>,
    pub(crate) queue: Arc<QueueManager>,
    pub(crate) supervisor: Supervisor,
    pub(crate) jobs: Mutex<HashMap<JobId, Job>>,
    pub(crate) active: Mutex<HashMap<JobId, ActiveJob>>,
}

impl<P, S, N, C> Orchestrator<P, S, N, C>
where
    P: ProcessRunner,
    S: CloudSyncAdapter,
    N: NotifyAdapter,
    C: Clock,
{
    pub fn new(
        config: EngineConfig,
        clock: C,
        runner: P,
        cloud: S,
        notifier: N,
        store: Arc<dyn JobStore>,
    ) -> Self {
        let supervisor = Supervisor::new();
        let output = Arc::new(OutputStore::new(config.max_output_lines_per_job));
        let broadcaster = Arc::new(EventBroadcaster::new(
            clock.clone(),
            config.subscriber_channel_capacity,
            config.event_history_limit,
            config.keepalive_interval,
        ));
        let queue = Arc::new(QueueManager::new(config.max_concurrent_backups));

        let inner = Arc::new(Inner {
            config,
            clock,
            runner,
            cloud,
            notifier,
            store,
            output,
            broadcaster,
            queue,
            supervisor,
            jobs: Mutex::new(HashMap::new()),
            active: Mutex::new(HashMap::new()),
        });

        let start_ref: Weak<Inner<P, S, N, C>> = Arc::downgrade(&inner);
        inner.queue.set_callbacks(
            move |entry, guard| {
                let Some(inner) = start_ref.upgrade() else { return };
                tokio::spawn(async move {
                    inner.run_queued(entry.job_id, guard).await;
                });
            },
            |job_id, success| {
                tracing::info!(job_id = %job_id, success, "queued job finished");
            },
        );
        inner.queue.start(&inner.supervisor);

        Self { inner }
    }

    /// Create a composite job and launch its sequencing asynchronously.
    pub async fn create_composite_job(
        &self,
        definitions: Vec<TaskDefinition>,
        repository_ref: &str,
        cloud_sync_config_ref: Option<String>,
    ) -> Result<JobId, OrchestratorError> {
        if definitions.is_empty() {
            return Err(OrchestratorError::EmptyTaskList);
        }
        let tasks: Vec<Task> = definitions
            .into_iter()
            .map(|def| Task::new(def.name, def.parameters))
            .collect();
        let job = Job::new_composite(
            JobId::new(),
            tasks,
            repository_ref,
            cloud_sync_config_ref,
            self.inner.clock.epoch_ms(),
        );
        let job_id = job.id.clone();
        tracing::info!(job_id = %job_id, task_count = job.tasks.len(), "composite job created");

        // Persist the skeleton up front so interrupted jobs leave a
        // recoverable record.
        self.inner.persist_create(&job).await;
        self.inner.persist_tasks(&job).await;

        self.inner.output.create(&job_id);
        self.inner.active.lock().insert(job_id.clone(), ActiveJob::new());
        self.inner.jobs.lock().insert(job_id.clone(), job);

        let inner = Arc::clone(&self.inner);
        let id = job_id.clone();
        self.inner
            .supervisor
            .spawn("composite-job", async move { inner.run_composite(id).await });

        Ok(job_id)
    }

    /// Start a simple single-command job. Backup-class commands transit
    /// the admission queue; everything else executes immediately.
    pub async fn start_command(
        &self,
        command: Vec<String>,
        env: HashMap<String, String>,
        backup_class: bool,
    ) -> Result<JobId, OrchestratorError> {
        if command.is_empty() {
            return Err(OrchestratorError::EmptyCommand);
        }
        let now = self.inner.clock.epoch_ms();
        let mut job = Job::new_simple(JobId::new(), command, env, now);
        let job_id = job.id.clone();

        self.inner.output.create(&job_id);
        self.inner.active.lock().insert(job_id.clone(), ActiveJob::new());

        if backup_class {
            job.status = JobStatus::Queued;
            self.inner.persist_create(&job).await;
            self.inner.jobs.lock().insert(job_id.clone(), job);
            self.inner.queue.enqueue(QueueEntry {
                job_id: job_id.clone(),
                job_type: "backup".to_string(),
                priority: QueuePriority::Normal,
            });
            self.inner
                .broadcaster
                .broadcast(Event::JobQueued { job_id: job_id.clone(), epoch_ms: now });
        } else {
            self.inner.persist_create(&job).await;
            self.inner.jobs.lock().insert(job_id.clone(), job);
            let inner = Arc::clone(&self.inner);
            let id = job_id.clone();
            self.inner
                .supervisor
                .spawn("simple-job", async move { inner.run_simple(id, None).await });
        }

        Ok(job_id)
    }

    /// Status snapshot for one job, or `None` if unknown (never created,
    /// or already evicted).
    pub fn job_status(&self, job_id: &JobId) -> Option<JobStatusView> {
        self.inner.jobs.lock().get(job_id).map(|job| JobStatusView {
            status: job.status,
            started_at_ms: job.started_at_ms,
            completed_at_ms: job.completed_at_ms,
            return_code: job.return_code,
            error: job.error.clone(),
        })
    }

    pub fn get_job(&self, job_id: &JobId) -> Option<Job> {
        self.inner.jobs.lock().get(job_id).cloned()
    }

    pub fn list_jobs(&self) -> HashMap<JobId, Job> {
        self.inner.jobs.lock().clone()
    }

    /// Follow a job's live output. `None` if the job has no buffer.
    pub fn follow_output(&self, job_id: &JobId) -> Option<OutputFollower> {
        self.inner.output.follow(job_id)
    }

    /// Merged progress snapshot for a running job.
    pub fn job_progress(&self, job_id: &JobId) -> Option<Progress> {
        self.inner.output.progress(job_id)
    }

    /// Subscribe to the global event feed.
    pub fn subscribe(&self) -> Subscription<C> {
        self.inner.broadcaster.subscribe()
    }

    pub fn unsubscribe(&self, id: &SubscriberId) -> bool {
        self.inner.broadcaster.unsubscribe(id)
    }

    /// The event hub, for stats and recent-event queries.
    pub fn broadcaster(&self) -> &EventBroadcaster<C> {
        &self.inner.broadcaster
    }

    pub fn queue_stats(&self) -> QueueStats {
        self.inner.queue.stats()
    }

    /// Request cancellation of a queued or running job. Returns whether a
    /// cancellation was initiated.
    pub async fn cancel_job(&self, job_id: &JobId) -> bool {
        let was_queued = {
            let jobs = self.inner.jobs.lock();
            match jobs.get(job_id) {
                Some(job) if job.status.is_cancellable() => job.status == JobStatus::Queued,
                _ => return false,
            }
        };

        let (token, pid) = {
            let active = self.inner.active.lock();
            match active.get(job_id) {
                Some(active) => (Some(active.cancel.clone()), active.pid),
                None => (None, None),
            }
        };
        if let Some(token) = token {
            token.cancel();
        }
        if let Some(pid) = pid {
            self.inner.runner.terminate(pid, self.inner.config.terminate_grace).await;
        }

        if was_queued {
            // Never started: finalize here; the dispatch callback will
            // see the terminal status and release its slot untouched.
            let now = self.inner.clock.epoch_ms();
            let finalized = {
                let mut jobs = self.inner.jobs.lock();
                match jobs.get_mut(job_id) {
                    Some(job) if job.status == JobStatus::Queued => {
                        job.mark_cancelled(now);
                        Some(job.clone())
                    }
                    _ => None,
                }
            };
            if let Some(job) = finalized {
                self.inner.finish_job(job, None).await;
                return true;
            }
        }
        tracing::info!(job_id = %job_id, "cancellation requested");
        true
    }

    /// Explicitly evict a job from the in-memory map and release its
    /// output buffer.
    pub fn cleanup_job(&self, job_id: &JobId) -> bool {
        self.inner.cleanup(job_id, false)
    }

    /// Run the startup recovery sweep against the durable store.
    pub async fn run_recovery(&self) -> Result<RecoveryReport, StoreError> {
        recovery::recover_stale_jobs(
            &self.inner.store,
            &self.inner.runner,
            &self.inner.clock,
            &self.inner.config,
        )
        .await
    }

    /// Stop admitting queued jobs and terminate active subprocesses.
    pub async fn shutdown(&self) {
        tracing::info!("orchestrator shutting down");
        self.inner.queue.shutdown();

        let targets: Vec<(JobId, CancellationToken, Option<u32>)> = self
            .inner
            .active
            .lock()
            .iter()
            .map(|(id, active)| (id.clone(), active.cancel.clone(), active.pid))
            .collect();
        for (job_id, token, pid) in targets {
            token.cancel();
            if let Some(pid) = pid {
                tracing::info!(job_id = %job_id, pid, "terminating process on shutdown");
                self.inner.runner.terminate(pid, self.inner.config.terminate_grace).await;
            }
        }
    }
}

impl<P, S, N, C> Inner<P, S, N, C>
where
    P: ProcessRunner,
    S: CloudSyncAdapter,
    N: NotifyAdapter,
    C: Clock,
{
    fn task_ctx(&self) -> TaskCtx<'_, P, S, N, C> {
        TaskCtx {
            config: &self.config,
            clock: &self.clock,
            runner: &self.runner,
            cloud: &self.cloud,
            notifier: &self.notifier,
            store: &self.store,
            output: &*self.output,
            broadcaster: &*self.broadcaster,
            active: &self.active,
        }
    }

    fn sync_job(&self, job: &Job) {
        self.jobs.lock().insert(job.id.clone(), job.clone());
    }

    fn cancel_token(&self, job_id: &JobId) -> CancellationToken {
        self.active
            .lock()
            .get(job_id)
            .map(|active| active.cancel.clone())
            .unwrap_or_default()
    }

    async fn persist_create(&self, job: &Job) {
        if let Err(e) = self.store.create_job(JobRecord::from_job(job)).await {
            tracing::warn!(job_id = %job.id, error = %e, "job create persist failed");
        }
    }

    async fn persist_status(&self, job: &Job) {
        let started = job.started_at_ms.map(epoch_ms_to_datetime);
        let finished = job.completed_at_ms.map(epoch_ms_to_datetime);
        if let Err(e) = self
            .store
            .update_job_status(
                &job.id,
                job.status,
                started,
                finished,
                job.return_code,
                job.error.clone(),
            )
            .await
        {
            tracing::warn!(job_id = %job.id, error = %e, "job status persist failed");
        }
    }

    async fn persist_tasks(&self, job: &Job) {
        let records: Vec<TaskRecord> = job
            .tasks
            .iter()
            .enumerate()
            .map(|(index, task)| TaskRecord::from_task(&job.id, index, task))
            .collect();
        if let Err(e) = self.store.save_tasks(&job.id, &records).await {
            tracing::warn!(job_id = %job.id, error = %e, "task persist failed");
        }
    }

    /// Entry point for queued backup-class jobs, invoked by the queue
    /// dispatcher once a slot is held.
    async fn run_queued(self: Arc<Self>, job_id: JobId, guard: SlotGuard) {
        let runnable = {
            let jobs = self.jobs.lock();
            jobs.get(&job_id).map(|job| job.status == JobStatus::Queued).unwrap_or(false)
        };
        if !runnable {
            tracing::info!(job_id = %job_id, "queued job no longer runnable, releasing slot");
            return;
        }
        self.run_simple(job_id, Some(guard)).await;
    }

    /// Execute a simple single-command job to its terminal state.
    async fn run_simple(self: Arc<Self>, job_id: JobId, guard: Option<SlotGuard>) {
        let Some(mut job) = self.jobs.lock().get(&job_id).cloned() else {
            return;
        };
        let now = self.clock.epoch_ms();
        job.mark_running(now);
        self.sync_job(&job);
        self.persist_status(&job).await;
        self.broadcaster.broadcast(Event::JobStarted {
            job_id: job_id.clone(),
            epoch_ms: now,
            task_count: 0,
        });

        let cancel = self.cancel_token(&job_id);

        match self.runner.start(&job.command, &job.env).await {
            Err(e) => {
                let now = self.clock.epoch_ms();
                job.return_code = Some(-1);
                job.mark_failed(now, e.to_string());
            }
            Ok(handle) => {
                if let Some(active) = self.active.lock().get_mut(&job_id) {
                    active.pid = Some(handle.pid());
                }
                let result = {
                    let mut on_line =
                        |line: &str, stream: StreamTag, progress: Option<Progress>| {
                            let epoch_ms = self.clock.epoch_ms();
                            self.output.append(
                                &job_id,
                                OutputLine { epoch_ms, text: line.to_string(), stream },
                                progress.as_ref(),
                            );
                            self.broadcaster.broadcast(Event::TaskOutput {
                                job_id: job_id.clone(),
                                task_index: None,
                                epoch_ms,
                                line: line.to_string(),
                            });
                        };
                    self.runner.monitor(handle, &mut on_line).await
                };
                if let Some(active) = self.active.lock().get_mut(&job_id) {
                    active.pid = None;
                }

                let now = self.clock.epoch_ms();
                job.return_code = Some(result.exit_code);
                if cancel.is_cancelled() {
                    job.mark_cancelled(now);
                } else if result.exit_code == 0 && result.error.is_none() {
                    job.mark_completed(now);
                } else {
                    let error = result.error.unwrap_or_else(|| {
                        format!("command failed with return code {}", result.exit_code)
                    });
                    job.mark_failed(now, error);
                }
            }
        }

        self.finish_job(job, guard).await;
    }

    /// Execute a composite job's task sequence to its terminal state.
    async fn run_composite(self: Arc<Self>, job_id: JobId) {
        let Some(mut job) = self.jobs.lock().get(&job_id).cloned() else {
            return;
        };
        let now = self.clock.epoch_ms();
        job.mark_running(now);
        self.sync_job(&job);
        self.persist_status(&job).await;
        self.broadcaster.broadcast(Event::JobStarted {
            job_id: job_id.clone(),
            epoch_ms: now,
            task_count: job.tasks.len(),
        });

        let cancel = self.cancel_token(&job_id);
        let mut critical_failed = false;
        let mut cancelled = false;

        for index in 0..job.tasks.len() {
            job.current_task_index = index;

            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            if critical_failed {
                // Flip pending straight to skipped; no execution attempt.
                let now = self.clock.epoch_ms();
                job.tasks[index].mark_skipped(now);
                self.sync_job(&job);
                self.persist_tasks(&job).await;
                self.broadcaster.broadcast(Event::TaskCompleted {
                    job_id: job_id.clone(),
                    task_index: index,
                    epoch_ms: now,
                    status: TaskStatus::Skipped,
                });
                continue;
            }

            let now = self.clock.epoch_ms();
            job.tasks[index].mark_running(now);
            self.sync_job(&job);
            self.broadcaster.broadcast(Event::TaskStarted {
                job_id: job_id.clone(),
                task_index: index,
                name: job.tasks[index].name.clone(),
                epoch_ms: now,
            });
            tracing::info!(
                job_id = %job_id,
                task = %job.tasks[index].name,
                index,
                total = job.tasks.len(),
                "task started"
            );

            let mut task = job.tasks[index].clone();
            let success = {
                let ctx = self.task_ctx();
                tasks::run_task(&ctx, &job, &mut task, index).await
            };

            let now = self.clock.epoch_ms();
            if cancel.is_cancelled() && !task.status.is_terminal() {
                task.mark_failed(now, "cancelled");
            } else if success {
                if !task.status.is_terminal() {
                    task.mark_completed(now);
                }
            } else if !task.status.is_terminal() {
                let error = task.error.clone().unwrap_or_else(|| "task failed".to_string());
                task.mark_failed(now, error);
            }
            job.tasks[index] = task;
            self.sync_job(&job);
            // Persisted before deciding whether to continue: a crash after
            // this point loses no task history.
            self.persist_tasks(&job).await;

            match job.tasks[index].status {
                TaskStatus::Failed => {
                    tracing::warn!(
                        job_id = %job_id,
                        task = %job.tasks[index].name,
                        error = job.tasks[index].error.as_deref().unwrap_or(""),
                        "task failed"
                    );
                    self.broadcaster.broadcast(Event::TaskFailed {
                        job_id: job_id.clone(),
                        task_index: index,
                        epoch_ms: now,
                        error: job.tasks[index].error.clone(),
                    });
                }
                status => {
                    self.broadcaster.broadcast(Event::TaskCompleted {
                        job_id: job_id.clone(),
                        task_index: index,
                        epoch_ms: now,
                        status,
                    });
                }
            }

            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            if job.tasks[index].status == TaskStatus::Failed
                && job.tasks[index].task_type.is_critical()
            {
                critical_failed = true;
            }
        }

        let now = self.clock.epoch_ms();
        if cancelled {
            job.mark_cancelled(now);
        } else if job.tasks.iter().any(|t| t.status == TaskStatus::Failed) {
            let error = job
                .tasks
                .iter()
                .find(|t| t.status == TaskStatus::Failed)
                .and_then(|t| t.error.clone())
                .unwrap_or_else(|| "one or more tasks failed".to_string());
            job.return_code = Some(1);
            job.mark_failed(now, error);
        } else {
            job.current_task_index = job.tasks.len();
            job.return_code = Some(0);
            job.mark_completed(now);
        }

        self.persist_tasks(&job).await;
        self.finish_job(job, None).await;
    }

    /// Common terminal handling: sync, persist, broadcast, close output,
    /// release the queue slot, schedule delayed eviction.
    async fn finish_job(self: &Arc<Self>, job: Job, guard: Option<SlotGuard>) {
        let success = job.status == JobStatus::Completed;
        tracing::info!(job_id = %job.id, status = %job.status, "job finished");

        self.sync_job(&job);
        self.persist_status(&job).await;
        let epoch_ms = job.completed_at_ms.unwrap_or_else(|| self.clock.epoch_ms());
        self.broadcaster.broadcast(Event::job_terminal(
            job.id.clone(),
            job.status,
            job.error.clone(),
            epoch_ms,
        ));
        self.output.mark_complete(&job.id);
        if let Some(active) = self.active.lock().get_mut(&job.id) {
            active.pid = None;
        }
        if let Some(guard) = guard {
            guard.finish(success);
        }

        let inner = Arc::clone(self);
        let job_id = job.id.clone();
        let delay = self.config.auto_cleanup_delay;
        self.supervisor.spawn("auto-cleanup", async move {
            tokio::time::sleep(delay).await;
            inner.cleanup(&job_id, true);
        });
    }

    /// Evict a job from memory. `terminal_only` restricts eviction to
    /// jobs that already finished (the auto-cleanup path).
    fn cleanup(&self, job_id: &JobId, terminal_only: bool) -> bool {
        {
            let mut jobs = self.jobs.lock();
            match jobs.get(job_id) {
                Some(job) if terminal_only && !job.is_terminal() => return false,
                Some(_) => {
                    jobs.remove(job_id);
                }
                None => return false,
            }
        }
        self.output.clear(job_id);
        self.active.lock().remove(job_id);
        tracing::debug!(job_id = %job_id, "job evicted from memory");
        true
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
