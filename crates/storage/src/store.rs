// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The durable store contract consumed by the orchestrator.
//!
//! The backing relational database is an external collaborator; the engine
//! only depends on this trait. The store never originates job state
//! changes — it mirrors what the orchestrator tells it.

use crate::records::{
    CloudSyncConfig, JobRecord, NotificationConfig, RepositoryData, RetentionPolicy, TaskRecord,
};
use arca_core::{JobId, JobStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors from the durable store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("job not found: {0}")]
    JobNotFound(JobId),
    #[error("duplicate job id: {0}")]
    DuplicateJob(JobId),
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Durable system of record for jobs and tasks.
#[async_trait]
pub trait JobStore: Send + Sync + 'static {
    /// Insert the initial row for a new job.
    async fn create_job(&self, record: JobRecord) -> Result<(), StoreError>;

    /// Update a job's status and lifecycle fields. Fields passed as
    /// `None` are left untouched; the store never invents timestamps.
    async fn update_job_status(
        &self,
        id: &JobId,
        status: JobStatus,
        started_at: Option<DateTime<Utc>>,
        finished_at: Option<DateTime<Utc>>,
        return_code: Option<i32>,
        error_message: Option<String>,
    ) -> Result<(), StoreError>;

    /// Upsert the full task list's current state for a job.
    async fn save_tasks(&self, id: &JobId, tasks: &[TaskRecord]) -> Result<(), StoreError>;

    async fn get_job(&self, id: &JobId) -> Result<Option<JobRecord>, StoreError>;

    async fn get_job_tasks(&self, id: &JobId) -> Result<Vec<TaskRecord>, StoreError>;

    /// Recent jobs for one repository, newest first.
    async fn get_jobs_by_repository(
        &self,
        repository_ref: &str,
        limit: usize,
    ) -> Result<Vec<JobRecord>, StoreError>;

    /// Jobs still marked running that started before `cutoff` — candidates
    /// for startup recovery.
    async fn find_stale_running(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<JobRecord>, StoreError>;

    /// Delete old terminal jobs per the retention policy. Returns how many
    /// rows were removed.
    async fn cleanup_old_jobs(
        &self,
        policy: RetentionPolicy,
        now: DateTime<Utc>,
    ) -> Result<usize, StoreError>;

    async fn get_repository(&self, id: &str) -> Result<Option<RepositoryData>, StoreError>;

    async fn get_cloud_sync_config(
        &self,
        id: &str,
    ) -> Result<Option<CloudSyncConfig>, StoreError>;

    async fn get_notification_config(
        &self,
        id: &str,
    ) -> Result<Option<NotificationConfig>, StoreError>;
}
