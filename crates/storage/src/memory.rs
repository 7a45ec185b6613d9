// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory reference implementation of [`JobStore`].
//!
//! Used by tests and single-process deployments that don't attach a
//! relational database. Behavior (field-preserving updates, retention
//! sweep) matches what the external store is expected to do.

use crate::records::{
    CloudSyncConfig, JobRecord, NotificationConfig, RepositoryData, RetentionPolicy, TaskRecord,
};
use crate::store::{JobStore, StoreError};
use arca_core::{JobId, JobStatus};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
struct MemoryState {
    jobs: HashMap<JobId, JobRecord>,
    tasks: HashMap<JobId, Vec<TaskRecord>>,
    repositories: HashMap<String, RepositoryData>,
    cloud_sync_configs: HashMap<String, CloudSyncConfig>,
    notification_configs: HashMap<String, NotificationConfig>,
}

/// Reference store backed by process memory.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a repository row.
    pub fn insert_repository(&self, repo: RepositoryData) {
        self.state.lock().repositories.insert(repo.id.clone(), repo);
    }

    /// Seed a cloud destination configuration row.
    pub fn insert_cloud_sync_config(&self, config: CloudSyncConfig) {
        self.state.lock().cloud_sync_configs.insert(config.id.clone(), config);
    }

    /// Seed a notification configuration row.
    pub fn insert_notification_config(&self, config: NotificationConfig) {
        self.state.lock().notification_configs.insert(config.id.clone(), config);
    }

    /// Total persisted job rows (for tests).
    pub fn job_count(&self) -> usize {
        self.state.lock().jobs.len()
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn create_job(&self, record: JobRecord) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        if state.jobs.contains_key(&record.id) {
            return Err(StoreError::DuplicateJob(record.id));
        }
        state.jobs.insert(record.id.clone(), record);
        Ok(())
    }

    async fn update_job_status(
        &self,
        id: &JobId,
        status: JobStatus,
        started_at: Option<DateTime<Utc>>,
        finished_at: Option<DateTime<Utc>>,
        return_code: Option<i32>,
        error_message: Option<String>,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        let record = state.jobs.get_mut(id).ok_or_else(|| StoreError::JobNotFound(id.clone()))?;
        record.status = status;
        if started_at.is_some() {
            record.started_at = started_at;
        }
        if finished_at.is_some() {
            record.finished_at = finished_at;
        }
        if return_code.is_some() {
            record.return_code = return_code;
        }
        if error_message.is_some() {
            record.error_message = error_message;
        }
        Ok(())
    }

    async fn save_tasks(&self, id: &JobId, tasks: &[TaskRecord]) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        if !state.jobs.contains_key(id) {
            return Err(StoreError::JobNotFound(id.clone()));
        }
        state.tasks.insert(id.clone(), tasks.to_vec());
        Ok(())
    }

    async fn get_job(&self, id: &JobId) -> Result<Option<JobRecord>, StoreError> {
        Ok(self.state.lock().jobs.get(id).cloned())
    }

    async fn get_job_tasks(&self, id: &JobId) -> Result<Vec<TaskRecord>, StoreError> {
        Ok(self.state.lock().tasks.get(id).cloned().unwrap_or_default())
    }

    async fn get_jobs_by_repository(
        &self,
        repository_ref: &str,
        limit: usize,
    ) -> Result<Vec<JobRecord>, StoreError> {
        let state = self.state.lock();
        let mut jobs: Vec<JobRecord> = state
            .jobs
            .values()
            .filter(|j| j.repository_ref.as_deref() == Some(repository_ref))
            .cloned()
            .collect();
        jobs.sort_by_key(|j| std::cmp::Reverse(j.created_at));
        jobs.truncate(limit);
        Ok(jobs)
    }

    async fn find_stale_running(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<JobRecord>, StoreError> {
        let state = self.state.lock();
        Ok(state
            .jobs
            .values()
            .filter(|j| {
                j.status == JobStatus::Running
                    && j.started_at.map(|t| t < cutoff).unwrap_or(false)
            })
            .cloned()
            .collect())
    }

    async fn cleanup_old_jobs(
        &self,
        policy: RetentionPolicy,
        now: DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        let cutoff = now - Duration::days(policy.older_than_days as i64);
        let mut state = self.state.lock();

        // Group terminal jobs per repository, newest first
        let mut by_repo: HashMap<Option<String>, Vec<(JobId, DateTime<Utc>)>> = HashMap::new();
        for job in state.jobs.values() {
            if job.status.is_terminal() {
                by_repo
                    .entry(job.repository_ref.clone())
                    .or_default()
                    .push((job.id.clone(), job.created_at));
            }
        }

        let mut removed = 0;
        for (_, mut group) in by_repo {
            group.sort_by_key(|(_, created)| std::cmp::Reverse(*created));
            for (id, created) in group.into_iter().skip(policy.keep_per_repository) {
                if created < cutoff {
                    state.jobs.remove(&id);
                    state.tasks.remove(&id);
                    removed += 1;
                }
            }
        }
        if removed > 0 {
            tracing::info!(removed, "cleaned up old job records");
        }
        Ok(removed)
    }

    async fn get_repository(&self, id: &str) -> Result<Option<RepositoryData>, StoreError> {
        Ok(self.state.lock().repositories.get(id).cloned())
    }

    async fn get_cloud_sync_config(
        &self,
        id: &str,
    ) -> Result<Option<CloudSyncConfig>, StoreError> {
        Ok(self.state.lock().cloud_sync_configs.get(id).cloned())
    }

    async fn get_notification_config(
        &self,
        id: &str,
    ) -> Result<Option<NotificationConfig>, StoreError> {
        Ok(self.state.lock().notification_configs.get(id).cloned())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
