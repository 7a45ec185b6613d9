// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persisted record shapes.
//!
//! These are the rows the external relational store holds; the engine's
//! in-memory `Job`/`Task` structs convert into them at each save point.
//! Task output persists as a single newline-joined blob, oldest line
//! first, empty string (never null) when there is no output.

use arca_core::{Job, JobId, JobKind, JobStatus, Task, TaskStatus, TaskType};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Convert an engine epoch-ms timestamp to a store timestamp.
pub fn epoch_ms_to_datetime(epoch_ms: u64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(epoch_ms as i64).single().unwrap_or_default()
}

/// One persisted job row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: JobId,
    pub kind: JobKind,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_sync_config_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_code: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl JobRecord {
    /// Snapshot the persistable fields of an in-memory job.
    pub fn from_job(job: &Job) -> Self {
        Self {
            id: job.id.clone(),
            kind: job.kind,
            status: job.status,
            repository_ref: job.repository_ref.clone(),
            cloud_sync_config_ref: job.cloud_sync_config_ref.clone(),
            created_at: epoch_ms_to_datetime(job.created_at_ms),
            started_at: job.started_at_ms.map(epoch_ms_to_datetime),
            finished_at: job.completed_at_ms.map(epoch_ms_to_datetime),
            return_code: job.return_code,
            error_message: job.error.clone(),
        }
    }
}

/// One persisted task row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub job_id: JobId,
    pub task_index: usize,
    pub task_type: TaskType,
    pub name: String,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_code: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Newline-joined output lines, oldest first; empty when none.
    pub output: String,
}

impl TaskRecord {
    /// Snapshot one task of a job, joining its output buffer.
    pub fn from_task(job_id: &JobId, task_index: usize, task: &Task) -> Self {
        let output = task
            .output_lines
            .iter()
            .map(|line| line.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        Self {
            job_id: job_id.clone(),
            task_index,
            task_type: task.task_type,
            name: task.name.clone(),
            status: task.status,
            started_at: task.started_at_ms.map(epoch_ms_to_datetime),
            completed_at: task.completed_at_ms.map(epoch_ms_to_datetime),
            return_code: task.return_code,
            error: task.error.clone(),
            output,
        }
    }
}

/// Repository row with the passphrase already decrypted by the repository
/// collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryData {
    pub id: String,
    pub name: String,
    pub path: String,
    pub passphrase: String,
}

/// Cloud destination configuration row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudSyncConfig {
    pub id: String,
    pub name: String,
    pub enabled: bool,
    /// Provider-specific destination string (e.g. `s3:bucket/prefix`).
    pub destination: String,
}

/// Notification provider configuration row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationConfig {
    pub id: String,
    pub provider: String,
    pub enabled: bool,
    /// Provider-specific routing data (user key, webhook URL).
    pub target: String,
}

/// How far back `cleanup_old_jobs` reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    pub older_than_days: u32,
    /// Most-recent jobs kept per repository regardless of age.
    pub keep_per_repository: usize,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self { older_than_days: 30, keep_per_repository: 10 }
    }
}

#[cfg(test)]
#[path = "records_tests.rs"]
mod tests;
