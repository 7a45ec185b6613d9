// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job identifier and state machine.

use crate::task::Task;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

crate::define_id! {
    /// Unique identifier for a job instance.
    ///
    /// Assigned at creation, immutable, and used to reference the job in
    /// the store, the output buffers, and broadcast events.
    pub struct JobId("job-");
}

/// Shape of a job: a bare command or an ordered task sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// One external command, no sub-task structure
    Simple,
    /// Ordered list of heterogeneous tasks executed sequentially
    Composite,
}

crate::simple_display! {
    JobKind {
        Simple => "simple",
        Composite => "composite",
    }
}

/// Job lifecycle status.
///
/// Transitions are monotonic: `pending → [queued →] running → terminal`.
/// A job never re-enters `pending` or `queued` after reaching `running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled)
    }

    /// True while the job may still be cancelled.
    pub fn is_cancellable(&self) -> bool {
        matches!(self, JobStatus::Queued | JobStatus::Running)
    }
}

crate::simple_display! {
    JobStatus {
        Pending => "pending",
        Queued => "queued",
        Running => "running",
        Completed => "completed",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

/// A job instance: the unit of orchestration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub kind: JobKind,
    pub status: JobStatus,
    pub created_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_code: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Backup target this job operates on. Required for composite jobs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_ref: Option<String>,
    /// Cloud destination to replicate to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_sync_config_ref: Option<String>,
    /// Command line for simple jobs; empty for composite jobs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub env: HashMap<String, String>,
    /// Ordered task sequence (composite jobs only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tasks: Vec<Task>,
    /// Cursor into `tasks`; advances monotonically, equals `tasks.len()`
    /// once the sequence is done.
    #[serde(default)]
    pub current_task_index: usize,
}

impl Job {
    /// Create a simple single-command job.
    pub fn new_simple(
        id: JobId,
        command: Vec<String>,
        env: HashMap<String, String>,
        created_at_ms: u64,
    ) -> Self {
        Self {
            id,
            kind: JobKind::Simple,
            status: JobStatus::Pending,
            created_at_ms,
            started_at_ms: None,
            completed_at_ms: None,
            return_code: None,
            error: None,
            repository_ref: None,
            cloud_sync_config_ref: None,
            command,
            env,
            tasks: Vec::new(),
            current_task_index: 0,
        }
    }

    /// Create a composite job from an ordered task list.
    pub fn new_composite(
        id: JobId,
        tasks: Vec<Task>,
        repository_ref: impl Into<String>,
        cloud_sync_config_ref: Option<String>,
        created_at_ms: u64,
    ) -> Self {
        Self {
            id,
            kind: JobKind::Composite,
            status: JobStatus::Pending,
            created_at_ms,
            started_at_ms: None,
            completed_at_ms: None,
            return_code: None,
            error: None,
            repository_ref: Some(repository_ref.into()),
            cloud_sync_config_ref,
            command: Vec::new(),
            env: HashMap::new(),
            tasks,
            current_task_index: 0,
        }
    }

    pub fn is_composite(&self) -> bool {
        self.kind == JobKind::Composite && !self.tasks.is_empty()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// The task the cursor currently points at, if any.
    pub fn current_task(&self) -> Option<&Task> {
        self.tasks.get(self.current_task_index)
    }

    pub fn mark_running(&mut self, epoch_ms: u64) {
        self.status = JobStatus::Running;
        self.started_at_ms = Some(epoch_ms);
    }

    pub fn mark_completed(&mut self, epoch_ms: u64) {
        self.status = JobStatus::Completed;
        self.completed_at_ms = Some(epoch_ms);
    }

    pub fn mark_failed(&mut self, epoch_ms: u64, error: impl Into<String>) {
        self.status = JobStatus::Failed;
        self.completed_at_ms = Some(epoch_ms);
        self.error = Some(error.into());
    }

    pub fn mark_cancelled(&mut self, epoch_ms: u64) {
        self.status = JobStatus::Cancelled;
        self.completed_at_ms = Some(epoch_ms);
    }
}

crate::builder! {
    pub struct JobBuilder => Job {
        set {
            id: JobId = JobId::new(),
            kind: JobKind = JobKind::Composite,
            status: JobStatus = JobStatus::Pending,
            created_at_ms: u64 = 0,
            command: Vec<String> = Vec::new(),
            env: HashMap<String, String> = HashMap::new(),
            tasks: Vec<Task> = Vec::new(),
            current_task_index: usize = 0,
        }
        option {
            started_at_ms: u64,
            completed_at_ms: u64,
            return_code: i32,
            error: String,
            repository_ref: String,
            cloud_sync_config_ref: String,
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
