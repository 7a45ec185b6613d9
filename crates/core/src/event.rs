// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event types fanned out to live subscribers.

use crate::job::{JobId, JobStatus};
use crate::progress::Progress;
use crate::task::TaskStatus;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Identifier handed out for an event subscription.
    pub struct SubscriberId("sub-");
}

/// Immutable lifecycle/output message broadcast to all subscribers.
///
/// Serializes with `{"type": "job:started", ...fields}` format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    #[serde(rename = "job:queued")]
    JobQueued { job_id: JobId, epoch_ms: u64 },

    #[serde(rename = "job:started")]
    JobStarted {
        job_id: JobId,
        epoch_ms: u64,
        #[serde(default)]
        task_count: usize,
    },

    #[serde(rename = "job:completed")]
    JobCompleted { job_id: JobId, epoch_ms: u64 },

    #[serde(rename = "job:failed")]
    JobFailed {
        job_id: JobId,
        epoch_ms: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    #[serde(rename = "job:cancelled")]
    JobCancelled { job_id: JobId, epoch_ms: u64 },

    /// Aggregated progress snapshot for a running job.
    #[serde(rename = "job:progress")]
    JobProgress { job_id: JobId, epoch_ms: u64, progress: Progress },

    #[serde(rename = "task:started")]
    TaskStarted { job_id: JobId, task_index: usize, name: String, epoch_ms: u64 },

    #[serde(rename = "task:completed")]
    TaskCompleted {
        job_id: JobId,
        task_index: usize,
        epoch_ms: u64,
        /// Terminal status: completed or skipped.
        status: TaskStatus,
    },

    #[serde(rename = "task:failed")]
    TaskFailed {
        job_id: JobId,
        task_index: usize,
        epoch_ms: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    /// One captured output line from the currently-running task or command.
    #[serde(rename = "task:output")]
    TaskOutput {
        job_id: JobId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        task_index: Option<usize>,
        epoch_ms: u64,
        line: String,
    },

    /// Synthetic liveness marker emitted to a subscriber when no event
    /// arrived within the keepalive window.
    #[serde(rename = "keepalive")]
    Keepalive { epoch_ms: u64 },
}

impl Event {
    /// The job this event belongs to, if any.
    pub fn job_id(&self) -> Option<&JobId> {
        match self {
            Event::JobQueued { job_id, .. }
            | Event::JobStarted { job_id, .. }
            | Event::JobCompleted { job_id, .. }
            | Event::JobFailed { job_id, .. }
            | Event::JobCancelled { job_id, .. }
            | Event::JobProgress { job_id, .. }
            | Event::TaskStarted { job_id, .. }
            | Event::TaskCompleted { job_id, .. }
            | Event::TaskFailed { job_id, .. }
            | Event::TaskOutput { job_id, .. } => Some(job_id),
            Event::Keepalive { .. } => None,
        }
    }

    /// Build the terminal event matching a job's final status.
    pub fn job_terminal(job_id: JobId, status: JobStatus, error: Option<String>, epoch_ms: u64) -> Self {
        match status {
            JobStatus::Completed => Event::JobCompleted { job_id, epoch_ms },
            JobStatus::Cancelled => Event::JobCancelled { job_id, epoch_ms },
            _ => Event::JobFailed { job_id, epoch_ms, error },
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
