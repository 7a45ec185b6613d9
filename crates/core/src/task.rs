// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task model: one step of a composite job.

use crate::params::TaskParameters;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Kind of work a task performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Backup,
    Prune,
    Check,
    CloudSync,
    Notification,
}

impl TaskType {
    /// A critical task aborts the remaining sequence when it fails.
    /// Only archive creation is critical; maintenance and delivery steps
    /// let the sequence continue.
    pub fn is_critical(&self) -> bool {
        matches!(self, TaskType::Backup)
    }
}

crate::simple_display! {
    TaskType {
        Backup => "backup",
        Prune => "prune",
        Check => "check",
        CloudSync => "cloud_sync",
        Notification => "notification",
    }
}

/// Status of a task within its owning job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Waiting for the orchestrator to reach it
    Pending,
    /// Currently executing
    Running,
    /// Finished successfully
    Completed,
    /// Finished unsuccessfully
    Failed,
    /// Intentionally not executed (missing/disabled config, or an earlier
    /// critical task failed). Counted as success for trigger evaluation.
    Skipped,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Skipped)
    }
}

crate::simple_display! {
    TaskStatus {
        Pending => "pending",
        Running => "running",
        Completed => "completed",
        Failed => "failed",
        Skipped => "skipped",
    }
}

/// Which stream an output line arrived on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamTag {
    #[default]
    Stdout,
    Stderr,
}

crate::simple_display! {
    StreamTag {
        Stdout => "stdout",
        Stderr => "stderr",
    }
}

/// One timestamped line of captured output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputLine {
    pub epoch_ms: u64,
    pub text: String,
    #[serde(default)]
    pub stream: StreamTag,
}

impl OutputLine {
    pub fn new(epoch_ms: u64, text: impl Into<String>) -> Self {
        Self { epoch_ms, text: text.into(), stream: StreamTag::Stdout }
    }
}

/// One step of a composite job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub task_type: TaskType,
    pub name: String,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_code: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub parameters: TaskParameters,
    #[serde(default)]
    pub output_lines: VecDeque<OutputLine>,
}

impl Task {
    /// Create a pending task. The type tag comes from the parameters.
    pub fn new(name: impl Into<String>, parameters: TaskParameters) -> Self {
        Self {
            task_type: parameters.task_type(),
            name: name.into(),
            status: TaskStatus::Pending,
            started_at_ms: None,
            completed_at_ms: None,
            return_code: None,
            error: None,
            parameters,
            output_lines: VecDeque::new(),
        }
    }

    pub fn mark_running(&mut self, epoch_ms: u64) {
        self.status = TaskStatus::Running;
        self.started_at_ms = Some(epoch_ms);
    }

    pub fn mark_completed(&mut self, epoch_ms: u64) {
        self.status = TaskStatus::Completed;
        self.completed_at_ms = Some(epoch_ms);
    }

    pub fn mark_failed(&mut self, epoch_ms: u64, error: impl Into<String>) {
        self.status = TaskStatus::Failed;
        self.completed_at_ms = Some(epoch_ms);
        self.error = Some(error.into());
    }

    pub fn mark_skipped(&mut self, epoch_ms: u64) {
        self.status = TaskStatus::Skipped;
        self.completed_at_ms = Some(epoch_ms);
    }

    /// Append an output line, evicting the oldest once `max_lines` is
    /// reached.
    pub fn push_output(&mut self, line: OutputLine, max_lines: usize) {
        if max_lines == 0 {
            return;
        }
        while self.output_lines.len() >= max_lines {
            self.output_lines.pop_front();
        }
        self.output_lines.push_back(line);
    }
}

crate::builder! {
    pub struct TaskBuilder => Task {
        into {
            name: String = "archive",
        }
        set {
            task_type: TaskType = TaskType::Backup,
            status: TaskStatus = TaskStatus::Pending,
            parameters: TaskParameters = TaskParameters::Backup(crate::params::BackupParams {
                source_path: "/data".to_string(),
                compression: "zstd".to_string(),
                excludes: Vec::new(),
                dry_run: false,
            }),
            output_lines: VecDeque<OutputLine> = VecDeque::new(),
        }
        option {
            started_at_ms: u64,
            completed_at_ms: u64,
            return_code: i32,
            error: String,
        }
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
