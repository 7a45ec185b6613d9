// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed task parameters.
//!
//! One variant per task type, selected by the same tag as [`TaskType`], so a
//! task definition deserializes into compile-time-checked fields while the
//! task envelope stays generic.

use crate::task::TaskType;
use serde::{Deserialize, Serialize};

fn default_compression() -> String {
    "zstd".to_string()
}

fn default_true() -> bool {
    true
}

/// Parameters for an archive-creation task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupParams {
    pub source_path: String,
    #[serde(default = "default_compression")]
    pub compression: String,
    #[serde(default)]
    pub excludes: Vec<String>,
    #[serde(default)]
    pub dry_run: bool,
}

/// Parameters for a retention-pruning task. Only retention fields that are
/// present produce command flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PruneParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_within: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_daily: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_weekly: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_monthly: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_yearly: Option<u32>,
    #[serde(default = "default_true")]
    pub show_stats: bool,
    #[serde(default)]
    pub show_list: bool,
    #[serde(default)]
    pub dry_run: bool,
}

impl Default for PruneParams {
    fn default() -> Self {
        Self {
            keep_within: None,
            keep_daily: None,
            keep_weekly: None,
            keep_monthly: None,
            keep_yearly: None,
            show_stats: true,
            show_list: false,
            dry_run: false,
        }
    }
}

/// Which parts of a repository an integrity check covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckScope {
    #[default]
    Full,
    RepositoryOnly,
    ArchivesOnly,
}

crate::simple_display! {
    CheckScope {
        Full => "full",
        RepositoryOnly => "repository_only",
        ArchivesOnly => "archives_only",
    }
}

/// Parameters for an integrity-check task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckParams {
    #[serde(default)]
    pub scope: CheckScope,
    #[serde(default)]
    pub verify_data: bool,
    #[serde(default)]
    pub repair: bool,
    /// Seconds; honored only for repository-only checks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_duration: Option<u64>,
}

/// Parameters for a cloud replication task. When `config_id` is absent the
/// job-level cloud sync config reference is used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudSyncParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_id: Option<String>,
}

/// Parameters for a notification task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_id: Option<String>,
    #[serde(default = "default_true")]
    pub notify_on_success: bool,
    #[serde(default = "default_true")]
    pub notify_on_failure: bool,
}

impl Default for NotificationParams {
    fn default() -> Self {
        Self { config_id: None, notify_on_success: true, notify_on_failure: true }
    }
}

/// Tagged union of per-type task parameters.
///
/// The tag matches [`TaskType`]'s serialized form, so a task definition is
/// one JSON object: `{"type": "backup", "source_path": "/data", ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskParameters {
    Backup(BackupParams),
    Prune(PruneParams),
    Check(CheckParams),
    CloudSync(CloudSyncParams),
    Notification(NotificationParams),
}

impl TaskParameters {
    /// The task type this parameter set belongs to.
    pub fn task_type(&self) -> TaskType {
        match self {
            TaskParameters::Backup(_) => TaskType::Backup,
            TaskParameters::Prune(_) => TaskType::Prune,
            TaskParameters::Check(_) => TaskType::Check,
            TaskParameters::CloudSync(_) => TaskType::CloudSync,
            TaskParameters::Notification(_) => TaskType::Notification,
        }
    }
}

#[cfg(test)]
#[path = "params_tests.rs"]
mod tests;
