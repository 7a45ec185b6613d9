// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Borg command construction.
//!
//! The passphrase travels only through the environment (`BORG_PASSPHRASE`),
//! never through argv, so it cannot leak into process listings or logs.

use arca_core::{BackupParams, CheckParams, CheckScope, PruneParams};
use chrono::{TimeZone, Utc};
use std::collections::HashMap;

/// An assembled command line plus the environment it needs.
#[derive(Debug, Clone)]
pub struct BorgCommand {
    pub argv: Vec<String>,
    pub env: HashMap<String, String>,
}

fn base_env(passphrase: &str) -> HashMap<String, String> {
    let mut env = HashMap::new();
    env.insert("BORG_PASSPHRASE".to_string(), passphrase.to_string());
    env
}

/// Archive name of the form `{prefix}-{YYYY-MM-DD_HH-MM-SS}`.
pub fn archive_name(prefix: &str, epoch_ms: u64) -> String {
    let stamp = Utc
        .timestamp_millis_opt(epoch_ms as i64)
        .single()
        .map(|dt| dt.format("%Y-%m-%d_%H-%M-%S").to_string())
        .unwrap_or_else(|| epoch_ms.to_string());
    format!("{prefix}-{stamp}")
}

/// `borg create` for an archive-creation task.
pub fn create_command(
    repo_path: &str,
    passphrase: &str,
    archive: &str,
    params: &BackupParams,
) -> BorgCommand {
    let mut argv = vec![
        "borg".to_string(),
        "create".to_string(),
        "--compression".to_string(),
        params.compression.clone(),
        "--stats".to_string(),
        "--progress".to_string(),
        "--verbose".to_string(),
        "--list".to_string(),
    ];
    for pattern in &params.excludes {
        argv.push("--exclude".to_string());
        argv.push(pattern.clone());
    }
    if params.dry_run {
        argv.push("--dry-run".to_string());
    }
    argv.push(format!("{repo_path}::{archive}"));
    argv.push(params.source_path.clone());

    BorgCommand { argv, env: base_env(passphrase) }
}

/// `borg prune`; only retention flags that carry a value are emitted.
pub fn prune_command(repo_path: &str, passphrase: &str, params: &PruneParams) -> BorgCommand {
    let mut argv = vec!["borg".to_string(), "prune".to_string(), "--verbose".to_string()];

    if let Some(within) = &params.keep_within {
        argv.push("--keep-within".to_string());
        argv.push(within.clone());
    }
    for (flag, value) in [
        ("--keep-daily", params.keep_daily),
        ("--keep-weekly", params.keep_weekly),
        ("--keep-monthly", params.keep_monthly),
        ("--keep-yearly", params.keep_yearly),
    ] {
        if let Some(count) = value.filter(|c| *c > 0) {
            argv.push(flag.to_string());
            argv.push(count.to_string());
        }
    }
    if params.show_stats {
        argv.push("--stats".to_string());
    }
    if params.show_list {
        argv.push("--list".to_string());
    }
    if params.dry_run {
        argv.push("--dry-run".to_string());
    }
    argv.push(repo_path.to_string());

    BorgCommand { argv, env: base_env(passphrase) }
}

/// `borg check` honoring scope, verification and repair flags.
pub fn check_command(repo_path: &str, passphrase: &str, params: &CheckParams) -> BorgCommand {
    let mut argv = vec![
        "borg".to_string(),
        "check".to_string(),
        "--verbose".to_string(),
        "--progress".to_string(),
        "--show-rc".to_string(),
    ];

    match params.scope {
        CheckScope::RepositoryOnly => argv.push("--repository-only".to_string()),
        CheckScope::ArchivesOnly => argv.push("--archives-only".to_string()),
        CheckScope::Full => {}
    }
    // Data verification reads archives, so a repository-only check cannot honor it
    if params.verify_data && params.scope != CheckScope::RepositoryOnly {
        argv.push("--verify-data".to_string());
    }
    if params.repair {
        argv.push("--repair".to_string());
    }
    if let Some(secs) = params.max_duration.filter(|_| params.scope == CheckScope::RepositoryOnly) {
        argv.push("--max-duration".to_string());
        argv.push(secs.to_string());
    }
    argv.push(repo_path.to_string());

    BorgCommand { argv, env: base_env(passphrase) }
}

/// `borg break-lock`, used by startup recovery to release stale locks.
pub fn break_lock_command(repo_path: &str, passphrase: &str) -> BorgCommand {
    BorgCommand {
        argv: vec!["borg".to_string(), "break-lock".to_string(), repo_path.to_string()],
        env: base_env(passphrase),
    }
}

/// Format a command for logging with archive targets masked.
pub fn redact_command(argv: &[String]) -> String {
    argv.iter()
        .map(|arg| match arg.split_once("::") {
            Some((repo, _)) => format!("{repo}::[ARCHIVE]"),
            None => arg.clone(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
#[path = "borg_tests.rs"]
mod tests;
