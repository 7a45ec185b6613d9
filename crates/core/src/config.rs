// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine configuration with environment overrides.
//!
//! Centralized access to tunables; everything has a compiled default and an
//! `ARCA_*` environment override so deployments can tune limits without a
//! config file.

use std::time::Duration;

/// Tunables for the orchestration engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Upper bound on simultaneously running backup-class jobs.
    pub max_concurrent_backups: usize,
    /// Ring-buffer capacity for per-job and per-task output.
    pub max_output_lines_per_job: usize,
    /// Bounded channel capacity per event subscriber.
    pub subscriber_channel_capacity: usize,
    /// How many recent events the broadcaster retains for late joiners.
    pub event_history_limit: usize,
    /// Silence window after which a subscriber stream yields a keepalive.
    pub keepalive_interval: Duration,
    /// Delay before a terminal job is evicted from the in-memory map.
    pub auto_cleanup_delay: Duration,
    /// Age past which a "running" job found at startup is presumed
    /// abandoned by a prior process instance.
    pub stale_job_threshold: Duration,
    /// Bound on the repository lock-release command during recovery.
    pub lock_break_timeout: Duration,
    /// Grace period between SIGTERM and SIGKILL when terminating a process.
    pub terminate_grace: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_backups: 5,
            max_output_lines_per_job: 1000,
            subscriber_channel_capacity: 100,
            event_history_limit: 50,
            keepalive_interval: Duration::from_secs(30),
            auto_cleanup_delay: Duration::from_secs(30),
            stale_job_threshold: Duration::from_secs(300),
            lock_break_timeout: Duration::from_secs(30),
            terminate_grace: Duration::from_secs(5),
        }
    }
}

fn env_usize(name: &str) -> Option<usize> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

fn env_secs(name: &str) -> Option<Duration> {
    std::env::var(name).ok().and_then(|s| s.parse::<u64>().ok()).map(Duration::from_secs)
}

impl EngineConfig {
    /// Defaults overridden by any `ARCA_*` environment variables present.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(v) = env_usize("ARCA_MAX_CONCURRENT_BACKUPS") {
            config.max_concurrent_backups = v;
        }
        if let Some(v) = env_usize("ARCA_MAX_OUTPUT_LINES") {
            config.max_output_lines_per_job = v;
        }
        if let Some(v) = env_secs("ARCA_AUTO_CLEANUP_DELAY_SECS") {
            config.auto_cleanup_delay = v;
        }
        if let Some(v) = env_secs("ARCA_STALE_JOB_THRESHOLD_SECS") {
            config.stale_job_threshold = v;
        }
        if let Some(v) = env_secs("ARCA_KEEPALIVE_SECS") {
            config.keepalive_interval = v;
        }
        config
    }

    crate::setters! {
        set {
            max_concurrent_backups: usize,
            max_output_lines_per_job: usize,
            subscriber_channel_capacity: usize,
            keepalive_interval: Duration,
            auto_cleanup_delay: Duration,
            stale_job_threshold: Duration,
            terminate_grace: Duration,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
