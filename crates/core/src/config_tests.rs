// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn defaults_match_documented_values() {
    let config = EngineConfig::default();
    assert_eq!(config.max_concurrent_backups, 5);
    assert_eq!(config.max_output_lines_per_job, 1000);
    assert_eq!(config.subscriber_channel_capacity, 100);
    assert_eq!(config.keepalive_interval, Duration::from_secs(30));
    assert_eq!(config.auto_cleanup_delay, Duration::from_secs(30));
    assert_eq!(config.stale_job_threshold, Duration::from_secs(300));
    assert_eq!(config.lock_break_timeout, Duration::from_secs(30));
}

#[test]
fn setters_chain() {
    let config = EngineConfig::default()
        .max_concurrent_backups(2)
        .max_output_lines_per_job(10)
        .keepalive_interval(Duration::from_millis(50));

    assert_eq!(config.max_concurrent_backups, 2);
    assert_eq!(config.max_output_lines_per_job, 10);
    assert_eq!(config.keepalive_interval, Duration::from_millis(50));
}

#[test]
#[serial_test::serial]
fn from_env_overrides_defaults() {
    std::env::set_var("ARCA_MAX_CONCURRENT_BACKUPS", "9");
    std::env::set_var("ARCA_MAX_OUTPUT_LINES", "123");
    let config = EngineConfig::from_env();
    std::env::remove_var("ARCA_MAX_CONCURRENT_BACKUPS");
    std::env::remove_var("ARCA_MAX_OUTPUT_LINES");

    assert_eq!(config.max_concurrent_backups, 9);
    assert_eq!(config.max_output_lines_per_job, 123);
}

#[test]
#[serial_test::serial]
fn from_env_ignores_unparsable_values() {
    std::env::set_var("ARCA_MAX_CONCURRENT_BACKUPS", "not-a-number");
    let config = EngineConfig::from_env();
    std::env::remove_var("ARCA_MAX_CONCURRENT_BACKUPS");

    assert_eq!(config.max_concurrent_backups, 5);
}
