// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn backup_params_deserialize_with_defaults() {
    let params: TaskParameters =
        serde_json::from_str(r#"{"type": "backup", "source_path": "/data"}"#).unwrap();

    match &params {
        TaskParameters::Backup(p) => {
            assert_eq!(p.source_path, "/data");
            assert_eq!(p.compression, "zstd");
            assert!(!p.dry_run);
            assert!(p.excludes.is_empty());
        }
        other => panic!("expected backup params, got {other:?}"),
    }
    assert_eq!(params.task_type(), TaskType::Backup);
}

#[test]
fn prune_params_keep_flags_are_optional() {
    let params: TaskParameters =
        serde_json::from_str(r#"{"type": "prune", "keep_daily": 7}"#).unwrap();

    match params {
        TaskParameters::Prune(p) => {
            assert_eq!(p.keep_daily, Some(7));
            assert_eq!(p.keep_weekly, None);
            assert!(p.show_stats);
            assert!(!p.show_list);
        }
        other => panic!("expected prune params, got {other:?}"),
    }
}

#[test]
fn check_scope_tags() {
    let params: TaskParameters =
        serde_json::from_str(r#"{"type": "check", "scope": "repository_only"}"#).unwrap();

    match params {
        TaskParameters::Check(p) => assert_eq!(p.scope, CheckScope::RepositoryOnly),
        other => panic!("expected check params, got {other:?}"),
    }
}

#[test]
fn cloud_sync_tag_is_snake_case() {
    let params = TaskParameters::CloudSync(CloudSyncParams { config_id: Some("cs-1".into()) });
    let json = serde_json::to_value(&params).unwrap();
    assert_eq!(json["type"], "cloud_sync");
    assert_eq!(json["config_id"], "cs-1");
}

#[test]
fn notification_defaults_notify_both_ways() {
    let params: TaskParameters =
        serde_json::from_str(r#"{"type": "notification", "config_id": "nc-1"}"#).unwrap();

    match params {
        TaskParameters::Notification(p) => {
            assert!(p.notify_on_success);
            assert!(p.notify_on_failure);
        }
        other => panic!("expected notification params, got {other:?}"),
    }
}

#[yare::parameterized(
    backup       = { r#"{"type": "backup", "source_path": "/d"}"#, TaskType::Backup },
    prune        = { r#"{"type": "prune"}"#,                       TaskType::Prune },
    check        = { r#"{"type": "check"}"#,                       TaskType::Check },
    cloud_sync   = { r#"{"type": "cloud_sync"}"#,                  TaskType::CloudSync },
    notification = { r#"{"type": "notification"}"#,                TaskType::Notification },
)]
fn tag_selects_variant(json: &str, expected: TaskType) {
    let params: TaskParameters = serde_json::from_str(json).unwrap();
    assert_eq!(params.task_type(), expected);
}

#[test]
fn round_trip_preserves_fields() {
    let params = TaskParameters::Prune(PruneParams {
        keep_within: Some("14d".to_string()),
        keep_daily: Some(7),
        keep_weekly: Some(4),
        keep_monthly: None,
        keep_yearly: None,
        show_stats: true,
        show_list: false,
        dry_run: true,
    });

    let json = serde_json::to_string(&params).unwrap();
    let restored: TaskParameters = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, params);
}
