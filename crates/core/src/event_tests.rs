// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn events_serialize_with_type_tag() {
    let event = Event::JobStarted {
        job_id: JobId::from_string("job-1"),
        epoch_ms: 42,
        task_count: 3,
    };
    let json = serde_json::to_value(&event).unwrap();

    assert_eq!(json["type"], "job:started");
    assert_eq!(json["job_id"], "job-1");
    assert_eq!(json["task_count"], 3);
}

#[test]
fn task_output_omits_absent_task_index() {
    let event = Event::TaskOutput {
        job_id: JobId::from_string("job-1"),
        task_index: None,
        epoch_ms: 1,
        line: "hello".to_string(),
    };
    let json = serde_json::to_value(&event).unwrap();
    assert!(json.get("task_index").is_none());
}

#[test]
fn round_trip_through_json() {
    let event = Event::TaskFailed {
        job_id: JobId::from_string("job-9"),
        task_index: 2,
        epoch_ms: 100,
        error: Some("exit code 2".to_string()),
    };
    let json = serde_json::to_string(&event).unwrap();
    let restored: Event = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, event);
}

#[test]
fn job_id_accessor() {
    let id = JobId::from_string("job-1");
    let event = Event::JobCompleted { job_id: id.clone(), epoch_ms: 0 };
    assert_eq!(event.job_id(), Some(&id));
    assert_eq!(Event::Keepalive { epoch_ms: 0 }.job_id(), None);
}

#[yare::parameterized(
    completed = { JobStatus::Completed, "job:completed" },
    cancelled = { JobStatus::Cancelled, "job:cancelled" },
    failed    = { JobStatus::Failed,    "job:failed" },
)]
fn job_terminal_maps_status(status: JobStatus, tag: &str) {
    let event = Event::job_terminal(JobId::from_string("job-1"), status, None, 0);
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["type"], tag);
}
