// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Streaming specs: live output followers and the global event feed.

use crate::prelude::*;

#[tokio::test]
async fn follower_attached_mid_run_sees_remaining_lines() {
    let spec = spec();
    let mut script = ScriptedCommand::new(&["borg", "create"]).exit_code(0);
    script.lines = (0..20).map(|i| format!("line {i}")).collect();
    script.line_delay = Duration::from_millis(10);
    spec.runner.script(script);

    let job_id = spec
        .orchestrator
        .create_composite_job(vec![backup_def("/data")], "repo-1", None)
        .await
        .expect("job created");

    // Attach while the job is producing output
    let attached = wait_for(SPEC_WAIT_MAX_MS, || {
        spec.orchestrator.follow_output(&job_id).is_some()
    })
    .await;
    assert!(attached);
    let mut follower = spec.orchestrator.follow_output(&job_id).expect("follower");

    let mut seen = Vec::new();
    while let Some(line) = follower.next().await {
        seen.push(line.text);
    }

    // Buffered replay plus live tail covers every line, in order
    assert_eq!(seen.len(), 20);
    assert_eq!(seen[0], "line 0");
    assert_eq!(seen[19], "line 19");
}

#[tokio::test]
async fn saturated_subscriber_never_blocks_the_engine() {
    let spec = spec_with_config(EngineConfig::default().subscriber_channel_capacity(4));
    let mut script = ScriptedCommand::new(&["borg", "create"]).exit_code(0);
    script.lines = (0..50).map(|i| format!("line {i}")).collect();
    spec.runner.script(script);

    // Never drained: its channel saturates after 4 events
    let _stuck = spec.orchestrator.subscribe();

    let job_id = spec
        .orchestrator
        .create_composite_job(vec![backup_def("/data")], "repo-1", None)
        .await
        .expect("job created");

    // The job still completes promptly despite the full channel
    let job = wait_terminal(&spec.orchestrator, &job_id).await;
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(spec.orchestrator.broadcaster().subscriber_count(), 1);
}

#[tokio::test]
async fn keepalive_arrives_during_silence() {
    let spec = spec_with_config(
        EngineConfig::default().keepalive_interval(Duration::from_millis(30)),
    );
    let mut sub = spec.orchestrator.subscribe();

    match sub.next().await {
        Some(Event::Keepalive { .. }) => {}
        other => panic!("expected keepalive during silence, got {other:?}"),
    }
}

#[tokio::test]
async fn unsubscribe_ends_the_event_stream() {
    let spec = spec();
    let mut sub = spec.orchestrator.subscribe();
    let id = sub.id().clone();

    assert!(spec.orchestrator.unsubscribe(&id));
    assert!(sub.next().await.is_none());
}

#[tokio::test]
async fn recent_events_survive_for_late_joiners() {
    let spec = spec();
    spec.runner.script(ScriptedCommand::new(&["borg", "create"]).exit_code(0));

    let job_id = spec
        .orchestrator
        .create_composite_job(vec![backup_def("/data")], "repo-1", None)
        .await
        .expect("job created");
    wait_terminal(&spec.orchestrator, &job_id).await;

    let recent = spec.orchestrator.broadcaster().recent_events(50);
    let has_terminal = recent.iter().any(|event| {
        matches!(event, Event::JobCompleted { job_id: id, .. } if *id == job_id)
    });
    assert!(has_terminal, "terminal event missing from history");
}
