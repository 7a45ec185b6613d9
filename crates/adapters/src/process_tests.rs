// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn cmd(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn captures_stdout_lines_in_order() {
    let runner = TokioProcessRunner::new();
    let handle = runner
        .start(&cmd(&["sh", "-c", "echo one; echo two"]), &HashMap::new())
        .await
        .unwrap();

    let mut seen = Vec::new();
    let result = runner
        .monitor(handle, &mut |line, tag, _| {
            seen.push((line.to_string(), tag));
        })
        .await;

    assert_eq!(result.exit_code, 0);
    assert!(result.success());
    assert_eq!(
        seen,
        vec![("one".to_string(), StreamTag::Stdout), ("two".to_string(), StreamTag::Stdout)]
    );
    assert_eq!(result.stdout_bytes, 8);
}

#[tokio::test]
async fn captures_stderr_with_tag() {
    let runner = TokioProcessRunner::new();
    let handle = runner
        .start(&cmd(&["sh", "-c", "echo oops >&2"]), &HashMap::new())
        .await
        .unwrap();

    let mut seen = Vec::new();
    let result = runner
        .monitor(handle, &mut |line, tag, _| {
            seen.push((line.to_string(), tag));
        })
        .await;

    assert_eq!(result.exit_code, 0);
    assert_eq!(seen, vec![("oops".to_string(), StreamTag::Stderr)]);
    assert_eq!(result.stderr_bytes, 5);
}

#[tokio::test]
async fn nonzero_exit_is_reported_not_an_error() {
    let runner = TokioProcessRunner::new();
    let handle = runner.start(&cmd(&["sh", "-c", "exit 3"]), &HashMap::new()).await.unwrap();

    let result = runner.monitor(handle, &mut |_, _, _| {}).await;
    assert_eq!(result.exit_code, 3);
    assert!(!result.success());
    assert!(result.error.is_none());
}

#[tokio::test]
async fn extra_env_reaches_the_process() {
    let runner = TokioProcessRunner::new();
    let mut env = HashMap::new();
    env.insert("ARCA_TEST_MARKER".to_string(), "present".to_string());
    let handle = runner
        .start(&cmd(&["sh", "-c", "echo $ARCA_TEST_MARKER"]), &env)
        .await
        .unwrap();

    let mut seen = Vec::new();
    runner
        .monitor(handle, &mut |line, _, _| seen.push(line.to_string()))
        .await;

    assert_eq!(seen, vec!["present".to_string()]);
}

#[tokio::test]
async fn missing_binary_is_a_launch_error() {
    let runner = TokioProcessRunner::new();
    let result = runner
        .start(&cmd(&["arca-definitely-not-a-binary"]), &HashMap::new())
        .await;
    assert!(matches!(result, Err(LaunchError::Spawn { .. })));
}

#[tokio::test]
async fn empty_command_is_rejected() {
    let runner = TokioProcessRunner::new();
    let result = runner.start(&[], &HashMap::new()).await;
    assert!(matches!(result, Err(LaunchError::EmptyCommand)));
}

#[tokio::test]
async fn progress_is_parsed_per_line() {
    let runner = TokioProcessRunner::new();
    let handle = runner
        .start(&cmd(&["sh", "-c", "echo '100 50 25 3 /data/file'"]), &HashMap::new())
        .await
        .unwrap();

    let mut parsed = Vec::new();
    runner
        .monitor(handle, &mut |_, _, progress| parsed.push(progress))
        .await;

    assert_eq!(parsed.len(), 1);
    let progress = parsed[0].clone().unwrap();
    assert_eq!(progress.nfiles, Some(3));
    assert_eq!(progress.current_path.as_deref(), Some("/data/file"));
}

#[tokio::test]
async fn terminate_kills_a_sleeping_process() {
    let runner = TokioProcessRunner::new();
    let handle = runner.start(&cmd(&["sleep", "30"]), &HashMap::new()).await.unwrap();
    let pid = handle.pid();

    let monitor = {
        let runner = runner.clone();
        tokio::spawn(async move { runner.monitor(handle, &mut |_, _, _| {}).await })
    };

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(runner.terminate(pid, Duration::from_secs(2)).await);

    let result = monitor.await.unwrap();
    assert_ne!(result.exit_code, 0);
}

#[tokio::test]
async fn scripted_runner_replays_script() {
    let runner = ScriptedProcessRunner::new();
    runner.script(
        ScriptedCommand::new(&["borg", "create"])
            .line("Archive name: backup-1")
            .line("done")
            .exit_code(0),
    );

    let handle = runner
        .start(&cmd(&["borg", "create", "repo::backup-1"]), &HashMap::new())
        .await
        .unwrap();

    let mut seen = Vec::new();
    let result = runner
        .monitor(handle, &mut |line, _, progress| {
            seen.push((line.to_string(), progress));
        })
        .await;

    assert_eq!(result.exit_code, 0);
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].0, "Archive name: backup-1");
    assert_eq!(
        seen[0].1.as_ref().and_then(|p| p.archive_name.as_deref()),
        Some("backup-1")
    );
    assert_eq!(runner.started_commands().len(), 1);
}

#[tokio::test]
async fn scripted_runner_unmatched_command_succeeds_silently() {
    let runner = ScriptedProcessRunner::new();
    let handle = runner.start(&cmd(&["borg", "list"]), &HashMap::new()).await.unwrap();
    let result = runner.monitor(handle, &mut |_, _, _| {}).await;
    assert_eq!(result.exit_code, 0);
    assert_eq!(result.stdout_bytes, 0);
}

#[tokio::test]
async fn scripted_runner_can_refuse_spawn() {
    let runner = ScriptedProcessRunner::new();
    runner.refuse_spawn();
    let result = runner.start(&cmd(&["borg", "list"]), &HashMap::new()).await;
    assert!(matches!(result, Err(LaunchError::Spawn { .. })));
}

#[tokio::test]
async fn scripted_runner_records_termination() {
    let runner = ScriptedProcessRunner::new();
    assert!(runner.terminate(12345, Duration::ZERO).await);
    assert_eq!(runner.terminated_pids(), vec![12345]);
}
