// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess lifecycle: spawn, line-buffered monitoring, termination.
//!
//! The runner knows nothing about jobs or tasks; it launches a command,
//! feeds every output line (with any parsed progress) to a callback as it
//! arrives, and reports a structured result on exit. Termination is
//! graceful-then-forceful: SIGTERM, a bounded grace wait, then SIGKILL.

use arca_core::{Progress, StreamTag};
use async_trait::async_trait;
use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

/// Errors starting a subprocess.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("empty command")]
    EmptyCommand,
    #[error("failed to spawn {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

/// Final outcome of a monitored process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessResult {
    /// Exit code; -1 when the process was killed by a signal or monitoring
    /// failed before an exit status was available.
    pub exit_code: i32,
    pub stdout_bytes: u64,
    pub stderr_bytes: u64,
    pub error: Option<String>,
}

impl ProcessResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0 && self.error.is_none()
    }
}

/// Handle to a started process, consumed by `monitor`.
pub struct ProcessHandle {
    pid: u32,
    inner: HandleInner,
}

enum HandleInner {
    Child(tokio::process::Child),
    #[cfg(any(test, feature = "test-support"))]
    Scripted {
        lines: Vec<String>,
        exit_code: i32,
        error: Option<String>,
        line_delay: Duration,
    },
}

impl ProcessHandle {
    pub fn pid(&self) -> u32 {
        self.pid
    }
}

/// Per-line callback: the decoded line, which stream it arrived on, and
/// any structured progress parsed from it.
pub type OnLine<'a> = &'a mut (dyn FnMut(&str, StreamTag, Option<Progress>) + Send);

/// Launches external commands and streams their output.
#[async_trait]
pub trait ProcessRunner: Clone + Send + Sync + 'static {
    /// Spawn the command with the given extra environment.
    async fn start(
        &self,
        command: &[String],
        env: &HashMap<String, String>,
    ) -> Result<ProcessHandle, LaunchError>;

    /// Read output line-by-line, invoking `on_line` for each line as it
    /// arrives, and block until the process exits.
    async fn monitor(&self, handle: ProcessHandle, on_line: OnLine<'_>) -> ProcessResult;

    /// SIGTERM, wait up to `grace`, then SIGKILL. Returns whether the
    /// process is gone afterwards.
    async fn terminate(&self, pid: u32, grace: Duration) -> bool;
}

/// Production runner backed by `tokio::process`.
#[derive(Clone, Default)]
pub struct TokioProcessRunner;

impl TokioProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

async fn pump_lines<R>(reader: R, tag: StreamTag, tx: mpsc::Sender<(StreamTag, String)>)
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if tx.send((tag, line)).await.is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(stream = %tag, error = %e, "output read error");
                break;
            }
        }
    }
}

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn start(
        &self,
        command: &[String],
        env: &HashMap<String, String>,
    ) -> Result<ProcessHandle, LaunchError> {
        let (program, args) = command.split_first().ok_or(LaunchError::EmptyCommand)?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .envs(env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|source| LaunchError::Spawn {
            command: program.clone(),
            source,
        })?;

        let pid = child.id().unwrap_or(0);
        tracing::info!(program = %program, pid, "process started");

        Ok(ProcessHandle { pid, inner: HandleInner::Child(child) })
    }

    async fn monitor(&self, handle: ProcessHandle, on_line: OnLine<'_>) -> ProcessResult {
        let mut child = match handle.inner {
            HandleInner::Child(child) => child,
            #[cfg(any(test, feature = "test-support"))]
            HandleInner::Scripted { .. } => {
                return ProcessResult {
                    exit_code: -1,
                    stdout_bytes: 0,
                    stderr_bytes: 0,
                    error: Some("scripted handle passed to real runner".to_string()),
                }
            }
        };

        let (tx, mut rx) = mpsc::channel::<(StreamTag, String)>(256);
        if let Some(stdout) = child.stdout.take() {
            let tx = tx.clone();
            tokio::spawn(pump_lines(BufReader::new(stdout), StreamTag::Stdout, tx));
        }
        if let Some(stderr) = child.stderr.take() {
            let tx = tx.clone();
            tokio::spawn(pump_lines(BufReader::new(stderr), StreamTag::Stderr, tx));
        }
        drop(tx);

        let mut stdout_bytes = 0u64;
        let mut stderr_bytes = 0u64;
        while let Some((tag, line)) = rx.recv().await {
            match tag {
                StreamTag::Stdout => stdout_bytes += line.len() as u64 + 1,
                StreamTag::Stderr => stderr_bytes += line.len() as u64 + 1,
            }
            on_line(&line, tag, crate::progress::parse_line(&line));
        }

        match child.wait().await {
            Ok(status) => ProcessResult {
                exit_code: status.code().unwrap_or(-1),
                stdout_bytes,
                stderr_bytes,
                error: None,
            },
            Err(e) => ProcessResult {
                exit_code: -1,
                stdout_bytes,
                stderr_bytes,
                error: Some(format!("wait failed: {e}")),
            },
        }
    }

    async fn terminate(&self, pid: u32, grace: Duration) -> bool {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        if pid == 0 {
            return false;
        }
        let target = Pid::from_raw(pid as i32);

        if kill(target, Signal::SIGTERM).is_err() {
            // Already gone
            return true;
        }

        let deadline = tokio::time::Instant::now() + grace;
        while tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(100)).await;
            if kill(target, None).is_err() {
                tracing::info!(pid, "process terminated gracefully");
                return true;
            }
        }

        tracing::warn!(pid, "grace period elapsed, force killing");
        let _ = kill(target, Signal::SIGKILL);
        tokio::time::sleep(Duration::from_millis(100)).await;
        kill(target, None).is_err()
    }
}

#[cfg(any(test, feature = "test-support"))]
#[allow(clippy::unwrap_used)]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    /// Scripted behavior for commands whose argv starts with `prefix`.
    #[derive(Debug, Clone)]
    pub struct ScriptedCommand {
        pub prefix: Vec<String>,
        pub lines: Vec<String>,
        pub exit_code: i32,
        pub error: Option<String>,
        pub line_delay: Duration,
    }

    impl ScriptedCommand {
        pub fn new(prefix: &[&str]) -> Self {
            Self {
                prefix: prefix.iter().map(|s| s.to_string()).collect(),
                lines: Vec::new(),
                exit_code: 0,
                error: None,
                line_delay: Duration::ZERO,
            }
        }

        pub fn line(mut self, text: impl Into<String>) -> Self {
            self.lines.push(text.into());
            self
        }

        pub fn exit_code(mut self, code: i32) -> Self {
            self.exit_code = code;
            self
        }

        pub fn error(mut self, error: impl Into<String>) -> Self {
            self.error = Some(error.into());
            self
        }
    }

    #[derive(Default)]
    struct ScriptedState {
        scripts: Vec<ScriptedCommand>,
        started: Vec<(Vec<String>, HashMap<String, String>)>,
        terminated: Vec<u32>,
        refuse_spawn: bool,
    }

    /// Fake runner with scripted output, for tests.
    #[derive(Clone, Default)]
    pub struct ScriptedProcessRunner {
        state: Arc<Mutex<ScriptedState>>,
        next_pid: Arc<AtomicU32>,
    }

    impl ScriptedProcessRunner {
        pub fn new() -> Self {
            Self::default()
        }

        /// Register scripted behavior; the first matching prefix wins.
        pub fn script(&self, command: ScriptedCommand) {
            self.state.lock().scripts.push(command);
        }

        /// Make every `start` call fail with a launch error.
        pub fn refuse_spawn(&self) {
            self.state.lock().refuse_spawn = true;
        }

        /// Commands passed to `start`, in order.
        pub fn started_commands(&self) -> Vec<Vec<String>> {
            self.state.lock().started.iter().map(|(cmd, _)| cmd.clone()).collect()
        }

        /// Environment captured for the nth started command.
        pub fn env_of(&self, index: usize) -> Option<HashMap<String, String>> {
            self.state.lock().started.get(index).map(|(_, env)| env.clone())
        }

        /// Pids passed to `terminate`, in order.
        pub fn terminated_pids(&self) -> Vec<u32> {
            self.state.lock().terminated.clone()
        }
    }

    #[async_trait]
    impl ProcessRunner for ScriptedProcessRunner {
        async fn start(
            &self,
            command: &[String],
            env: &HashMap<String, String>,
        ) -> Result<ProcessHandle, LaunchError> {
            let mut state = self.state.lock();
            if state.refuse_spawn {
                return Err(LaunchError::Spawn {
                    command: command.first().cloned().unwrap_or_default(),
                    source: std::io::Error::from(std::io::ErrorKind::NotFound),
                });
            }
            state.started.push((command.to_vec(), env.clone()));

            let script = state
                .scripts
                .iter()
                .find(|s| command.starts_with(&s.prefix))
                .cloned()
                .unwrap_or_else(|| ScriptedCommand::new(&[]));

            let pid = 10_000 + self.next_pid.fetch_add(1, Ordering::Relaxed);
            Ok(ProcessHandle {
                pid,
                inner: HandleInner::Scripted {
                    lines: script.lines,
                    exit_code: script.exit_code,
                    error: script.error,
                    line_delay: script.line_delay,
                },
            })
        }

        async fn monitor(&self, handle: ProcessHandle, on_line: OnLine<'_>) -> ProcessResult {
            match handle.inner {
                HandleInner::Scripted { lines, exit_code, error, line_delay } => {
                    let mut stdout_bytes = 0u64;
                    for line in &lines {
                        if !line_delay.is_zero() {
                            tokio::time::sleep(line_delay).await;
                        }
                        stdout_bytes += line.len() as u64 + 1;
                        on_line(line, StreamTag::Stdout, crate::progress::parse_line(line));
                    }
                    ProcessResult { exit_code, stdout_bytes, stderr_bytes: 0, error }
                }
                HandleInner::Child(_) => ProcessResult {
                    exit_code: -1,
                    stdout_bytes: 0,
                    stderr_bytes: 0,
                    error: Some("real handle passed to scripted runner".to_string()),
                },
            }
        }

        async fn terminate(&self, pid: u32, _grace: Duration) -> bool {
            self.state.lock().terminated.push(pid);
            true
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{ScriptedCommand, ScriptedProcessRunner};

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
