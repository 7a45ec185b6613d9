// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervised background tasks.
//!
//! Fire-and-forget side effects (delayed cleanup, queue dispatch) are
//! spawned through the supervisor so every JoinHandle is awaited by a
//! reaper that logs panics. A failing side-effect task is observable in
//! the logs instead of silently vanishing.

use std::future::Future;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

struct Supervised {
    label: &'static str,
    handle: JoinHandle<()>,
}

/// Handle for spawning supervised background tasks.
#[derive(Clone)]
pub struct Supervisor {
    tx: mpsc::UnboundedSender<Supervised>,
}

impl Supervisor {
    /// Start the supervisor and its reaper task.
    pub fn new() -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Supervised>();
        tokio::spawn(async move {
            while let Some(task) = rx.recv().await {
                match task.handle.await {
                    Ok(()) => {}
                    Err(e) if e.is_panic() => {
                        tracing::error!(task = task.label, "background task panicked");
                    }
                    Err(_) => {
                        tracing::debug!(task = task.label, "background task cancelled");
                    }
                }
            }
        });
        Self { tx }
    }

    /// Spawn a background task whose completion the reaper observes.
    pub fn spawn<F>(&self, label: &'static str, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(future);
        if self.tx.send(Supervised { label, handle }).is_err() {
            // Reaper gone (shutdown); the task itself still runs.
            tracing::warn!(task = label, "supervisor reaper gone, task unobserved");
        }
    }
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
