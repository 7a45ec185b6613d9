// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-job output buffers with live streaming.
//!
//! Each job owns a bounded ring of timestamped lines plus a merged
//! progress snapshot. A follower first replays the buffered lines, then
//! receives new lines as they are appended, and ends when the job is
//! marked complete. A fresh `follow` call restarts from the buffer head.

use arca_core::{JobId, OutputLine, Progress};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use tokio::sync::broadcast;

#[derive(Debug, Clone)]
enum StreamItem {
    Line(OutputLine),
    Closed,
}

struct JobOutput {
    lines: VecDeque<OutputLine>,
    progress: Progress,
    tx: broadcast::Sender<StreamItem>,
    closed: bool,
}

/// Registry of per-job output buffers.
pub struct OutputStore {
    capacity: usize,
    inner: Mutex<HashMap<JobId, JobOutput>>,
}

impl OutputStore {
    /// `capacity` bounds both the replay ring and each follower's lag
    /// tolerance.
    pub fn new(capacity: usize) -> Self {
        Self { capacity, inner: Mutex::new(HashMap::new()) }
    }

    /// Initialize an empty buffer for a job. Idempotent.
    pub fn create(&self, job_id: &JobId) {
        let mut inner = self.inner.lock();
        inner.entry(job_id.clone()).or_insert_with(|| {
            let (tx, _) = broadcast::channel(self.capacity.max(16));
            JobOutput {
                lines: VecDeque::new(),
                progress: Progress::default(),
                tx,
                closed: false,
            }
        });
    }

    /// Append a line, evicting the oldest at capacity, and merge any
    /// progress into the job's snapshot.
    pub fn append(&self, job_id: &JobId, line: OutputLine, progress: Option<&Progress>) {
        let mut inner = self.inner.lock();
        let Some(output) = inner.get_mut(job_id) else {
            tracing::debug!(job_id = %job_id, "append to unknown job output, dropping");
            return;
        };
        if output.closed {
            tracing::debug!(job_id = %job_id, "append after completion, dropping");
            return;
        }
        while output.lines.len() >= self.capacity {
            output.lines.pop_front();
        }
        output.lines.push_back(line.clone());
        if let Some(progress) = progress {
            output.progress.merge(progress);
        }
        let _ = output.tx.send(StreamItem::Line(line));
    }

    /// Snapshot of the currently buffered lines, oldest first.
    pub fn lines(&self, job_id: &JobId) -> Vec<OutputLine> {
        self.inner
            .lock()
            .get(job_id)
            .map(|o| o.lines.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Merged progress snapshot for a job.
    pub fn progress(&self, job_id: &JobId) -> Option<Progress> {
        self.inner.lock().get(job_id).map(|o| o.progress.clone())
    }

    /// End all followers once the job reaches a terminal state.
    pub fn mark_complete(&self, job_id: &JobId) {
        let mut inner = self.inner.lock();
        if let Some(output) = inner.get_mut(job_id) {
            output.closed = true;
            let _ = output.tx.send(StreamItem::Closed);
        }
    }

    /// Release a job's buffer. Returns whether anything was removed.
    pub fn clear(&self, job_id: &JobId) -> bool {
        let mut inner = self.inner.lock();
        match inner.remove(job_id) {
            Some(output) => {
                // Wake any remaining followers so they terminate
                let _ = output.tx.send(StreamItem::Closed);
                true
            }
            None => false,
        }
    }

    /// Follow a job's output: buffered lines first, then live appends
    /// until the job completes. `None` if the job has no buffer.
    pub fn follow(&self, job_id: &JobId) -> Option<OutputFollower> {
        let inner = self.inner.lock();
        let output = inner.get(job_id)?;
        // Snapshot and subscribe under the same lock so no line is missed
        // between the replay and the live phase.
        let buffered: VecDeque<OutputLine> = output.lines.iter().cloned().collect();
        let rx = if output.closed { None } else { Some(output.tx.subscribe()) };
        Some(OutputFollower { buffered, rx })
    }
}

/// Lazy sequence over one job's output. Finite: ends when the job
/// completes or its buffer is cleared.
pub struct OutputFollower {
    buffered: VecDeque<OutputLine>,
    rx: Option<broadcast::Receiver<StreamItem>>,
}

impl OutputFollower {
    /// Next line, or `None` once the stream has ended.
    pub async fn next(&mut self) -> Option<OutputLine> {
        if let Some(line) = self.buffered.pop_front() {
            return Some(line);
        }
        let rx = self.rx.as_mut()?;
        loop {
            match rx.recv().await {
                Ok(StreamItem::Line(line)) => return Some(line),
                Ok(StreamItem::Closed) => {
                    self.rx = None;
                    return None;
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "output follower lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => {
                    self.rx = None;
                    return None;
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
