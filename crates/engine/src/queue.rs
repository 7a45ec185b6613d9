// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Admission control for backup-class jobs.
//!
//! A FIFO queue gated by a counting semaphore: at most `max_concurrent`
//! jobs hold a slot at any instant. The dispatch loop hands each admitted
//! entry to the registered start callback together with a [`SlotGuard`];
//! the slot is released when the guard drops, so a callback that errors
//! or a job task that panics can never leak a slot and halt the queue.

use arca_core::JobId;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Notify, OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

/// Admission priority. High-priority entries jump to the queue head;
/// entries of equal priority are admitted in FIFO order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QueuePriority {
    High,
    #[default]
    Normal,
}

/// One queued job waiting for a concurrency slot. Ephemeral: lives only
/// in memory and dies with the process.
#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub job_id: JobId,
    pub job_type: String,
    pub priority: QueuePriority,
}

/// Point-in-time queue statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueStats {
    pub max_concurrent: usize,
    pub running: usize,
    pub queued: usize,
    pub available_slots: usize,
    pub queued_by_type: HashMap<String, usize>,
}

type StartFn = Arc<dyn Fn(QueueEntry, SlotGuard) + Send + Sync>;
type CompleteFn = Arc<dyn Fn(&JobId, bool) + Send + Sync>;

/// Holds one concurrency slot for the lifetime of a job's execution.
///
/// Call [`SlotGuard::finish`] when the job completes to report the
/// outcome; dropping the guard without finishing still releases the slot.
pub struct SlotGuard {
    job_id: JobId,
    permit: Option<OwnedSemaphorePermit>,
    on_complete: Option<CompleteFn>,
    finished: bool,
}

impl SlotGuard {
    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// Report the job's outcome and release the slot.
    pub fn finish(mut self, success: bool) {
        self.finished = true;
        if let Some(callback) = self.on_complete.take() {
            callback(&self.job_id, success);
        }
        self.permit.take();
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        if !self.finished {
            tracing::debug!(job_id = %self.job_id, "queue slot released without completion");
        }
    }
}

/// Bounded-concurrency admission queue.
pub struct QueueManager {
    max_concurrent: usize,
    queue: Mutex<VecDeque<QueueEntry>>,
    semaphore: Arc<Semaphore>,
    notify: Notify,
    shutdown: CancellationToken,
    on_start: Mutex<Option<StartFn>>,
    on_complete: Mutex<Option<CompleteFn>>,
    dispatcher_started: AtomicBool,
}

impl QueueManager {
    pub fn new(max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            max_concurrent,
            queue: Mutex::new(VecDeque::new()),
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            notify: Notify::new(),
            shutdown: CancellationToken::new(),
            on_start: Mutex::new(None),
            on_complete: Mutex::new(None),
            dispatcher_started: AtomicBool::new(false),
        }
    }

    /// Wire the lifecycle callbacks. Must happen before `start`.
    pub fn set_callbacks(
        &self,
        on_start: impl Fn(QueueEntry, SlotGuard) + Send + Sync + 'static,
        on_complete: impl Fn(&JobId, bool) + Send + Sync + 'static,
    ) {
        *self.on_start.lock() = Some(Arc::new(on_start));
        *self.on_complete.lock() = Some(Arc::new(on_complete));
    }

    /// Start the background dispatch loop. Idempotent.
    pub fn start(self: &Arc<Self>, supervisor: &crate::supervisor::Supervisor) {
        if self.dispatcher_started.swap(true, Ordering::SeqCst) {
            return;
        }
        let queue = Arc::clone(self);
        supervisor.spawn("queue-dispatch", async move { queue.dispatch().await });
    }

    /// Append an entry; returns false after shutdown.
    pub fn enqueue(&self, entry: QueueEntry) -> bool {
        if self.shutdown.is_cancelled() {
            return false;
        }
        {
            let mut queue = self.queue.lock();
            match entry.priority {
                QueuePriority::High => queue.push_front(entry),
                QueuePriority::Normal => queue.push_back(entry),
            }
        }
        self.notify.notify_one();
        true
    }

    pub fn stats(&self) -> QueueStats {
        let queue = self.queue.lock();
        let mut queued_by_type: HashMap<String, usize> = HashMap::new();
        for entry in queue.iter() {
            *queued_by_type.entry(entry.job_type.clone()).or_default() += 1;
        }
        let available = self.semaphore.available_permits();
        QueueStats {
            max_concurrent: self.max_concurrent,
            running: self.max_concurrent - available,
            queued: queue.len(),
            available_slots: available,
            queued_by_type,
        }
    }

    /// Stop admitting and dispatching. Entries still queued are dropped.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        self.notify.notify_one();
    }

    async fn dispatch(self: Arc<Self>) {
        loop {
            if self.shutdown.is_cancelled() {
                break;
            }
            let entry = self.queue.lock().pop_front();
            let Some(entry) = entry else {
                tokio::select! {
                    _ = self.notify.notified() => continue,
                    _ = self.shutdown.cancelled() => break,
                }
            };

            let permit = tokio::select! {
                permit = self.semaphore.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
                _ = self.shutdown.cancelled() => break,
            };

            let on_start = self.on_start.lock().clone();
            let on_complete = self.on_complete.lock().clone();
            let guard = SlotGuard {
                job_id: entry.job_id.clone(),
                permit: Some(permit),
                on_complete,
                finished: false,
            };

            match on_start {
                Some(callback) => {
                    let job_id = entry.job_id.clone();
                    // The guard moves into the closure: a panicking
                    // callback unwinds through it and the slot is freed.
                    let invoked = std::panic::catch_unwind(std::panic::AssertUnwindSafe(
                        move || callback(entry, guard),
                    ));
                    if invoked.is_err() {
                        tracing::error!(job_id = %job_id, "queue start callback panicked, slot released");
                    }
                }
                None => {
                    tracing::warn!(job_id = %entry.job_id, "no start callback registered, dropping entry");
                }
            }
        }
        tracing::info!("queue dispatcher stopped");
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
