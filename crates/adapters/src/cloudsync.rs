// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cloud replication collaborator interface.
//!
//! The engine only needs the contract: hand the collaborator a source path
//! and destination, relay its progress lines, and read back an outcome.
//! Production implementations (rclone subprocess, provider SDKs) live with
//! the deployment, outside this workspace.

use async_trait::async_trait;
use thiserror::Error;

/// Errors from the sync collaborator itself (not sync failures — those are
/// reported through [`SyncOutcome`]).
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("sync aborted: {0}")]
    Aborted(String),
}

/// What to replicate and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRequest {
    pub config_id: String,
    pub source_path: String,
    /// Provider-specific destination string (e.g. `s3:bucket/prefix`).
    pub destination: String,
}

/// Transfer counters reported by the collaborator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub files_transferred: u64,
    pub bytes_transferred: u64,
}

/// Result of a completed sync attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    pub success: bool,
    pub error: Option<String>,
    pub stats: Option<SyncStats>,
}

impl SyncOutcome {
    pub fn ok(stats: SyncStats) -> Self {
        Self { success: true, error: None, stats: Some(stats) }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self { success: false, error: Some(error.into()), stats: None }
    }
}

/// Adapter for replicating a repository to a cloud destination.
#[async_trait]
pub trait CloudSyncAdapter: Clone + Send + Sync + 'static {
    /// Run the sync to completion, feeding human-readable progress lines
    /// to `on_progress` as they occur.
    async fn sync(
        &self,
        request: &SyncRequest,
        on_progress: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<SyncOutcome, SyncError>;
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    struct FakeSyncState {
        requests: Vec<SyncRequest>,
        progress_lines: Vec<String>,
        outcome: SyncOutcome,
        abort: Option<String>,
    }

    /// Fake cloud sync adapter for testing.
    #[derive(Clone)]
    pub struct FakeCloudSyncAdapter {
        inner: Arc<Mutex<FakeSyncState>>,
    }

    impl Default for FakeCloudSyncAdapter {
        fn default() -> Self {
            Self {
                inner: Arc::new(Mutex::new(FakeSyncState {
                    requests: Vec::new(),
                    progress_lines: Vec::new(),
                    outcome: SyncOutcome::ok(SyncStats::default()),
                    abort: None,
                })),
            }
        }
    }

    impl FakeCloudSyncAdapter {
        pub fn new() -> Self {
            Self::default()
        }

        /// Script the outcome returned by every sync call.
        pub fn set_outcome(&self, outcome: SyncOutcome) {
            self.inner.lock().outcome = outcome;
        }

        /// Script progress lines emitted before the outcome.
        pub fn set_progress_lines(&self, lines: &[&str]) {
            self.inner.lock().progress_lines = lines.iter().map(|s| s.to_string()).collect();
        }

        /// Make every sync call return `Err(SyncError::Aborted)`.
        pub fn set_abort(&self, reason: impl Into<String>) {
            self.inner.lock().abort = Some(reason.into());
        }

        /// All requests seen so far.
        pub fn requests(&self) -> Vec<SyncRequest> {
            self.inner.lock().requests.clone()
        }

        pub fn call_count(&self) -> usize {
            self.inner.lock().requests.len()
        }
    }

    #[async_trait]
    impl CloudSyncAdapter for FakeCloudSyncAdapter {
        async fn sync(
            &self,
            request: &SyncRequest,
            on_progress: &mut (dyn for<'a> FnMut(&'a str) + Send),
        ) -> Result<SyncOutcome, SyncError> {
            let (lines, outcome, abort) = {
                let mut state = self.inner.lock();
                state.requests.push(request.clone());
                (state.progress_lines.clone(), state.outcome.clone(), state.abort.clone())
            };
            if let Some(reason) = abort {
                return Err(SyncError::Aborted(reason));
            }
            for line in &lines {
                on_progress(line);
            }
            Ok(outcome)
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeCloudSyncAdapter;

#[cfg(test)]
#[path = "cloudsync_tests.rs"]
mod tests;
