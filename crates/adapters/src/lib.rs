// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! arca-adapters: process execution and external collaborator interfaces

pub mod borg;
pub mod cloudsync;
pub mod notify;
pub mod process;
pub mod progress;

pub use cloudsync::{CloudSyncAdapter, SyncError, SyncOutcome, SyncRequest, SyncStats};
pub use notify::{NotifyAdapter, NotifyError, NotifyTarget};
pub use process::{
    LaunchError, ProcessHandle, ProcessResult, ProcessRunner, TokioProcessRunner,
};

#[cfg(any(test, feature = "test-support"))]
pub use cloudsync::FakeCloudSyncAdapter;
#[cfg(any(test, feature = "test-support"))]
pub use notify::FakeNotifyAdapter;
#[cfg(any(test, feature = "test-support"))]
pub use process::{ScriptedCommand, ScriptedProcessRunner};
