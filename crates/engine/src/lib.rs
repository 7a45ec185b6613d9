// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! arca-engine: the composite job orchestration engine
//!
//! Composes the output store, event broadcaster, admission queue, task
//! executors and recovery procedure into one orchestrator. The durable
//! store is the system of record; the in-memory job map is a cache that a
//! process restart invalidates and recovery repairs.

pub mod broadcaster;
pub mod orchestrator;
pub mod output;
pub mod queue;
pub mod recovery;
pub mod supervisor;
mod tasks;

pub use broadcaster::{EventBroadcaster, Subscription};
pub use orchestrator::{JobStatusView, Orchestrator, OrchestratorError, TaskDefinition};
pub use output::{OutputFollower, OutputStore};
pub use queue::{QueueEntry, QueueManager, QueuePriority, QueueStats, SlotGuard};
pub use recovery::{recover_stale_jobs, RecoveryReport};
pub use supervisor::Supervisor;
