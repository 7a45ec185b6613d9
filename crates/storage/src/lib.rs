// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! arca-storage: durable job/task record contract and reference store

pub mod memory;
pub mod records;
pub mod store;

pub use memory::MemoryStore;
pub use records::{
    CloudSyncConfig, JobRecord, NotificationConfig, RepositoryData, RetentionPolicy, TaskRecord,
};
pub use store::{JobStore, StoreError};
