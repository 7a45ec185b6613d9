// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for the spec suite.

pub use arca_adapters::{
    FakeCloudSyncAdapter, FakeNotifyAdapter, ScriptedCommand, ScriptedProcessRunner,
};
pub use arca_core::{
    BackupParams, EngineConfig, Event, FakeClock, JobId, JobStatus, PruneParams, TaskParameters,
    TaskStatus,
};
pub use arca_engine::{Orchestrator, TaskDefinition};
pub use arca_storage::{JobStore, MemoryStore, NotificationConfig, RepositoryData};
pub use std::collections::HashMap;
pub use std::sync::Arc;
pub use std::time::Duration;

pub const SPEC_WAIT_MAX_MS: u64 = 5_000;

pub type SpecOrchestrator =
    Orchestrator<ScriptedProcessRunner, FakeCloudSyncAdapter, FakeNotifyAdapter, FakeClock>;

pub struct Spec {
    pub orchestrator: SpecOrchestrator,
    pub runner: ScriptedProcessRunner,
    pub cloud: FakeCloudSyncAdapter,
    pub notifier: FakeNotifyAdapter,
    pub store: MemoryStore,
}

/// Build an engine wired to scripted adapters and a seeded repository.
pub fn spec_with_config(config: EngineConfig) -> Spec {
    let runner = ScriptedProcessRunner::new();
    let cloud = FakeCloudSyncAdapter::new();
    let notifier = FakeNotifyAdapter::new();
    let store = MemoryStore::new();
    store.insert_repository(RepositoryData {
        id: "repo-1".to_string(),
        name: "photos".to_string(),
        path: "/repo".to_string(),
        passphrase: "secret".to_string(),
    });

    let store_dyn: Arc<dyn JobStore> = Arc::new(store.clone());
    let orchestrator = Orchestrator::new(
        config,
        FakeClock::new(),
        runner.clone(),
        cloud.clone(),
        notifier.clone(),
        store_dyn,
    );
    Spec { orchestrator, runner, cloud, notifier, store }
}

pub fn spec() -> Spec {
    spec_with_config(EngineConfig::default())
}

pub fn backup_def(source: &str) -> TaskDefinition {
    TaskDefinition {
        name: "create archive".to_string(),
        parameters: TaskParameters::Backup(BackupParams {
            source_path: source.to_string(),
            compression: "zstd".to_string(),
            excludes: Vec::new(),
            dry_run: false,
        }),
    }
}

/// Poll until `cond` holds or the deadline passes.
pub async fn wait_for(max_ms: u64, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_millis(max_ms);
    while tokio::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    cond()
}

/// Wait for a job to reach a terminal status and return its final state.
pub async fn wait_terminal(orchestrator: &SpecOrchestrator, job_id: &JobId) -> arca_core::Job {
    let done = wait_for(SPEC_WAIT_MAX_MS, || {
        orchestrator.get_job(job_id).map(|j| j.is_terminal()).unwrap_or(false)
    })
    .await;
    assert!(done, "job {job_id} did not reach a terminal state");
    orchestrator.get_job(job_id).expect("job evicted before inspection")
}
