// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Retention-pruning task executor.

use super::{require_repository, run_tool_command, TaskCtx};
use arca_adapters::{borg, CloudSyncAdapter, NotifyAdapter, ProcessRunner};
use arca_core::{Clock, Job, PruneParams, Task};

pub(crate) async fn run<P, S, N, C>(
    ctx: &TaskCtx<'_, P, S, N, C>,
    job: &Job,
    task: &mut Task,
    task_index: usize,
    params: &PruneParams,
) -> bool
where
    P: ProcessRunner,
    S: CloudSyncAdapter,
    N: NotifyAdapter,
    C: Clock,
{
    let Some(repo) = require_repository(ctx, job, task).await else {
        return false;
    };

    let command = borg::prune_command(&repo.path, &repo.passphrase, params);
    run_tool_command(ctx, job, task, task_index, command, "prune").await
}
