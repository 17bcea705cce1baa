// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Closed-task retention: the elected coordinator deletes terminal tasks
//! once they've been closed longer than the configured window.

use mesh_core::coordination::{self, RetentionPolicy};
use mesh_core::{task, Doc};

/// Delete every `completed`/`failed` task whose [`task::close_time`]
/// predates `now - policy.closed_task_seconds`. Returns the number removed.
pub fn sweep(doc: &Doc, policy: &RetentionPolicy, now: u64) -> usize {
    let mut removed = 0;
    for (id, t) in task::load(doc) {
        if !t.status.is_terminal() {
            continue;
        }
        if now.saturating_sub(t.close_time()) > policy.closed_task_seconds {
            task::remove(doc, &id);
            removed += 1;
        }
    }
    removed
}

/// Whether this sweep is due: `now` is at least `policy.prune_every_seconds`
/// past `last_run_at` (or no sweep has ever run).
pub fn is_due(policy: &RetentionPolicy, last_run_at: Option<u64>, now: u64) -> bool {
    match last_run_at {
        Some(last) => now.saturating_sub(last) >= policy.prune_every_seconds,
        None => true,
    }
}

pub use coordination::get_retention_policy as policy;

#[cfg(test)]
#[path = "task_retention_tests.rs"]
mod tests;
