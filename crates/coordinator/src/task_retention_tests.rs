// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use mesh_core::{Task, TaskStatus};

fn closed_task(id: &str, completed_at: u64) -> Task {
    Task {
        id: id.to_string(),
        title: "t".into(),
        description: String::new(),
        status: TaskStatus::Completed,
        created_by_agent: "alice".into(),
        created_by_node: None,
        created_at: completed_at,
        assigned_to_agent: None,
        assigned_to_agents: vec![],
        requires: vec![],
        skill_required: None,
        intent: None,
        metadata: None,
        claimed_by_agent: None,
        claimed_by_node: None,
        claimed_at: None,
        completed_at: Some(completed_at),
        result: None,
        context: None,
        updated_at: None,
        updates: vec![],
        delivery: Default::default(),
    }
}

#[test]
fn sweep_deletes_only_old_closed_tasks() {
    let doc = Doc::new(1);
    let policy = RetentionPolicy { closed_task_seconds: 1000, prune_every_seconds: 1 };

    task::put(&doc, &closed_task("tsk_old", 0));
    let mut recent = closed_task("tsk_recent", 900);
    recent.id = "tsk_recent".into();
    task::put(&doc, &recent);
    let mut open = closed_task("tsk_open", 0);
    open.status = TaskStatus::Pending;
    open.completed_at = None;
    task::put(&doc, &open);

    let removed = sweep(&doc, &policy, 2000);
    assert_eq!(removed, 1);
    assert!(task::get(&doc, "tsk_old").is_none());
    assert!(task::get(&doc, "tsk_recent").is_some());
    assert!(task::get(&doc, "tsk_open").is_some());
}

#[test]
fn is_due_respects_last_run_cadence() {
    let policy = RetentionPolicy { closed_task_seconds: 1, prune_every_seconds: 100 };
    assert!(is_due(&policy, None, 0));
    assert!(!is_due(&policy, Some(50), 100));
    assert!(is_due(&policy, Some(50), 150));
}
