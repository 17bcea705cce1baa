// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use mesh_core::TaskStatus;

fn task_with_sla(id: &str, created_by: &str, claimed_by: Option<&str>, sla_json: serde_json::Value) -> Task {
    Task {
        id: id.to_string(),
        title: "t".into(),
        description: String::new(),
        status: TaskStatus::InProgress,
        created_by_agent: created_by.to_string(),
        created_by_node: None,
        created_at: 0,
        assigned_to_agent: None,
        assigned_to_agents: vec![],
        requires: vec![],
        skill_required: None,
        intent: None,
        metadata: Some(serde_json::json!({ "ansible": { "sla": sla_json } })),
        claimed_by_agent: claimed_by.map(String::from),
        claimed_by_node: None,
        claimed_at: None,
        completed_at: None,
        result: None,
        context: None,
        updated_at: None,
        updates: vec![],
        delivery: Default::default(),
    }
}

#[test]
fn sweep_escalates_a_completed_breach_and_notifies_creator_and_claimant() {
    let doc = Doc::new(1);
    let t = task_with_sla("tsk_1", "alice", Some("bob"), serde_json::json!({ "complete_by_at": 100 }));
    task::put(&doc, &t);

    let config = SlaSweepConfig { every_seconds: 300, budget: 20 };
    let breaches = sweep(&doc, &config, &[], 200);

    assert_eq!(breaches.len(), 1);
    assert_eq!(breaches[0].kind, SlaBreachKind::Complete);

    let updated = task::get(&doc, "tsk_1").unwrap();
    let sla = updated.sla().unwrap();
    assert_eq!(sla.escalations.complete_at, Some(200));

    let mut recipients: Vec<String> = message::load(&doc).into_values().map(|m| m.to_agents[0].clone()).collect();
    recipients.sort();
    assert_eq!(recipients, vec!["alice".to_string(), "bob".to_string()]);
}

#[test]
fn sweep_skips_tasks_without_a_breach_or_already_escalated() {
    let doc = Doc::new(1);
    task::put(&doc, &task_with_sla("tsk_future", "alice", None, serde_json::json!({ "complete_by_at": 500 })));
    task::put(
        &doc,
        &task_with_sla(
            "tsk_already",
            "alice",
            None,
            serde_json::json!({ "complete_by_at": 1, "escalations": { "complete_at": 1 } }),
        ),
    );

    let config = SlaSweepConfig { every_seconds: 300, budget: 20 };
    let breaches = sweep(&doc, &config, &[], 200);
    assert!(breaches.is_empty());
    assert!(message::load(&doc).is_empty());
}

#[test]
fn sweep_respects_the_per_cycle_budget() {
    let doc = Doc::new(1);
    for i in 0..5 {
        task::put(&doc, &task_with_sla(&format!("tsk_{i}"), "alice", None, serde_json::json!({ "complete_by_at": 1 })));
    }

    let config = SlaSweepConfig { every_seconds: 300, budget: 3 };
    let breaches = sweep(&doc, &config, &[], 100);
    assert_eq!(breaches.len(), 3);
}
