// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use mesh_core::NodeId;

fn doc() -> std::sync::Arc<Doc> {
    Doc::new(1)
}

fn admin(agent_id: &str) -> Caller {
    Caller::admin(agent_id, NodeId::from_string("node_home"))
}

fn caller(agent_id: &str) -> Caller {
    Caller::internal(agent_id, NodeId::from_string("node_home"))
}

#[test]
fn update_context_applies_only_the_fields_given() {
    let doc = doc();
    update_context(&doc, &caller("alice"), Some("writing tests".into()), None, None, 10);
    let resp = update_context(&doc, &caller("alice"), None, Some("thread-1".into()), Some("use rust".into()), 11);
    assert_eq!(resp.details["current_focus"], "writing tests");
    assert_eq!(resp.details["active_threads"], serde_json::json!(["thread-1"]));
    assert_eq!(resp.details["recent_decisions"], serde_json::json!(["use rust"]));
}

#[test]
fn set_coordination_is_admin_only_and_round_trips() {
    let doc = doc();
    let denied = set_coordination(&doc, &caller("alice"), Some("node_a".into()), None);
    assert_eq!(denied.details["kind"], "admin_required");

    let ok = set_coordination(&doc, &admin("root"), Some("node_a".into()), Some(600));
    assert_eq!(ok.details["coordinator"], "node_a");
    assert_eq!(ok.details["sweepEverySeconds"], 600);
}

#[test]
fn set_retention_updates_only_given_fields() {
    let doc = doc();
    let resp = set_retention(&doc, &admin("root"), Some(3600), None);
    assert_eq!(resp.details["closed_task_seconds"], 3600);
    assert_eq!(resp.details["prune_every_seconds"], coordination::DEFAULT_RETENTION_PRUNE_EVERY_SECONDS);
}

#[test]
fn delegation_policy_set_bumps_version_and_ack_records_agent() {
    let doc = doc();
    assert_eq!(get_delegation_policy(&doc).details, serde_json::json!(null));

    let v1 = set_delegation_policy(&doc, &admin("root"), "# policy v1".into(), 10);
    assert_eq!(v1.details["version"], 1);

    let v2 = set_delegation_policy(&doc, &admin("root"), "# policy v2".into(), 20);
    assert_eq!(v2.details["version"], 2);

    let ack = ack_delegation_policy(&doc, &caller("alice"), 21);
    assert_eq!(ack.details["version"], 2);
    assert_eq!(ack.details["acknowledged"], true);
}

#[test]
fn status_reports_counts_and_coordinator() {
    let doc = doc();
    mesh_core::task::put(
        &doc,
        &mesh_core::Task {
            id: "tsk_1".into(),
            title: "t".into(),
            description: "".into(),
            status: mesh_core::TaskStatus::Pending,
            created_by_agent: "alice".into(),
            created_by_node: None,
            created_at: 1,
            assigned_to_agent: None,
            assigned_to_agents: vec![],
            requires: vec![],
            skill_required: None,
            intent: None,
            metadata: None,
            claimed_by_agent: None,
            claimed_by_node: None,
            claimed_at: None,
            completed_at: None,
            result: None,
            context: None,
            updated_at: None,
            updates: vec![],
            delivery: Default::default(),
        },
    );
    set_coordination(&doc, &admin("root"), Some("node_a".into()), None);

    let resp = status(&doc, &caller("alice"));
    assert_eq!(resp.details["taskCount"], 1);
    assert_eq!(resp.details["openTaskCount"], 1);
    assert_eq!(resp.details["coordinator"], "node_a");
}

#[test]
fn dump_state_is_admin_only() {
    let doc = doc();
    let denied = dump_state(&doc, &caller("alice"));
    assert_eq!(denied.details["kind"], "admin_required");

    let ok = dump_state(&doc, &admin("root"));
    assert!(ok.details["tasks"].is_object());
}
