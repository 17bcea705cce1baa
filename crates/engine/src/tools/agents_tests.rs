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
fn register_agent_rejects_duplicate_ids() {
    let doc = doc();
    let first = register_agent(&doc, &admin("root"), "agt_bob", None, AgentKind::External, None, 1);
    assert_eq!(first.details["agentId"], "agt_bob");

    let dup = register_agent(&doc, &admin("root"), "agt_bob", None, AgentKind::External, None, 2);
    assert_eq!(dup.details["kind"], "invalid_params");
}

#[test]
fn register_internal_agent_requires_gateway() {
    let doc = doc();
    let resp = register_agent(&doc, &admin("root"), "agt_local", None, AgentKind::Internal, None, 1);
    assert_eq!(resp.details["kind"], "invalid_params");
}

#[test]
fn issue_agent_token_requires_admin_and_external_kind() {
    let doc = doc();
    register_agent(&doc, &admin("root"), "agt_bob", None, AgentKind::External, None, 1);

    let not_admin = issue_agent_token(&doc, &caller("alice"), "agt_bob", 2);
    assert_eq!(not_admin.details["kind"], "admin_required");

    let ok = issue_agent_token(&doc, &admin("root"), "agt_bob", 2);
    assert_eq!(ok.details["token"].as_str().unwrap().len(), 32);

    let record = agent::get(&doc, "agt_bob").unwrap();
    let auth = record.auth.unwrap();
    assert!(auth.verify(ok.details["token"].as_str().unwrap()));
}

#[test]
fn invite_and_accept_agent_invite_mints_a_token_once() {
    let doc = doc();
    let invite = invite_agent(&doc, &admin("root"), "agt_ext", 100);
    let token = invite.details["token"].as_str().unwrap().to_string();

    let accepted = accept_agent_invite(&doc, &token, Some(NodeId::from_string("node_edge")), Some("agt_ext".into()), 101);
    assert_eq!(accepted.details["agentId"], "agt_ext");
    assert_eq!(accepted.details["token"].as_str().unwrap().len(), 32);

    let record = agent::get(&doc, "agt_ext").unwrap();
    assert!(record.auth.unwrap().accepted_at.is_some());

    let replay = accept_agent_invite(&doc, &token, None, None, 102);
    assert_eq!(replay.details["kind"], "already_used");
}

#[test]
fn accept_agent_invite_rejects_expired_tokens() {
    let doc = doc();
    let invite = invite_agent(&doc, &admin("root"), "agt_ext", 100);
    let token = invite.details["token"].as_str().unwrap().to_string();
    let expired_at = 100 + AGENT_INVITE_TTL_SECS + 1;

    let resp = accept_agent_invite(&doc, &token, None, None, expired_at);
    assert_eq!(resp.details["kind"], "expired");
}

#[test]
fn advertise_skills_round_trips_through_context() {
    let doc = doc();
    let resp = advertise_skills(&doc, &caller("alice"), vec!["rust".into(), "ops".into()], 5);
    assert_eq!(resp.details["skills"], serde_json::json!(["rust", "ops"]));
    assert_eq!(context::get(&doc, "alice").skills, vec!["rust".to_string(), "ops".to_string()]);
}

#[test]
fn create_skill_task_sets_required_skill_and_intent() {
    let doc = doc();
    let resp = create_skill_task(&doc, &caller("alice"), "fix it".into(), "please".into(), "rust".into(), 5);
    assert_eq!(resp.details["skill_required"], "rust");
    assert_eq!(resp.details["intent"], "skill-advertised");
}

#[test]
fn list_agent_invites_is_admin_only() {
    let doc = doc();
    invite_agent(&doc, &admin("root"), "agt_ext", 100);

    let denied = list_agent_invites(&caller("alice"), &doc);
    assert_eq!(denied.details["kind"], "admin_required");

    let ok = list_agent_invites(&admin("root"), &doc);
    assert_eq!(ok.details["invites"].as_array().unwrap().len(), 1);
}
