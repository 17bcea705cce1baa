// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use mesh_core::agent::{AgentAuth, AgentKind, AgentRecord};
use mesh_core::node::{put_node, Node, Tier};
use mesh_core::{Doc, FakeClock};
use std::collections::BTreeSet;

#[tokio::test]
async fn bootstrap_admits_any_node_before_the_first_member_is_pinned() {
    let doc = Doc::new(1);
    let gate = AdmissionGate::new(doc.clone(), FakeClock::new());
    assert!(gate.check("node_anyone").await.is_none());
}

#[tokio::test]
async fn once_membership_is_pinned_a_stranger_node_is_rejected() {
    let doc = Doc::new(1);
    put_node(&doc, "node_a", &Node { name: "node_a".into(), tier: Tier::Backbone, capabilities: BTreeSet::new(), added_by: "admin".into(), added_at: 0 });

    let gate = AdmissionGate::new(doc.clone(), FakeClock::new());
    assert!(gate.check("node_a").await.is_none());
    assert!(gate.check("node_stranger").await.is_some());
}

#[test]
fn admin_gate_requires_the_configured_agent_id_and_admin_capability_and_internal_or_token_auth() {
    let doc = Doc::new(1);
    let node = mesh_core::NodeId::from_string("node_a");
    put_node(&doc, "node_a", &Node { name: "node_a".into(), tier: Tier::Backbone, capabilities: ["admin".to_string()].into_iter().collect(), added_by: "x".into(), added_at: 0 });

    // No agent record at all: even a capable, correctly-named caller is rejected.
    assert!(!is_admin_caller(&doc, &node, "admin", "admin", None));

    // Internal on this node: admitted without presenting a token.
    mesh_core::agent::put(&doc, "admin", &AgentRecord { name: None, gateway: Some(node.clone()), kind: AgentKind::Internal, registered_at: 0, registered_by: "x".into(), auth: None });
    assert!(is_admin_caller(&doc, &node, "admin", "admin", None));
    assert!(!is_admin_caller(&doc, &node, "someone_else", "admin", None));

    // External agent with a registered token: only admitted with a verifying token.
    let token = "s3cr3t-admin-token";
    let auth = AgentAuth { token_hash: AgentAuth::hash_token(token), issued_at: 0, rotated_at: None, token_hint: AgentAuth::hint(token), accepted_at: None, accepted_by_node: None, accepted_by_agent: None };
    mesh_core::agent::put(&doc, "admin", &AgentRecord { name: None, gateway: None, kind: AgentKind::External, registered_at: 0, registered_by: "x".into(), auth: Some(auth) });
    assert!(!is_admin_caller(&doc, &node, "admin", "admin", None));
    assert!(!is_admin_caller(&doc, &node, "admin", "admin", Some("wrong-token")));
    assert!(is_admin_caller(&doc, &node, "admin", "admin", Some(token)));

    let non_admin_node = mesh_core::NodeId::from_string("node_b");
    put_node(&doc, "node_b", &Node { name: "node_b".into(), tier: Tier::Edge, capabilities: BTreeSet::new(), added_by: "x".into(), added_at: 0 });
    assert!(!is_admin_caller(&doc, &non_admin_node, "admin", "admin", Some(token)));
}
