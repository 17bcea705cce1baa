// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::agent::{AgentKind, AgentRecord};
use crate::pulse::{self, PulseStatus};

fn node(caps: &[&str]) -> Node {
    Node {
        name: "n1".into(),
        tier: Tier::Backbone,
        capabilities: caps.iter().map(|s| s.to_string()).collect(),
        added_by: "admin".into(),
        added_at: 0,
    }
}

#[test]
fn admin_capability_is_detected() {
    assert!(node(&["admin"]).is_admin());
    assert!(!node(&["other"]).is_admin());
}

#[test]
fn invite_expiry_and_use() {
    let invite = PendingInvite {
        tier: Tier::Edge,
        expires_at: 100,
        created_by: "admin".into(),
        expected_node_id: None,
        used_by_node: None,
        used_at: None,
    };
    assert!(!invite.is_expired(50));
    assert!(invite.is_expired(100));
    assert!(!invite.is_used());
}

#[test]
fn agent_invite_usable_requires_unused_unrevoked_unexpired() {
    let mut invite = AgentInvite {
        agent_id: "agt_x".into(),
        token_hash: "sha256:abc".into(),
        created_at: 0,
        expires_at: 100,
        created_by: "admin".into(),
        created_by_agent: None,
        used_at: None,
        used_by_node: None,
        used_by_agent: None,
        revoked_at: None,
        revoked_reason: None,
    };
    assert!(invite.is_usable(50));
    invite.revoked_at = Some(10);
    assert!(!invite.is_usable(50));
}

#[test]
fn mint_and_consume_ws_ticket_admits_the_node_and_marks_the_invite_used() {
    let doc = Doc::new(1);
    let expected = NodeId::from_string("node_edge1");
    put_invite(
        &doc,
        "inv_abc",
        &PendingInvite { tier: Tier::Edge, expires_at: 1_000, created_by: "admin".into(), expected_node_id: Some(expected.clone()), used_by_node: None, used_at: None },
    );

    let ticket = mint_ws_ticket_from_invite(&doc, "inv_abc", &expected, 60, "admin", 0).unwrap();
    assert!(!ticket.is_used());

    consume_ws_ticket(&doc, ticket.ticket.as_str(), &expected, 1).unwrap();

    let node = get_node(&doc, expected.as_str()).unwrap();
    assert_eq!(node.tier, Tier::Edge);
    let invite = get_invite(&doc, "inv_abc").unwrap();
    assert!(invite.is_used());

    let err = consume_ws_ticket(&doc, ticket.ticket.as_str(), &expected, 2).unwrap_err();
    assert_eq!(err.kind, ErrorKind::AlreadyUsed);
}

#[test]
fn consume_ws_ticket_rejects_a_mismatched_presented_node_id() {
    let doc = Doc::new(1);
    let expected = NodeId::from_string("node_edge1");
    put_invite(
        &doc,
        "inv_xyz",
        &PendingInvite { tier: Tier::Edge, expires_at: 1_000, created_by: "admin".into(), expected_node_id: None, used_by_node: None, used_at: None },
    );
    let ticket = mint_ws_ticket_from_invite(&doc, "inv_xyz", &expected, 60, "admin", 0).unwrap();

    let other = NodeId::from_string("node_other");
    let err = consume_ws_ticket(&doc, ticket.ticket.as_str(), &other, 1).unwrap_err();
    assert_eq!(err.kind, ErrorKind::NodeMismatch);
}

#[test]
fn is_node_authorized_allows_any_node_during_bootstrap_then_pins_membership() {
    let doc = Doc::new(1);
    let agents = AgentMap::new();
    let a = NodeId::from_string("node_a");
    assert!(is_node_authorized(&doc, &a, &agents, 0));

    put_node(&doc, "node_a", &Node { name: "node_a".into(), tier: Tier::Backbone, capabilities: Default::default(), added_by: "admin".into(), added_at: 0 });
    let b = NodeId::from_string("node_b");
    assert!(!is_node_authorized(&doc, &b, &agents, 0));
    assert!(is_node_authorized(&doc, &a, &agents, 0));
}

#[test]
fn is_node_authorized_admits_a_node_with_a_live_heartbeat_or_internal_agent() {
    let doc = Doc::new(1);
    put_node(&doc, "node_a", &Node { name: "node_a".into(), tier: Tier::Backbone, capabilities: Default::default(), added_by: "admin".into(), added_at: 0 });

    let heartbeating = NodeId::from_string("node_heartbeat");
    pulse::beat(&doc, heartbeating.as_str(), PulseStatus::Online, 100);
    assert!(is_node_authorized(&doc, &heartbeating, &AgentMap::new(), 100));

    let mut agents = AgentMap::new();
    let hosting = NodeId::from_string("node_hosting");
    agents.insert(
        "agt_1".into(),
        AgentRecord { name: None, gateway: Some(hosting.clone()), kind: AgentKind::Internal, registered_at: 0, registered_by: "admin".into(), auth: None },
    );
    assert!(is_node_authorized(&doc, &hosting, &agents, 0));

    let stranger = NodeId::from_string("node_stranger");
    assert!(!is_node_authorized(&doc, &stranger, &agents, 0));
}
