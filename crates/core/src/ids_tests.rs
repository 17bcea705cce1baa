// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn each_id_type_carries_its_prefix() {
    assert!(NodeId::new().as_str().starts_with("node"));
    assert!(AgentId::new().as_str().starts_with("agt_"));
    assert!(TaskId::new().as_str().starts_with("tsk_"));
    assert!(MessageId::new().as_str().starts_with("msg_"));
    assert!(InviteToken::new().as_str().starts_with("inv_"));
    assert!(WsTicketId::new().as_str().starts_with("wst_"));
    assert!(AgentInviteToken::new().as_str().starts_with("ait_"));
}

#[test]
fn agent_invite_token_literal_from_spec_shape() {
    let t = AgentInviteToken::from_string("ait_abc123");
    assert_eq!(t.as_str(), "ait_abc123");
}
