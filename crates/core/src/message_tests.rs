// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn msg(to: &[&str], created_at: u64) -> Message {
    Message {
        id: "msg_a".into(),
        from_agent: "agt_a".into(),
        to_agents: to.iter().map(|s| s.to_string()).collect(),
        content: "hello".into(),
        created_at,
        read_by_agents: HashSet::new(),
        delivery: Default::default(),
    }
}

#[test]
fn empty_to_agents_is_a_broadcast_addressed_to_everyone() {
    let m = msg(&[], 0);
    assert!(m.is_broadcast());
    assert!(m.is_addressed_to("agt_x"));
}

#[test]
fn directed_message_is_addressed_only_to_named_agents() {
    let m = msg(&["agt_b"], 0);
    assert!(m.is_addressed_to("agt_b"));
    assert!(!m.is_addressed_to("agt_c"));
}

#[test]
fn broadcasts_are_never_fully_read() {
    let mut m = msg(&[], 0);
    m.mark_read("agt_x");
    m.mark_read("agt_y");
    assert!(!m.is_fully_read());
}

#[test]
fn directed_message_is_fully_read_once_every_receiver_reads_it() {
    let mut m = msg(&["agt_b", "agt_c"], 0);
    m.mark_read("agt_b");
    assert!(!m.is_fully_read());
    m.mark_read("agt_c");
    assert!(m.is_fully_read());
}

#[test]
fn retention_eligible_requires_fully_read_and_past_the_window() {
    let mut m = msg(&["agt_b"], 0);
    assert!(!m.is_retention_eligible(MESSAGE_READ_RETENTION_SECS + 1));
    m.mark_read("agt_b");
    assert!(!m.is_retention_eligible(MESSAGE_READ_RETENTION_SECS));
    assert!(m.is_retention_eligible(MESSAGE_READ_RETENTION_SECS + 1));
}

#[test]
fn unread_messages_are_never_retention_eligible() {
    let m = msg(&["agt_b"], 0);
    assert!(!m.is_retention_eligible(u64::MAX));
}
