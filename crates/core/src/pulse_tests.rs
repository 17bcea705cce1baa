// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn beat_then_get_round_trips_status_and_last_seen() {
    let doc = Doc::new(1);
    beat(&doc, "agt_a", PulseStatus::Online, 100);
    let pulse = get(&doc, "agt_a").expect("pulse present");
    assert_eq!(pulse.status, PulseStatus::Online);
    assert_eq!(pulse.last_seen_at, 100);
    assert!(pulse.node.is_none());
}

#[test]
fn set_node_preserves_status_and_last_seen() {
    let doc = Doc::new(1);
    beat(&doc, "agt_a", PulseStatus::Busy, 50);
    set_node(&doc, "agt_a", "gateway-1");
    let pulse = get(&doc, "agt_a").expect("pulse present");
    assert_eq!(pulse.status, PulseStatus::Busy);
    assert_eq!(pulse.last_seen_at, 50);
    assert_eq!(pulse.node.as_deref(), Some("gateway-1"));
}

#[test]
fn repeated_beats_overwrite_in_place_without_duplicating_agents() {
    let doc = Doc::new(1);
    beat(&doc, "agt_a", PulseStatus::Online, 1);
    beat(&doc, "agt_a", PulseStatus::Online, 2);
    beat(&doc, "agt_a", PulseStatus::Offline, 3);
    assert_eq!(agents(&doc), vec!["agt_a".to_string()]);
    let pulse = get(&doc, "agt_a").unwrap();
    assert_eq!(pulse.status, PulseStatus::Offline);
    assert_eq!(pulse.last_seen_at, 3);
}

#[test]
fn staleness_is_relative_to_last_seen() {
    let pulse = Pulse { status: PulseStatus::Online, last_seen_at: 1_000, node: None };
    assert!(!is_stale(&pulse, 1_000 + PULSE_STALE_AFTER_SECS));
    assert!(is_stale(&pulse, 1_000 + PULSE_STALE_AFTER_SECS + 1));
}

#[test]
fn missing_agent_has_no_pulse() {
    let doc = Doc::new(1);
    assert!(get(&doc, "agt_ghost").is_none());
}
