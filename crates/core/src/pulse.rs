// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent presence, kept as a `"pulse"` submap record per agent so frequent
//! heartbeat writes touch a single field instead of replacing a whole value.

use serde::{Deserialize, Serialize};

use crate::crdt::Doc;

/// Heartbeat interval the coordinator writes on.
pub const PULSE_INTERVAL_SECS: u64 = 30;

/// An agent is considered offline once its last pulse is older than this.
pub const PULSE_STALE_AFTER_SECS: u64 = 300;

const COLLECTION: &str = "pulse";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PulseStatus {
    Online,
    Busy,
    Offline,
}

crate::simple_display! {
    PulseStatus {
        Online => "online",
        Busy => "busy",
        Offline => "offline",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pulse {
    pub status: PulseStatus,
    pub last_seen_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,
}

/// Write (or overwrite in place) the `status` and `last_seen_at` fields of
/// one agent's pulse record, leaving other fields untouched.
pub fn beat(doc: &Doc, agent: &str, status: PulseStatus, now: u64) {
    doc.submap_set_field(COLLECTION, agent, "status", serde_json::json!(status));
    doc.submap_set_field(COLLECTION, agent, "last_seen_at", serde_json::json!(now));
}

pub fn set_node(doc: &Doc, agent: &str, node: &str) {
    doc.submap_set_field(COLLECTION, agent, "node", serde_json::json!(node));
}

pub fn get(doc: &Doc, agent: &str) -> Option<Pulse> {
    let fields = doc.submap_fields(COLLECTION, agent)?;
    let value = serde_json::Value::Object(fields.into_iter().collect());
    serde_json::from_value(value).ok()
}

pub fn is_stale(pulse: &Pulse, now: u64) -> bool {
    now.saturating_sub(pulse.last_seen_at) > PULSE_STALE_AFTER_SECS
}

pub fn agents(doc: &Doc) -> Vec<String> {
    doc.submap_keys(COLLECTION)
}

#[cfg(test)]
#[path = "pulse_tests.rs"]
mod tests;
